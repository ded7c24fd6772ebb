mod common;

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use common::{body, http_response, scripted_server};
use prodsearch::app::{run_interactive, SessionStats};
use prodsearch::classifier::{CategoryClassifier, HttpLabelPredictor};
use prodsearch::engine::OpenSearchClient;
use prodsearch::output::OutputFormat;
use prodsearch::priors::{ClickPriorTable, ClickRow};
use prodsearch::search::{SearchOptions, Searcher};
use serde_json::{json, Value};

const ONE_HIT: &str = r#"{"took":3,"hits":{"total":{"value":1},"hits":[{"_id":"1065813","_score":9.5,"_source":{"name":"Apple iPad 2"}}]}}"#;
const NO_HITS: &str = r#"{"took":1,"hits":{"total":{"value":0},"hits":[]}}"#;

fn bool_clause(request: &Value) -> &Value {
    &request["query"]["function_score"]["query"]["bool"]
}

fn searcher_against(engine_url: &str, model_url: Option<&str>) -> Searcher {
    let engine = OpenSearchClient::new(engine_url.to_string(), 5).with_basic_auth("admin", "admin");
    let mut searcher = Searcher::new(Arc::new(engine));
    if let Some(url) = model_url {
        let predictor = HttpLabelPredictor::new(url.to_string(), 5);
        searcher = searcher.with_classifier(CategoryClassifier::new(Arc::new(predictor)));
    }
    searcher
}

#[test]
fn classified_query_with_prior_reaches_the_engine() {
    let (model_url, model) = scripted_server(vec![http_response(
        200,
        r#"{"labels":["__label__abcat0500000"],"probabilities":[0.93]}"#,
    )]);
    let (engine_url, engine) = scripted_server(vec![http_response(200, ONE_HIT)]);

    let dir = tempfile::tempdir().unwrap();
    let priors_path = dir.path().join("priors.json");
    fs::write(
        &priors_path,
        r#"{"iPad": [{"doc_id": "1065813", "clicks": 3, "num_impressions": 4}]}"#,
    )
    .unwrap();
    let searcher = searcher_against(&engine_url, Some(&model_url))
        .with_priors(ClickPriorTable::load(&priors_path).unwrap());

    let mut out = Vec::new();
    let stats = run_interactive(
        &searcher,
        &SearchOptions::default(),
        OutputFormat::Json,
        Cursor::new("ipad\nExit\n"),
        &mut out,
    )
    .unwrap();
    assert_eq!(
        stats,
        SessionStats {
            queries: 1,
            with_hits: 1,
            failed: 0
        }
    );
    assert!(String::from_utf8(out).unwrap().contains("Apple iPad 2"));

    let model_bodies = model.join().unwrap();
    let predict: Value = serde_json::from_str(body(&model_bodies[0])).unwrap();
    assert_eq!(predict, json!({ "text": "ipad", "k": 1 }));

    let engine_bodies = engine.join().unwrap();
    let request: Value = serde_json::from_str(body(&engine_bodies[0])).unwrap();
    let bool_query = bool_clause(&request);
    assert_eq!(
        bool_query["filter"],
        json!([{ "terms": { "categoryPathIds": ["abcat0500000"] } }])
    );
    let should = bool_query["should"].as_array().unwrap();
    assert_eq!(
        should.last().unwrap(),
        &json!({ "query_string": { "query": "1065813^0.750", "fields": ["_id"] } })
    );
    assert_eq!(request["size"], json!(10));
    assert_eq!(request["sort"], json!([{ "_score": { "order": "desc" } }]));
}

#[test]
fn label_model_failure_skips_only_that_query() {
    let (model_url, _model) = scripted_server(vec![
        http_response(500, r#"{"error":"model not loaded"}"#),
        http_response(
            200,
            r#"{"labels":["__label__cat1","__label__cat2"],"probabilities":[0.3,0.1]}"#,
        ),
    ]);
    let (engine_url, engine) = scripted_server(vec![http_response(200, NO_HITS)]);
    let searcher = searcher_against(&engine_url, Some(&model_url));

    let mut out = Vec::new();
    let stats = run_interactive(
        &searcher,
        &SearchOptions::default(),
        OutputFormat::Table,
        Cursor::new("tv\nlaptop\n"),
        &mut out,
    )
    .unwrap();
    assert_eq!(
        stats,
        SessionStats {
            queries: 2,
            with_hits: 0,
            failed: 1
        }
    );

    let bodies = engine.join().unwrap();
    assert_eq!(bodies.len(), 1);
    let request: Value = serde_json::from_str(body(&bodies[0])).unwrap();
    assert_eq!(bool_clause(&request)["filter"], json!([]));
}

#[test]
fn wildcard_query_matches_everything() {
    let (engine_url, engine) = scripted_server(vec![http_response(200, ONE_HIT)]);
    let searcher = searcher_against(&engine_url, None);

    let response = searcher
        .search("*", &SearchOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(response.hits[0].id, "1065813");

    let bodies = engine.join().unwrap();
    let request: Value = serde_json::from_str(body(&bodies[0])).unwrap();
    assert_eq!(request["query"], json!({ "match_all": {} }));
}

#[test]
fn engine_errors_surface_with_index_name() {
    let (engine_url, _engine) = scripted_server(vec![http_response(404, "")]);
    let searcher = searcher_against(&engine_url, None);
    let options = SearchOptions {
        index: "missing_products".into(),
        ..SearchOptions::default()
    };

    let err = searcher.search("tv", &options).unwrap_err();
    assert!(format!("{:#}", err).contains("missing_products"));
}

#[test]
fn unreachable_engine_is_reported_not_fatal() {
    let searcher = searcher_against("http://127.0.0.1:9", None);
    let mut out = Vec::new();
    let stats = run_interactive(
        &searcher,
        &SearchOptions::default(),
        OutputFormat::Json,
        Cursor::new("tv\nExit\n"),
        &mut out,
    )
    .unwrap();
    assert_eq!(stats.failed, 1);
}

#[test]
fn priors_keyed_by_normalized_query_text() {
    let mut raw = HashMap::new();
    raw.insert(
        "  LCD TV ".to_string(),
        vec![
            ClickRow::new("111", 1.0, 2.0),
            ClickRow::new("222", 1.0, 8.0),
        ],
    );
    let table = ClickPriorTable::from_entries(raw);
    assert_eq!(table.prior_for("lcd tv").as_deref(), Some("111^0.500 222^0.125"));
    assert!(table.prior_for("oled tv").is_none());
}
