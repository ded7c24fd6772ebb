mod common;

use common::{body, http_response, scripted_server};
use prodsearch::classifier::{HttpLabelPredictor, LabelPredictor, Prediction};
use prodsearch::engine::{OpenSearchClient, SearchEngine};
use prodsearch::query::{build_lexical, LexicalParams};
use serde_json::Value;

#[test]
fn engine_posts_query_with_basic_auth() {
    let hit = r#"{"took": 3, "hits": {"total": {"value": 1}, "hits": [{"_id": "42", "_score": 1.5, "_source": {"name": "TV"}}]}}"#;
    let (url, server) = scripted_server(vec![http_response(200, hit)]);
    let client = OpenSearchClient::new(url, 5).with_basic_auth("admin", "admin");

    let query = build_lexical(LexicalParams::new("tv"));
    let response = client.search(&query, "bbuy_products").unwrap();
    let requests = server.join().unwrap();

    assert!(requests[0].starts_with("POST /bbuy_products/_search"));
    assert!(requests[0].contains("Authorization: Basic YWRtaW46YWRtaW4="));
    let sent: Value = serde_json::from_str(body(&requests[0])).unwrap();
    assert!(sent["query"].get("function_score").is_some());
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].id, "42");
}

#[test]
fn engine_reports_missing_index() {
    let (url, server) = scripted_server(vec![http_response(404, "")]);
    let client = OpenSearchClient::new(url, 5);

    let query = build_lexical(LexicalParams::new("tv"));
    let err = client.search(&query, "nope").unwrap_err();
    server.join().unwrap();

    assert!(err.to_string().contains("index 'nope' not found"));
}

#[test]
fn label_model_parses_parallel_arrays() {
    let (url, server) = scripted_server(vec![http_response(
        200,
        r#"{"labels": ["__label__abcat0101000"], "probabilities": [0.82]}"#,
    )]);
    let predictor = HttpLabelPredictor::new(format!("{}/predict", url), 5);

    let prediction = predictor.predict("tv", 1).unwrap();
    let requests = server.join().unwrap();

    assert_eq!(prediction, Prediction::new(&[("__label__abcat0101000", 0.82)]));
    assert!(requests[0].starts_with("POST /predict"));
    let sent: Value = serde_json::from_str(body(&requests[0])).unwrap();
    assert_eq!(sent["text"], "tv");
    assert_eq!(sent["k"], 1);
}

#[test]
fn label_model_rejects_mismatched_arrays() {
    let (url, server) = scripted_server(vec![http_response(
        200,
        r#"{"labels": ["a", "b"], "probabilities": [0.5]}"#,
    )]);
    let predictor = HttpLabelPredictor::new(format!("{}/predict", url), 5);

    let err = predictor.predict("tv", 2).unwrap_err();
    server.join().unwrap();

    assert!(err.to_string().contains("2 labels but 1 probabilities"));
}

#[test]
fn label_model_surfaces_status_errors_with_body() {
    let (url, server) = scripted_server(vec![http_response(503, "model loading")]);
    let predictor = HttpLabelPredictor::new(format!("{}/predict", url), 5);

    let err = predictor.predict("tv", 1).unwrap_err();
    server.join().unwrap();

    let msg = err.to_string();
    assert!(msg.contains("503"));
    assert!(msg.contains("model loading"));
}
