//! Lexical multi-clause query: fuzzy, phrase, cross-field, SKU and partial-name
//! matching, scored by sales-rank decay with an optional click-prior clause.

use super::dsl::{
    BoolQuery, FunctionScoreQuery, MatchPhraseQuery, MatchQuery, MultiMatchQuery, Query,
    QueryStringQuery, ScoreFunction, ScoreFunctionKind, TermsQuery,
};
use super::{SortClause, SortOrder, StructuredQuery, DEFAULT_SIZE, DEFAULT_SORT_FIELD};

pub const NAME_FIELD: &str = "name";
pub const NAME_SYNONYMS_FIELD: &str = "name.synonyms";
pub const NAME_HYPHENS_FIELD: &str = "name.hyphens";
pub const SKU_FIELD: &str = "sku";
pub const DOC_ID_FIELD: &str = "_id";
pub const CATEGORY_FIELD: &str = "categoryPathIds";

const WILDCARD_MARKERS: [&str; 2] = ["*", "#"];

const FUZZY_BOOST: f64 = 0.01;
const FUZZY_EDITS: &str = "1";
const FUZZY_PREFIX_LENGTH: u32 = 2;
const NAME_PHRASE_SLOP: u32 = 1;
const NAME_PHRASE_BOOST: u32 = 50;
const CROSS_FIELD_SLOP: &str = "6";
const SKU_BOOST: f64 = 50.0;
/// At least 2 terms, or 75% of them once the query is longer than 2 terms.
const GRADUATED_MINIMUM_MATCH: &str = "2<75%";

const CROSS_FIELDS: [&str; 9] = [
    "name^10",
    "name.hyphens^10",
    "shortDescription^5",
    "longDescription^5",
    "department^0.5",
    "sku",
    "manufacturer",
    "features",
    "categoryPath",
];

const POPULARITY_ORIGIN: &str = "1.0";
const POPULARITY_HORIZONS: [(&str, &str); 3] = [
    ("salesRankShortTerm", "100"),
    ("salesRankMediumTerm", "1000"),
    ("salesRankLongTerm", "1000"),
];
const POPULARITY_FLOOR: &str = "0.0001";

/// Inputs to [`build_lexical`]. Construct with [`LexicalParams::new`] and override fields.
#[derive(Debug, Clone)]
pub struct LexicalParams<'a> {
    pub query: &'a str,
    pub click_prior: Option<&'a str>,
    pub filters: Vec<Query>,
    pub sort: &'a str,
    pub sort_order: SortOrder,
    pub size: usize,
    pub source: Option<Vec<String>>,
    pub synonyms: bool,
}

impl<'a> LexicalParams<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            click_prior: None,
            filters: Vec::new(),
            sort: DEFAULT_SORT_FIELD,
            sort_order: SortOrder::Desc,
            size: DEFAULT_SIZE,
            source: None,
            synonyms: false,
        }
    }
}

pub fn is_wildcard(query: &str) -> bool {
    WILDCARD_MARKERS.contains(&query)
}

/// Hard filter restricting results to the given category ids; `None` when there are none.
pub fn category_filter(categories: &[String]) -> Option<Query> {
    if categories.is_empty() {
        return None;
    }
    Some(Query::terms(CATEGORY_FIELD, categories.iter().cloned()))
}

pub fn build_lexical(params: LexicalParams<'_>) -> StructuredQuery {
    let query = if is_wildcard(params.query) {
        Query::MatchAll
    } else {
        scored_query(&params)
    };

    StructuredQuery {
        size: params.size,
        sort: vec![SortClause {
            field: params.sort.to_string(),
            order: params.sort_order,
        }],
        query,
        source: params.source,
    }
}

fn scored_query(params: &LexicalParams<'_>) -> Query {
    let text = params.query;
    let fuzzy_field = if params.synonyms {
        NAME_SYNONYMS_FIELD
    } else {
        NAME_FIELD
    };

    let mut should = vec![
        Query::Match(MatchQuery {
            field: fuzzy_field.to_string(),
            query: text.to_string(),
            fuzziness: Some(FUZZY_EDITS.to_string()),
            prefix_length: Some(FUZZY_PREFIX_LENGTH),
            boost: Some(FUZZY_BOOST),
            ..Default::default()
        }),
        Query::MatchPhrase(MatchPhraseQuery {
            field: NAME_HYPHENS_FIELD.to_string(),
            query: text.to_string(),
            slop: NAME_PHRASE_SLOP,
            boost: Some(NAME_PHRASE_BOOST),
        }),
        Query::MultiMatch(MultiMatchQuery {
            query: text.to_string(),
            slop: Some(CROSS_FIELD_SLOP.to_string()),
            minimum_should_match: Some(GRADUATED_MINIMUM_MATCH.to_string()),
            fields: CROSS_FIELDS.iter().map(|f| f.to_string()).collect(),
        }),
        Query::Terms(TermsQuery {
            field: SKU_FIELD.to_string(),
            values: text.split_whitespace().map(str::to_string).collect(),
            boost: Some(SKU_BOOST),
        }),
        Query::Match(MatchQuery {
            field: NAME_HYPHENS_FIELD.to_string(),
            query: text.to_string(),
            any_term: true,
            minimum_should_match: Some(GRADUATED_MINIMUM_MATCH.to_string()),
            ..Default::default()
        }),
    ];

    if let Some(prior) = params.click_prior.map(str::trim).filter(|p| !p.is_empty()) {
        should.push(Query::QueryString(QueryStringQuery {
            query: prior.to_string(),
            fields: vec![DOC_ID_FIELD.to_string()],
        }));
    }

    let boolean = Query::Bool(BoolQuery {
        must: Vec::new(),
        should,
        filter: params.filters.clone(),
        minimum_should_match: Some(1),
    });

    Query::FunctionScore(FunctionScoreQuery {
        query: Box::new(boolean),
        functions: popularity_functions(),
    })
}

fn popularity_functions() -> Vec<ScoreFunction> {
    let mut functions: Vec<ScoreFunction> = POPULARITY_HORIZONS
        .iter()
        .map(|(field, scale)| ScoreFunction {
            filter: Some(Query::exists(field)),
            kind: ScoreFunctionKind::Gauss {
                field: field.to_string(),
                origin: POPULARITY_ORIGIN.to_string(),
                scale: scale.to_string(),
            },
        })
        .collect();
    functions.push(ScoreFunction {
        filter: None,
        kind: ScoreFunctionKind::ScriptScore {
            script: POPULARITY_FLOOR.to_string(),
        },
    });
    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn should_clauses(q: &StructuredQuery) -> &[Query] {
        let Query::FunctionScore(fs) = &q.query else {
            panic!("expected function_score, got {:?}", q.query);
        };
        let Query::Bool(b) = fs.query.as_ref() else {
            panic!("expected bool inside function_score");
        };
        &b.should
    }

    #[test]
    fn wildcard_markers_replace_query_with_match_all() {
        for marker in ["*", "#"] {
            let mut params = LexicalParams::new(marker);
            params.click_prior = Some("1^0.500");
            params.filters = vec![Query::terms(CATEGORY_FIELD, ["abcat0101000"])];
            params.synonyms = true;
            let q = build_lexical(params);
            assert_eq!(q.query, Query::MatchAll);
        }
    }

    #[test]
    fn wildcard_requires_exact_marker() {
        assert!(is_wildcard("*"));
        assert!(!is_wildcard("**"));
        assert!(!is_wildcard(" *"));
        assert!(!is_wildcard("tv*"));
    }

    #[test]
    fn sku_clause_splits_on_whitespace() {
        let q = build_lexical(LexicalParams::new("ABC-123 XYZ-9"));
        let sku = should_clauses(&q)
            .iter()
            .find_map(|c| match c {
                Query::Terms(t) if t.field == SKU_FIELD => Some(t),
                _ => None,
            })
            .expect("sku clause");
        assert_eq!(sku.values, vec!["ABC-123", "XYZ-9"]);
        assert_eq!(sku.boost, Some(50.0));
    }

    #[test]
    fn five_base_clauses_without_prior() {
        let q = build_lexical(LexicalParams::new("ipad"));
        let should = should_clauses(&q);
        assert_eq!(should.len(), 5);
        assert!(should
            .iter()
            .all(|c| c.target_field() != Some(DOC_ID_FIELD)));
    }

    #[test]
    fn click_prior_adds_one_id_clause() {
        let mut params = LexicalParams::new("ipad");
        params.click_prior = Some("1065813^0.250 8371111^0.031");
        let q = build_lexical(params);
        let should = should_clauses(&q);
        assert_eq!(should.len(), 6);
        let id_clauses: Vec<_> = should
            .iter()
            .filter(|c| c.target_field() == Some(DOC_ID_FIELD))
            .collect();
        assert_eq!(id_clauses.len(), 1);
        assert_eq!(
            id_clauses[0].to_json(),
            json!({ "query_string": { "query": "1065813^0.250 8371111^0.031", "fields": ["_id"] } })
        );
    }

    #[test]
    fn blank_click_prior_is_ignored() {
        let mut params = LexicalParams::new("ipad");
        params.click_prior = Some("   ");
        assert_eq!(should_clauses(&build_lexical(params)).len(), 5);
    }

    #[test]
    fn synonyms_swap_only_the_fuzzy_field() {
        let plain = build_lexical(LexicalParams::new("laptop"));
        let mut params = LexicalParams::new("laptop");
        params.synonyms = true;
        let synonyms = build_lexical(params);

        let plain_should = should_clauses(&plain);
        let syn_should = should_clauses(&synonyms);
        assert_eq!(plain_should[0].target_field(), Some(NAME_FIELD));
        assert_eq!(syn_should[0].target_field(), Some(NAME_SYNONYMS_FIELD));
        assert_eq!(plain_should[1..], syn_should[1..]);
    }

    #[test]
    fn filters_are_hard_filters() {
        let mut params = LexicalParams::new("tv");
        params.filters = vec![category_filter(&["abcat0101001".to_string()]).unwrap()];
        let value = build_lexical(params).to_json();
        assert_eq!(
            value["query"]["function_score"]["query"]["bool"]["filter"],
            json!([{ "terms": { "categoryPathIds": ["abcat0101001"] } }])
        );
        assert_eq!(
            value["query"]["function_score"]["query"]["bool"]["minimum_should_match"],
            json!(1)
        );
    }

    #[test]
    fn category_filter_is_none_for_empty_set() {
        assert!(category_filter(&[]).is_none());
    }

    #[test]
    fn scoring_functions_sum_then_multiply() {
        let value = build_lexical(LexicalParams::new("tv")).to_json();
        let fs = &value["query"]["function_score"];
        assert_eq!(fs["score_mode"], json!("sum"));
        assert_eq!(fs["boost_mode"], json!("multiply"));
        assert_eq!(
            fs["functions"],
            json!([
                {
                    "filter": { "exists": { "field": "salesRankShortTerm" } },
                    "gauss": { "salesRankShortTerm": { "origin": "1.0", "scale": "100" } }
                },
                {
                    "filter": { "exists": { "field": "salesRankMediumTerm" } },
                    "gauss": { "salesRankMediumTerm": { "origin": "1.0", "scale": "1000" } }
                },
                {
                    "filter": { "exists": { "field": "salesRankLongTerm" } },
                    "gauss": { "salesRankLongTerm": { "origin": "1.0", "scale": "1000" } }
                },
                { "script_score": { "script": "0.0001" } }
            ])
        );
    }

    #[test]
    fn clause_constants_match_wire_contract() {
        let value = build_lexical(LexicalParams::new("apple ipad")).to_json();
        let should = &value["query"]["function_score"]["query"]["bool"]["should"];
        assert_eq!(
            should[0],
            json!({ "match": { "name": {
                "query": "apple ipad", "fuzziness": "1", "prefix_length": 2, "boost": 0.01
            } } })
        );
        assert_eq!(
            should[1],
            json!({ "match_phrase": { "name.hyphens": {
                "query": "apple ipad", "slop": 1, "boost": 50
            } } })
        );
        assert_eq!(should[2]["multi_match"]["type"], json!("phrase"));
        assert_eq!(should[2]["multi_match"]["slop"], json!("6"));
        assert_eq!(should[2]["multi_match"]["minimum_should_match"], json!("2<75%"));
        assert_eq!(should[2]["multi_match"]["fields"][0], json!("name^10"));
        assert_eq!(
            should[4],
            json!({ "match": { "name.hyphens": {
                "query": "apple ipad", "operator": "OR", "minimum_should_match": "2<75%"
            } } })
        );
    }

    #[test]
    fn numeric_literals_keep_their_wire_encoding() {
        let body = build_lexical(LexicalParams::new("tv")).to_json().to_string();
        assert!(body.contains(r#"{"salesRankShortTerm":{"origin":"1.0","scale":"100"}}"#));
        assert!(body.contains(r#"{"salesRankLongTerm":{"origin":"1.0","scale":"1000"}}"#));
        assert!(body.contains(r#""slop":"6""#));
        assert!(body.contains(r#""boost":50,"#) || body.contains(r#""boost":50}"#));
        assert!(body.contains(r#""boost":50.0"#));
    }

    #[test]
    fn sort_size_and_source_are_forwarded() {
        let mut params = LexicalParams::new("tv");
        params.sort = "salesRankShortTerm";
        params.sort_order = SortOrder::Asc;
        params.size = 25;
        params.source = Some(vec!["name".into(), "shortDescription".into()]);
        let value = build_lexical(params).to_json();
        assert_eq!(value["size"], json!(25));
        assert_eq!(value["sort"], json!([{ "salesRankShortTerm": { "order": "asc" } }]));
        assert_eq!(value["_source"], json!(["name", "shortDescription"]));
    }

    #[test]
    fn missing_source_returns_all_fields() {
        let value = build_lexical(LexicalParams::new("tv")).to_json();
        assert!(value.get("_source").is_none());
    }
}
