//! Structured retrieval requests and the builders that produce them.

mod dsl;
mod lexical;
mod vector;

use clap::ValueEnum;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub use dsl::{
    BoolQuery, FunctionScoreQuery, KnnQuery, MatchPhraseQuery, MatchQuery, MultiMatchQuery,
    Query, QueryStringQuery, ScoreFunction, ScoreFunctionKind, TermsQuery,
};
pub use lexical::{
    build_lexical, category_filter, is_wildcard, LexicalParams, CATEGORY_FIELD, DOC_ID_FIELD,
    NAME_FIELD, NAME_HYPHENS_FIELD, NAME_SYNONYMS_FIELD, SKU_FIELD,
};
pub use vector::{build_vector, VectorParams, VECTOR_FIELD};

pub const DEFAULT_SORT_FIELD: &str = "_score";
pub const DEFAULT_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One `{field: {"order": dir}}` entry of the request's sort list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
}

impl Serialize for SortClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Order(SortOrder);

        impl Serialize for Order {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("order", self.0.as_str())?;
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &Order(self.order))?;
        map.end()
    }
}

/// Complete request body submitted to the engine's `_search` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredQuery {
    pub size: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,
    pub query: Query,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
}

impl StructuredQuery {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_clause_serializes_as_nested_map() {
        let clause = SortClause {
            field: "_score".into(),
            order: SortOrder::Desc,
        };
        assert_eq!(
            serde_json::to_value(&clause).unwrap(),
            json!({ "_score": { "order": "desc" } })
        );
    }

    #[test]
    fn structured_query_omits_empty_sort_and_source() {
        let q = StructuredQuery {
            size: 5,
            sort: Vec::new(),
            query: Query::MatchAll,
            source: None,
        };
        assert_eq!(q.to_json(), json!({ "size": 5, "query": { "match_all": {} } }));
    }

    #[test]
    fn structured_query_renames_source() {
        let q = StructuredQuery {
            size: 1,
            sort: vec![SortClause {
                field: "price".into(),
                order: SortOrder::Asc,
            }],
            query: Query::MatchAll,
            source: Some(vec!["name".into()]),
        };
        let value = q.to_json();
        assert_eq!(value["_source"], json!(["name"]));
        assert_eq!(value["sort"], json!([{ "price": { "order": "asc" } }]));
    }

    #[test]
    fn sort_order_parses_lowercase() {
        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }
}
