//! Typed clause tree for the engine's query DSL.
//!
//! Builders assemble [`Query`] values; [`Query::to_json`] is the only place the
//! wire shape is spelled out.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

fn keyed(key: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), body);
    Value::Object(map)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Match(MatchQuery),
    MatchPhrase(MatchPhraseQuery),
    MultiMatch(MultiMatchQuery),
    Terms(TermsQuery),
    QueryString(QueryStringQuery),
    Exists { field: String },
    Bool(BoolQuery),
    FunctionScore(FunctionScoreQuery),
    Knn(KnnQuery),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchQuery {
    pub field: String,
    pub query: String,
    pub fuzziness: Option<String>,
    pub prefix_length: Option<u32>,
    /// Emit `"operator": "OR"`
    pub any_term: bool,
    pub minimum_should_match: Option<String>,
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchPhraseQuery {
    pub field: String,
    pub query: String,
    pub slop: u32,
    /// Integral on the wire
    pub boost: Option<u32>,
}

/// Phrase-type `multi_match` across several, optionally boosted, fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiMatchQuery {
    pub query: String,
    /// Sent verbatim, e.g. `"6"`
    pub slop: Option<String>,
    pub minimum_should_match: Option<String>,
    /// Field names, optionally carrying a `^boost` suffix.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<String>,
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryStringQuery {
    pub query: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub filter: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreFunctionKind {
    /// `origin` and `scale` are sent as the strings given.
    Gauss {
        field: String,
        origin: String,
        scale: String,
    },
    ScriptScore { script: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFunction {
    pub filter: Option<Query>,
    pub kind: ScoreFunctionKind,
}

/// Function scores are summed and the sum multiplies the wrapped query's score.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionScoreQuery {
    pub query: Box<Query>,
    pub functions: Vec<ScoreFunction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    pub field: String,
    pub vector: Vec<f32>,
    pub k: usize,
}

impl Query {
    pub fn terms<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Terms(TermsQuery {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            boost: None,
        })
    }

    pub fn exists(field: &str) -> Self {
        Query::Exists {
            field: field.to_string(),
        }
    }

    /// Field a leaf clause targets, if it targets exactly one.
    pub fn target_field(&self) -> Option<&str> {
        match self {
            Query::Match(m) => Some(&m.field),
            Query::MatchPhrase(m) => Some(&m.field),
            Query::Terms(t) => Some(&t.field),
            Query::Exists { field } => Some(field),
            Query::Knn(k) => Some(&k.field),
            Query::QueryString(q) if q.fields.len() == 1 => Some(&q.fields[0]),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match(m) => {
                let mut body = Map::new();
                body.insert("query".into(), json!(m.query));
                if let Some(fuzziness) = &m.fuzziness {
                    body.insert("fuzziness".into(), json!(fuzziness));
                }
                if let Some(prefix_length) = m.prefix_length {
                    body.insert("prefix_length".into(), json!(prefix_length));
                }
                if m.any_term {
                    body.insert("operator".into(), json!("OR"));
                }
                if let Some(msm) = &m.minimum_should_match {
                    body.insert("minimum_should_match".into(), json!(msm));
                }
                if let Some(boost) = m.boost {
                    body.insert("boost".into(), json!(boost));
                }
                keyed("match", keyed(&m.field, Value::Object(body)))
            }
            Query::MatchPhrase(m) => {
                let mut body = Map::new();
                body.insert("query".into(), json!(m.query));
                body.insert("slop".into(), json!(m.slop));
                if let Some(boost) = m.boost {
                    body.insert("boost".into(), json!(boost));
                }
                keyed("match_phrase", keyed(&m.field, Value::Object(body)))
            }
            Query::MultiMatch(m) => {
                let mut body = Map::new();
                body.insert("query".into(), json!(m.query));
                body.insert("type".into(), json!("phrase"));
                if let Some(slop) = &m.slop {
                    body.insert("slop".into(), json!(slop));
                }
                if let Some(msm) = &m.minimum_should_match {
                    body.insert("minimum_should_match".into(), json!(msm));
                }
                body.insert("fields".into(), json!(m.fields));
                keyed("multi_match", Value::Object(body))
            }
            Query::Terms(t) => {
                let mut body = Map::new();
                body.insert(t.field.clone(), json!(t.values));
                if let Some(boost) = t.boost {
                    body.insert("boost".into(), json!(boost));
                }
                keyed("terms", Value::Object(body))
            }
            Query::QueryString(q) => json!({
                "query_string": { "query": q.query, "fields": q.fields }
            }),
            Query::Exists { field } => json!({ "exists": { "field": field } }),
            Query::Bool(b) => {
                let mut body = Map::new();
                body.insert("must".into(), Self::clauses(&b.must));
                body.insert("should".into(), Self::clauses(&b.should));
                if let Some(msm) = b.minimum_should_match {
                    body.insert("minimum_should_match".into(), json!(msm));
                }
                body.insert("filter".into(), Self::clauses(&b.filter));
                keyed("bool", Value::Object(body))
            }
            Query::FunctionScore(f) => json!({
                "function_score": {
                    "query": f.query.to_json(),
                    "boost_mode": "multiply",
                    "score_mode": "sum",
                    "functions": f.functions.iter().map(ScoreFunction::to_json).collect::<Vec<_>>(),
                }
            }),
            Query::Knn(k) => keyed(
                "knn",
                keyed(&k.field, json!({ "vector": k.vector, "k": k.k })),
            ),
        }
    }

    fn clauses(queries: &[Query]) -> Value {
        Value::Array(queries.iter().map(Query::to_json).collect())
    }
}

impl ScoreFunction {
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        if let Some(filter) = &self.filter {
            body.insert("filter".into(), filter.to_json());
        }
        match &self.kind {
            ScoreFunctionKind::Gauss {
                field,
                origin,
                scale,
            } => {
                body.insert(
                    "gauss".into(),
                    keyed(field, json!({ "origin": origin, "scale": scale })),
                );
            }
            ScoreFunctionKind::ScriptScore { script } => {
                body.insert("script_score".into(), json!({ "script": script }));
            }
        }
        Value::Object(body)
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
