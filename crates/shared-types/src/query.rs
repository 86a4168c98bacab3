//! Free-text query results
//!
//! The backend answers a query with arbitrary JSON. [`QueryResult`] keeps the
//! payload untouched and offers a lenient typed view for the planner fields
//! the backend is known to return.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Answer to one submitted query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query text as submitted
    pub query: String,
    /// Server payload, unmodified
    pub response: Value,
}

impl QueryResult {
    pub fn new(query: impl Into<String>, response: Value) -> Self {
        Self {
            query: query.into(),
            response,
        }
    }

    /// Display payload: response fields laid over `{query}`
    ///
    /// A response field named `query` replaces the submitted text. A
    /// non-object response is nested under `response`.
    pub fn merged(&self) -> Value {
        let mut merged = Map::new();
        merged.insert("query".to_string(), Value::String(self.query.clone()));
        match &self.response {
            Value::Object(fields) => {
                for (key, value) in fields {
                    merged.insert(key.clone(), value.clone());
                }
            }
            other => {
                merged.insert("response".to_string(), other.clone());
            }
        }
        Value::Object(merged)
    }

    /// Pretty-printed merged payload for display
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.merged()).unwrap_or_default()
    }

    /// Typed view of the planner response; missing fields default
    pub fn outcome(&self) -> QueryOutcome {
        QueryOutcome::deserialize(&self.response).unwrap_or_default()
    }
}

/// Overall planner verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    Violations,
    NoPlan,
    Error,
    #[serde(other)]
    Unknown,
}

/// A planned command rejected by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanViolation {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub rule: String,
}

/// Typed planner fields of a query response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    #[serde(default)]
    pub status: Option<QueryStatus>,
    #[serde(default)]
    pub safe_plan: Vec<String>,
    #[serde(default)]
    pub violations: Vec<PlanViolation>,
    #[serde(default)]
    pub planner_raw: Option<String>,
}

impl QueryOutcome {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// One passage returned by an index search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Response to `POST /test-rag`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}
