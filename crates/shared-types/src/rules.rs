//! Typed compliance rules held per document
//!
//! A rule set has three independent, ordered categories. Values are kept
//! exactly as the backend returns them, including duplicates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rule category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Allowed,
    Forbidden,
    Required,
}

impl RuleType {
    /// All categories in display order
    pub const ALL: [RuleType; 3] = [RuleType::Allowed, RuleType::Forbidden, RuleType::Required];

    /// Wire tag used in query parameters and JSON keys
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allowed => "allowed",
            RuleType::Forbidden => "forbidden",
            RuleType::Required => "required",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag is not one of the three rule categories
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown rule type '{0}': expected allowed, forbidden or required")]
pub struct UnknownRuleType(pub String);

impl FromStr for RuleType {
    type Err = UnknownRuleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowed" => Ok(RuleType::Allowed),
            "forbidden" => Ok(RuleType::Forbidden),
            "required" => Ok(RuleType::Required),
            other => Err(UnknownRuleType(other.to_string())),
        }
    }
}

/// Rules for a single document, grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl RuleSet {
    /// The empty rule set shown when nothing is selected
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, rule_type: RuleType) -> &[String] {
        match rule_type {
            RuleType::Allowed => &self.allowed,
            RuleType::Forbidden => &self.forbidden,
            RuleType::Required => &self.required,
        }
    }

    pub fn get_mut(&mut self, rule_type: RuleType) -> &mut Vec<String> {
        match rule_type {
            RuleType::Allowed => &mut self.allowed,
            RuleType::Forbidden => &mut self.forbidden,
            RuleType::Required => &mut self.required,
        }
    }

    pub fn contains(&self, rule_type: RuleType, value: &str) -> bool {
        self.get(rule_type).iter().any(|v| v == value)
    }

    /// Total number of rules across all categories
    pub fn len(&self) -> usize {
        self.allowed.len() + self.forbidden.len() + self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every rule as `(category, value)` in category order
    pub fn iter(&self) -> impl Iterator<Item = (RuleType, &str)> + '_ {
        RuleType::ALL.into_iter().flat_map(move |rule_type| {
            self.get(rule_type)
                .iter()
                .map(move |value| (rule_type, value.as_str()))
        })
    }
}
