use std::fmt;
use std::str::FromStr;

/// Normalized output of any format-specific parser. The sign convention
/// (negative = expense/outflow, positive = income/inflow) is the parser's
/// responsibility; the core never re-derives it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: String, // ISO 8601
    pub description: String,
    pub amount: f64,
}

/// How a rule's pattern is tested against a transaction description.
/// All three variants match case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Contains,
    StartsWith,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Regex => "regex",
        }
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "regex" => Ok(Self::Regex),
            other => Err(format!(
                "invalid match type '{other}' (expected contains, starts_with, or regex)"
            )),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
