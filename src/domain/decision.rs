//! Trading decisions and their provenance.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    /// Case-insensitive; external responses are normalized through here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            other => Err(format!("unknown action {other:?}")),
        }
    }
}

/// Which layer produced the decision that was ultimately executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionSource {
    Rule,
    Advisory,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionSource::Rule => write!(f, "RULE"),
            DecisionSource::Advisory => write!(f, "ADVISORY"),
        }
    }
}

/// One evaluation step's proposed action. `size_percent` is a percentage of
/// the relevant side's balance: cash for BUY, holdings for SELL.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub size_percent: f64,
    pub reason: String,
    pub source: DecisionSource,
}

impl Decision {
    pub fn hold(reason: impl Into<String>) -> Self {
        Decision {
            action: Action::Hold,
            size_percent: 0.0,
            reason: reason.into(),
            source: DecisionSource::Rule,
        }
    }
}
