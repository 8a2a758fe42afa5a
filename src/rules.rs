//! Keyword tables that turn warning titles into short tips and labels.
//!
//! Both tables are ordered lists of `(keywords, label)` rules loaded from the
//! JSON files under `rules/`. A title matches a rule when it contains any of
//! the rule's keywords; the first matching rule wins.

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::weather::Warning;

static TIP_RULES: Lazy<TipRules> = Lazy::new(|| {
    TipRules::from_json(include_str!("../rules/tips.json")).expect("Failed to parse built-in tip rules")
});

static LABEL_RULES: Lazy<LabelRules> = Lazy::new(|| {
    LabelRules::from_json(include_str!("../rules/warning_labels.json"))
        .expect("Failed to parse built-in warning label rules")
});

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub keywords: Vec<String>,
    #[serde(alias = "tip")]
    pub label: String,
}

impl Rule {
    fn matches(&self, title: &str) -> bool {
        self.keywords.iter().any(|keyword| title.contains(keyword.to_lowercase().as_str()))
    }
}

fn first_match<'a>(rules: &'a [Rule], title: &str) -> Option<&'a str> {
    if title.is_empty() {
        return None;
    }
    let title = title.to_lowercase();
    rules.iter().find(|rule| rule.matches(&title)).map(|rule| rule.label.as_str())
}

/// Messages used when no warning produced a tip.
#[derive(Debug, Clone, Deserialize)]
pub struct TipFallback {
    pub hot_above: f64,
    pub cold_below: f64,
    pub hot: String,
    pub cold: String,
    pub mild: String,
    pub default: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TipRules {
    pub rules: Vec<Rule>,
    pub max_tips: usize,
    pub fallback: TipFallback,
}

impl TipRules {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AppError::ConfigError(format!("Invalid tip rules: {}", e)))
    }

    pub fn builtin() -> &'static TipRules {
        &TIP_RULES
    }

    pub fn tip_for(&self, title: &str) -> Option<&str> {
        first_match(&self.rules, title)
    }

    /// Builds the tip shown at the bottom of the push message.
    ///
    /// Each warning contributes at most one tip; duplicates collapse and only
    /// the first `max_tips` survive, one per line. Without any tip the message
    /// falls back to a temperature band, or to a fixed default when the
    /// temperature is unknown.
    pub fn generate(&self, warnings: &[Warning], temperature: Option<f64>) -> String {
        let mut tips: Vec<&str> = Vec::new();
        for warning in warnings {
            if let Some(tip) = self.tip_for(warning.title()) {
                if !tips.contains(&tip) {
                    tips.push(tip);
                }
            }
        }

        if !tips.is_empty() {
            tips.truncate(self.max_tips);
            return tips.join("\n");
        }

        let fallback = &self.fallback;
        match temperature {
            Some(t) if t > fallback.hot_above => fallback.hot.clone(),
            Some(t) if t < fallback.cold_below => fallback.cold.clone(),
            Some(_) => fallback.mild.clone(),
            None => fallback.default.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelRules {
    pub rules: Vec<Rule>,
    pub unmatched: String,
    pub none: String,
    pub separator: String,
}

impl LabelRules {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AppError::ConfigError(format!("Invalid label rules: {}", e)))
    }

    pub fn builtin() -> &'static LabelRules {
        &LABEL_RULES
    }

    pub fn label_for<'a>(&'a self, title: &str) -> &'a str {
        first_match(&self.rules, title).unwrap_or(&self.unmatched)
    }

    /// Short tags for every warning, in input order.
    pub fn summarize(&self, warnings: &[Warning]) -> String {
        if warnings.is_empty() {
            return self.none.clone();
        }
        warnings
            .iter()
            .map(|warning| self.label_for(warning.title()))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

pub fn generate_tip(warnings: &[Warning], temperature: Option<f64>) -> String {
    TipRules::builtin().generate(warnings, temperature)
}

pub fn warning_labels(warnings: &[Warning]) -> String {
    LabelRules::builtin().summarize(warnings)
}
