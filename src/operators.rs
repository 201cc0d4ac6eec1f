use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lexer;
use crate::mutants::RuleCategory;

/// Swaps one whole token for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub token: String,
    pub replacement: String,
    pub description: String,
    pub category: RuleCategory,
    /// Only fire when the token follows an operand (never on `*args`, `/`
    /// parameter markers or `**kwargs`).
    #[serde(default)]
    pub binary_only: bool,
}

impl RewriteRule {
    fn new(token: &str, replacement: &str, category: RuleCategory, binary_only: bool) -> Self {
        RewriteRule {
            token: token.to_string(),
            replacement: replacement.to_string(),
            description: format!("Change {} to {}", token, replacement),
            category,
            binary_only,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !lexer::is_single_token(&self.token) {
            return Err(ConfigError::InvalidRuleToken {
                token: self.token.clone(),
                description: self.description.clone(),
            });
        }
        if self.replacement.contains('\n') || self.replacement.contains('\r') {
            return Err(ConfigError::MultilineReplacement {
                description: self.description.clone(),
            });
        }
        Ok(())
    }
}

/// Default catalog, in the order rules are tried on each line.
pub fn default_catalog() -> Vec<RewriteRule> {
    use RuleCategory::*;
    vec![
        // Arithmetic
        RewriteRule::new("+", "-", Arithmetic, false),
        RewriteRule::new("-", "+", Arithmetic, false),
        RewriteRule::new("*", "/", Arithmetic, true),
        RewriteRule::new("/", "*", Arithmetic, true),
        RewriteRule::new("//", "/", Arithmetic, true),
        RewriteRule::new("%", "*", Arithmetic, true),
        RewriteRule::new("**", "*", Arithmetic, true),
        // Relational
        RewriteRule::new("==", "!=", Relational, false),
        RewriteRule::new("!=", "==", Relational, false),
        RewriteRule::new(">", "<=", Relational, false),
        RewriteRule::new("<", ">=", Relational, false),
        RewriteRule::new(">=", "<", Relational, false),
        RewriteRule::new("<=", ">", Relational, false),
        // Logical
        RewriteRule::new("and", "or", Logical, false),
        RewriteRule::new("or", "and", Logical, false),
        // Boolean literals
        RewriteRule::new("True", "False", Boolean, false),
        RewriteRule::new("False", "True", Boolean, false),
    ]
}

pub const RETURN_DESCRIPTION: &str = "Neutralize return value";
pub const MARKER_DESCRIPTION: &str = "Marker mutation (no rewritable tokens)";
pub const MARKER_SUFFIX: &str = "  # mutkernel: marker";

/// Replacement for the expression of a `return` statement.
pub fn neutralized_return_value(return_value: &str) -> &'static str {
    let trimmed = return_value.trim();

    if trimmed == "None" {
        "\"\""
    } else if trimmed == "True" {
        "False"
    } else if trimmed == "False" {
        "True"
    } else if is_string_literal(trimmed) {
        "\"\""
    } else if let Some(value) = numeric_literal(trimmed) {
        if value == 0.0 { "1" } else { "0" }
    } else {
        // Generic: return None for any other expression
        "None"
    }
}

fn is_string_literal(text: &str) -> bool {
    let body = text.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    text.len() - body.len() <= 2 && (body.starts_with('"') || body.starts_with('\''))
}

fn numeric_literal(text: &str) -> Option<f64> {
    let starts_numeric = text
        .trim_start_matches('-')
        .starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if !starts_numeric {
        return None;
    }
    text.replace('_', "").parse::<f64>().ok()
}
