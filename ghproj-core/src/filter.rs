//! Item filter expressions
//!
//! Syntax: whitespace-separated terms, all of which must match.
//! - `label:<name>`: item content carries the label (case-insensitive)
//! - `state:open` / `state:closed`: issue or pull request state
//!
//! Values containing spaces can be double-quoted: `label:"good first issue"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Open/closed state of an issue or pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    Open,
    Closed,
}

impl FromStr for ContentState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(ContentState::Open),
            // Merged pull requests count as closed
            "closed" | "merged" => Ok(ContentState::Closed),
            other => Err(Error::Validation(format!(
                "Unknown state '{}'. Expected open or closed",
                other
            ))),
        }
    }
}

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    labels: Vec<String>,
    state: Option<ContentState>,
}

impl FilterExpr {
    /// Parse a filter expression; at least one term is required
    pub fn parse(input: &str) -> Result<Self> {
        let mut labels = Vec::new();
        let mut state = None;

        for term in tokenize(input)? {
            let (key, value) = term.split_once(':').ok_or_else(|| {
                Error::Validation(format!(
                    "Invalid filter term '{}'. Expected key:value (label:<name> or state:<open|closed>)",
                    term
                ))
            })?;

            if value.is_empty() {
                return Err(Error::Validation(format!(
                    "Filter term '{}' has an empty value",
                    term
                )));
            }

            match key.to_ascii_lowercase().as_str() {
                "label" => labels.push(value.to_string()),
                "state" | "is" => {
                    let parsed = value.parse()?;
                    if state.is_some_and(|s| s != parsed) {
                        return Err(Error::Validation(
                            "Filter specifies conflicting states".to_string(),
                        ));
                    }
                    state = Some(parsed);
                }
                other => {
                    return Err(Error::Validation(format!(
                        "Unknown filter key '{}'. Supported keys: label, state",
                        other
                    )))
                }
            }
        }

        if labels.is_empty() && state.is_none() {
            return Err(Error::Validation("Filter expression is empty".to_string()));
        }

        Ok(Self { labels, state })
    }

    /// Labels that must all be present
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Required content state, if any
    pub fn state(&self) -> Option<ContentState> {
        self.state
    }

    /// Whether content with these labels and state satisfies the filter
    pub fn matches<S: AsRef<str>>(&self, labels: &[S], state: Option<ContentState>) -> bool {
        let labels_match = self.labels.iter().all(|wanted| {
            labels
                .iter()
                .any(|have| have.as_ref().eq_ignore_ascii_case(wanted))
        });
        let state_matches = match self.state {
            Some(wanted) => state == Some(wanted),
            None => true,
        };
        labels_match && state_matches
    }
}

impl FromStr for FilterExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<String> = self
            .labels
            .iter()
            .map(|l| {
                if l.contains(char::is_whitespace) {
                    format!("label:\"{}\"", l)
                } else {
                    format!("label:{}", l)
                }
            })
            .collect();
        if let Some(state) = self.state {
            terms.push(match state {
                ContentState::Open => "state:open".to_string(),
                ContentState::Closed => "state:closed".to_string(),
            });
        }
        f.write_str(&terms.join(" "))
    }
}

/// Split on whitespace, keeping double-quoted runs together
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Validation(format!(
            "Unterminated quote in filter '{}'",
            input
        )));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_and_state() {
        let filter = FilterExpr::parse("label:bug label:\"good first issue\" state:open").unwrap();
        assert_eq!(filter.labels(), &["bug", "good first issue"]);
        assert_eq!(filter.state(), Some(ContentState::Open));
        assert_eq!(
            filter.to_string(),
            "label:bug label:\"good first issue\" state:open"
        );
    }

    #[test]
    fn test_matches_all_labels_case_insensitive() {
        let filter = FilterExpr::parse("label:Bug label:ui").unwrap();
        assert!(filter.matches(&["bug", "UI", "p1"], Some(ContentState::Open)));
        assert!(!filter.matches(&["bug"], Some(ContentState::Open)));
        assert!(filter.matches(&["bug", "ui"], None));
    }

    #[test]
    fn test_state_filter() {
        let filter = FilterExpr::parse("state:closed").unwrap();
        assert!(filter.matches::<&str>(&[], Some(ContentState::Closed)));
        assert!(!filter.matches::<&str>(&[], Some(ContentState::Open)));
        assert!(!filter.matches::<&str>(&[], None));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(FilterExpr::parse("").is_err());
        assert!(FilterExpr::parse("bug").is_err());
        assert!(FilterExpr::parse("author:me").is_err());
        assert!(FilterExpr::parse("label:").is_err());
        assert!(FilterExpr::parse("state:pending").is_err());
        assert!(FilterExpr::parse("state:open state:closed").is_err());
        assert!(FilterExpr::parse("label:\"unterminated").is_err());
    }
}
