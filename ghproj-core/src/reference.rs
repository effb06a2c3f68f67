//! Parsing of human-entered project and item references
//!
//! Supported forms:
//! - projects: `owner/number`, `https://github.com/orgs/owner/projects/number`,
//!   `https://github.com/users/owner/projects/number`
//! - items: `owner/repo#number`, `https://github.com/owner/repo/issues/number`,
//!   `https://github.com/owner/repo/pull/number`
//!
//! A bare `#number` is rejected: repository context is never inferred.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A project identified by owner login and project number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    /// User or organization login
    pub owner: String,
    /// Project number within the owner
    pub number: u64,
}

/// An issue or pull request identified by repository and number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Issue or pull request number
    pub number: u64,
}

impl ItemRef {
    /// `owner/repo` slug of the repository
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.number)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl FromStr for ProjectRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_project_ref(s)
    }
}

impl FromStr for ItemRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_item_ref(s)
    }
}

/// Parse a project reference
pub fn parse_project_ref(input: &str) -> Result<ProjectRef> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Parse(
            "Empty project reference. Expected owner/number".to_string(),
        ));
    }

    if is_url(input) {
        let segments = url_segments(input)?;
        return match segments.as_slice() {
            [kind, owner, projects, number, ..]
                if (kind == "orgs" || kind == "users") && projects == "projects" =>
            {
                Ok(ProjectRef {
                    owner: owner.clone(),
                    number: parse_number(number, "project")?,
                })
            }
            _ => Err(Error::Parse(format!(
                "Unrecognized project URL: {}. Expected https://github.com/orgs/<owner>/projects/<number>",
                input
            ))),
        };
    }

    // Owners never contain '/', so the last separator is the only one that matters
    let (owner, number) = input.rsplit_once('/').ok_or_else(|| {
        Error::Parse(format!(
            "Invalid project reference: {}. Expected owner/number",
            input
        ))
    })?;

    if owner.is_empty() {
        return Err(Error::Parse(format!(
            "Invalid project reference: {}. Owner is empty",
            input
        )));
    }

    Ok(ProjectRef {
        owner: owner.to_string(),
        number: parse_number(number, "project")?,
    })
}

/// Parse an issue or pull request reference
pub fn parse_item_ref(input: &str) -> Result<ItemRef> {
    let input = input.trim();

    if is_url(input) {
        let segments = url_segments(input)?;
        return match segments.as_slice() {
            [owner, repo, kind, number, ..] if kind == "issues" || kind == "pull" => Ok(ItemRef {
                owner: owner.clone(),
                repo: repo.clone(),
                number: parse_number(number, "item")?,
            }),
            _ => Err(Error::Parse(format!(
                "Unrecognized issue URL: {}. Expected https://github.com/<owner>/<repo>/issues/<number>",
                input
            ))),
        };
    }

    if input.starts_with('#') {
        return Err(Error::Parse(format!(
            "'{}' has no repository context. Use owner/repo{}",
            input, input
        )));
    }

    let (repo_part, number) = input.split_once('#').ok_or_else(|| {
        Error::Parse(format!(
            "Invalid item reference: {}. Expected owner/repo#number",
            input
        ))
    })?;

    match repo_part.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok(ItemRef {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number: parse_number(number, "item")?,
            })
        }
        _ => Err(Error::Parse(format!(
            "Invalid repository in item reference: {}. Expected owner/repo#number",
            input
        ))),
    }
}

/// Parse a positive number, echoing the literal back on failure
pub(crate) fn parse_number(literal: &str, what: &str) -> Result<u64> {
    let trimmed = literal.trim();
    match trimmed.parse::<u64>() {
        Ok(0) => Err(Error::Parse(format!(
            "Invalid {} number '{}': must be positive",
            what, trimmed
        ))),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::Parse(format!(
            "Invalid {} number '{}': not an integer",
            what, trimmed
        ))),
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("https://") || input.starts_with("http://")
}

fn url_segments(input: &str) -> Result<Vec<String>> {
    let url = url::Url::parse(input).map_err(|e| Error::Parse(format!("{}: {}", input, e)))?;
    Ok(url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_shorthand() {
        let r = parse_project_ref("octo-org/5").unwrap();
        assert_eq!(r.owner, "octo-org");
        assert_eq!(r.number, 5);
        assert_eq!(r.to_string(), "octo-org/5");
    }

    #[test]
    fn test_parse_project_splits_on_last_slash() {
        let r = parse_project_ref("a/b/12").unwrap();
        assert_eq!(r.owner, "a/b");
        assert_eq!(r.number, 12);
    }

    #[test]
    fn test_parse_project_urls() {
        let r = parse_project_ref("https://github.com/orgs/octo-org/projects/7").unwrap();
        assert_eq!((r.owner.as_str(), r.number), ("octo-org", 7));

        let r = parse_project_ref("https://github.com/users/octocat/projects/3/views/1").unwrap();
        assert_eq!((r.owner.as_str(), r.number), ("octocat", 3));
    }

    #[test]
    fn test_parse_project_bad_number_echoes_literal() {
        let err = parse_project_ref("octocat/abc").unwrap_err();
        assert!(err.to_string().contains("'abc'"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_project_missing_parts() {
        assert!(parse_project_ref("octocat").is_err());
        assert!(parse_project_ref("/5").is_err());
        assert!(parse_project_ref("").is_err());
        assert!(parse_project_ref("octocat/0").is_err());
    }

    #[test]
    fn test_parse_item_shorthand() {
        let r = parse_item_ref("octocat/hello-world#42").unwrap();
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "hello-world");
        assert_eq!(r.number, 42);
        assert_eq!(r.repo_slug(), "octocat/hello-world");
    }

    #[test]
    fn test_parse_item_urls() {
        let r = parse_item_ref("https://github.com/octocat/hello-world/issues/9").unwrap();
        assert_eq!(r.to_string(), "octocat/hello-world#9");

        let r = parse_item_ref("https://github.com/octocat/hello-world/pull/10").unwrap();
        assert_eq!(r.number, 10);

        assert!(parse_item_ref("https://github.com/octocat/hello-world/discussions/1").is_err());
    }

    #[test]
    fn test_bare_hash_number_is_rejected() {
        let err = parse_item_ref("#12").unwrap_err();
        assert!(err.to_string().contains("no repository context"));
    }

    #[test]
    fn test_parse_item_bad_number_echoes_literal() {
        let err = parse_item_ref("octocat/repo#12x").unwrap_err();
        assert!(err.to_string().contains("'12x'"));
    }

    #[test]
    fn test_parse_item_invalid_repo() {
        assert!(parse_item_ref("octocat#1").is_err());
        assert!(parse_item_ref("a/b/c#1").is_err());
        assert!(parse_item_ref("/repo#1").is_err());
    }

    #[test]
    fn test_from_str() {
        let p: ProjectRef = "octocat/1".parse().unwrap();
        assert_eq!(p.number, 1);
        let i: ItemRef = "octocat/r#2".parse().unwrap();
        assert_eq!(i.number, 2);
    }
}
