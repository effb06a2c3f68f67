//! Bulk mutation targets and results
//!
//! A [`BulkTarget`] is assembled fresh for every invocation from any number
//! of sources (numeric ranges, filter matches, file lists). Sources are
//! unioned and deduplicated, keeping first-seen order.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::reference::{parse_item_ref, parse_number};
use crate::{Error, Result};

/// Largest range accepted in one `--items` expression
const MAX_RANGE_LEN: u64 = 10_000;

/// Identifies the content behind a project item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TargetId {
    /// `owner/repo`, when known
    pub repo: Option<String>,
    /// Issue or pull request number
    pub number: u64,
}

impl TargetId {
    /// An identifier not tied to a repository
    pub fn number(number: u64) -> Self {
        Self { repo: None, number }
    }

    /// An identifier qualified with `owner/repo`
    pub fn qualified(repo: impl Into<String>, number: u64) -> Self {
        Self {
            repo: Some(repo.into()),
            number,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repo {
            Some(repo) => write!(f, "{}#{}", repo, self.number),
            None => write!(f, "#{}", self.number),
        }
    }
}

/// Expand `start-end` (inclusive) or a single `n` into identifiers
///
/// `start > end` is an error rather than an empty range.
pub fn parse_number_range(input: &str) -> Result<Vec<TargetId>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("Empty item range".to_string()));
    }

    let (start, end) = match input.split_once('-') {
        Some((start, end)) => (parse_number(start, "item")?, parse_number(end, "item")?),
        None => {
            let n = parse_number(input, "item")?;
            (n, n)
        }
    };

    if start > end {
        return Err(Error::Validation(format!(
            "Invalid item range '{}': start {} is greater than end {}",
            input, start, end
        )));
    }
    if end - start >= MAX_RANGE_LEN {
        return Err(Error::Validation(format!(
            "Item range '{}' is too large (max {} items)",
            input, MAX_RANGE_LEN
        )));
    }

    Ok((start..=end).map(TargetId::number).collect())
}

/// Parse a comma-separated list of ranges, e.g. `1-3,7,10-12`
pub fn parse_item_ranges(input: &str) -> Result<Vec<TargetId>> {
    let mut ids = Vec::new();
    for part in input.split(',') {
        ids.extend(parse_number_range(part)?);
    }
    Ok(ids)
}

/// Parse an item list file
///
/// One entry per line: a number, `owner/repo#number`, or an issue/PR URL.
/// Blank lines and lines starting with `//` or `;` are ignored.
pub fn parse_item_list(contents: &str) -> Result<Vec<TargetId>> {
    let mut ids = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with(';') {
            continue;
        }

        let id = if line.bytes().all(|b| b.is_ascii_digit()) {
            TargetId::number(parse_number(line, "item")?)
        } else {
            let item = parse_item_ref(line)
                .map_err(|e| Error::Validation(format!("line {}: {}", line_no + 1, e)))?;
            TargetId::qualified(item.repo_slug(), item.number)
        };
        ids.push(id);
    }

    Ok(ids)
}

/// Read and parse an item list file
pub fn read_item_list(path: &Path) -> Result<Vec<TargetId>> {
    let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse_item_list(&contents)
}

/// Deduplicated, order-preserving set of identifiers to mutate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkTarget {
    ids: Vec<TargetId>,
    seen: HashSet<TargetId>,
}

impl BulkTarget {
    /// Create an empty target
    pub fn new() -> Self {
        Self::default()
    }

    /// Union another source into the target, skipping identifiers already present
    pub fn extend(&mut self, source: impl IntoIterator<Item = TargetId>) {
        for id in source {
            if self.seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
    }

    /// Build a target from several sources
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = TargetId>,
    {
        let mut target = Self::new();
        for source in sources {
            target.extend(source);
        }
        target
    }

    /// Identifiers in first-seen order
    pub fn ids(&self) -> &[TargetId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Outcome of a bulk mutation run
///
/// Only [`BulkResult::record_success`] and [`BulkResult::record_failure`]
/// change the counters, which keeps `succeeded + failed == attempted` and
/// `errors.len() == failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    attempted: usize,
    succeeded: usize,
    failed: usize,
    errors: Vec<String>,
    cancelled: bool,
}

impl BulkResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successful mutation
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    /// Count one failed mutation, naming the item and cause
    pub fn record_failure(&mut self, id: &TargetId, cause: impl fmt::Display) {
        self.attempted += 1;
        self.failed += 1;
        self.errors.push(format!("item {}: {}", id, cause));
    }

    /// Mark the run as stopped early by cancellation
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Per-item error messages in target order
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether every attempted mutation succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
