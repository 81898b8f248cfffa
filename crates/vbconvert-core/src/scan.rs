//! Best-effort text scans over VB.NET source.
//!
//! These are regex heuristics, not a parser: false positives and misses are
//! expected, and every result carries `Confidence::Heuristic` so callers do
//! not mistake it for a grammar-backed answer.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult<T> {
    pub matches: Vec<T>,
    pub confidence: Confidence,
}

impl<T> ScanResult<T> {
    fn heuristic(matches: Vec<T>) -> Self {
        Self {
            matches,
            confidence: Confidence::Heuristic,
        }
    }
}

/// Which source shape produced a child-form match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildFormPattern {
    New,
    Show,
    ShowDialog,
    DimAs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildFormRef {
    pub form: String,
    pub pattern: ChildFormPattern,
    /// 1-based line of the first occurrence.
    pub line: usize,
}

static CHILD_FORM_RES: OnceLock<Vec<(ChildFormPattern, Regex)>> = OnceLock::new();

fn child_form_res() -> &'static [(ChildFormPattern, Regex)] {
    CHILD_FORM_RES.get_or_init(|| {
        vec![
            (
                ChildFormPattern::New,
                Regex::new(r"(?i)\bNew\s+(frm\w+)\b").unwrap(),
            ),
            (
                ChildFormPattern::ShowDialog,
                Regex::new(r"(?i)\b(frm\w+)\.ShowDialog\s*\(").unwrap(),
            ),
            (
                ChildFormPattern::Show,
                Regex::new(r"(?i)\b(frm\w+)\.Show\s*\(").unwrap(),
            ),
            (
                ChildFormPattern::DimAs,
                Regex::new(r"(?i)\bDim\s+\w+\s+As\s+(frm\w+)\s*=").unwrap(),
            ),
        ]
    })
}

/// Forms opened from `source`, deduplicated by name (first occurrence wins).
/// `own_form` is excluded; whole-line `'` comments are ignored.
pub fn detect_child_forms(source: &str, own_form: Option<&str>) -> ScanResult<ChildFormRef> {
    let mut seen: HashSet<String> = HashSet::new();
    if let Some(own) = own_form {
        seen.insert(own.to_ascii_lowercase());
    }

    let mut found = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        if line.trim_start().starts_with('\'') {
            continue;
        }
        for (pattern, re) in child_form_res() {
            for cap in re.captures_iter(line) {
                let form = &cap[1];
                if seen.insert(form.to_ascii_lowercase()) {
                    found.push(ChildFormRef {
                        form: form.to_string(),
                        pattern: *pattern,
                        line: idx + 1,
                    });
                }
            }
        }
    }
    ScanResult::heuristic(found)
}

/// Read `path` and scan it. A missing file is an empty result.
pub fn detect_child_forms_in_file(
    path: &Path,
    own_form: Option<&str>,
) -> crate::Result<ScanResult<ChildFormRef>> {
    let source = crate::io::read_optional(path)?.unwrap_or_default();
    Ok(detect_child_forms(&source, own_form))
}
