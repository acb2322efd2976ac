/*!
 * Post-translation checks.
 *
 * After a job translated its strings, each (source, output) pair is checked:
 * - untranslated: no translation, or a long output identical to its source
 * - missing placeholders: the placeholder sets differ
 *
 * Input files that produced no output file are counted as missing.
 *
 * Only a bounded number of issues is kept for reporting; the counters cover
 * every string.
 */

use serde::{Deserialize, Serialize};

use super::placeholders;

/// Issues kept per job
pub const MAX_ISSUES: usize = 20;

/// Identical output shorter than this is accepted ("OK", "Email", ...)
const UNTRANSLATED_MIN_LEN: usize = 10;

/// What went wrong with a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Untranslated,
    MissingPlaceholders,
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub file: String,
    /// Position of the string within its file
    pub index: usize,
    pub source: String,
    pub output: String,
}

/// Per-job validation counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub success: usize,
    pub untranslated: usize,
    pub missing_placeholders: usize,
    /// Input files without an output file
    #[serde(default)]
    pub missing_files: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationStats {
    /// Check one string and update the counters
    pub fn check(&mut self, file: &str, index: usize, source: &str, output: &str, resolved: bool) {
        let kind = if !resolved || is_untranslated(source, output) {
            self.untranslated += 1;
            Some(IssueKind::Untranslated)
        } else if !placeholders::placeholders_match(source, output) {
            self.missing_placeholders += 1;
            Some(IssueKind::MissingPlaceholders)
        } else {
            self.success += 1;
            None
        };

        if let Some(kind) = kind {
            if self.issues.len() < MAX_ISSUES {
                self.issues.push(ValidationIssue {
                    kind,
                    file: file.to_string(),
                    index,
                    source: source.to_string(),
                    output: output.to_string(),
                });
            }
        }
    }

    /// Record an input file that produced no output
    pub fn file_missing(&mut self) {
        self.missing_files += 1;
    }

    /// Strings checked
    pub fn total(&self) -> usize {
        self.success + self.untranslated + self.missing_placeholders
    }
}

/// Output identical to a long source without placeholders was most likely not translated
fn is_untranslated(source: &str, output: &str) -> bool {
    source == output && source.chars().count() > UNTRANSLATED_MIN_LEN && !source.contains('{')
}
