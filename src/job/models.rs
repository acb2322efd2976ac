/*!
 * Job models.
 *
 * A `Job` is both the working state of a running job and the snapshot handed
 * out to observers: the job task mutates its own copy and publishes clones.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::translation::{LanguagePair, ValidationStats};

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Submitted, waiting for a free slot
    Pending,
    /// Translating
    Running,
    /// All files processed
    Completed,
    /// Fatal error, no usable output
    Failed,
    /// Stopped on request, partial output kept
    Cancelled,
}

impl JobStatus {
    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running | Self::Failed | Self::Cancelled) => true,
            (Self::Running, Self::Completed | Self::Failed | Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// One input file of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFile {
    /// Path relative to the job root, also used for the output
    pub path: String,
    /// Raw file contents
    pub contents: Vec<u8>,
}

impl JobFile {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Parameters for submitting a job
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    /// Files in processing order
    pub files: Vec<JobFile>,
    /// Language pair, None uses the orchestrator default
    pub pair: Option<LanguagePair>,
}

impl JobRequest {
    pub fn new(files: Vec<JobFile>) -> Self {
        Self { files, pair: None }
    }

    /// Translate with a specific language pair
    pub fn with_pair(mut self, pair: LanguagePair) -> Self {
        self.pair = Some(pair);
        self
    }
}

/// Job state and progress snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub source_language: String,
    pub target_language: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub files_done: usize,
    pub total_strings: usize,
    /// Strings processed so far, translated or not
    pub translated_strings: usize,
    pub current_file: Option<String>,
    /// 0..=100
    pub progress: u8,
    pub errors: Vec<String>,
    pub validation: Option<ValidationStats>,
}

impl Job {
    /// Create a pending job
    pub fn new(id: impl Into<String>, total_files: usize, pair: &LanguagePair) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            total_files,
            files_done: 0,
            total_strings: 0,
            translated_strings: 0,
            current_file: None,
            progress: 0,
            errors: Vec::new(),
            validation: None,
        }
    }

    /// Move to `next`; illegal transitions are ignored and return false
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        match next {
            JobStatus::Running => self.started_at = Some(Utc::now()),
            s if s.is_terminal() => {
                self.finished_at = Some(Utc::now());
                self.current_file = None;
            }
            _ => {}
        }
        true
    }

    /// Recompute `progress` from the string counters
    pub fn update_progress(&mut self) {
        self.progress = if self.total_strings == 0 {
            0
        } else {
            (self.translated_strings * 100 / self.total_strings).min(100) as u8
        };
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Run time so far, or total run time once finished
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Utc::now) - started)
    }
}
