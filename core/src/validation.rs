//! Outcomes of submitting datasets to FMR's validation service.
//!
//! # Design
//! A validation run either passes or fails with a reason. The reason carries
//! a `FailureKind` so callers can tell DSD non-compliance apart from a dead
//! registry or an expired session without inspecting message text. The
//! legacy `{"ValidationReport": ...}` payload is still available through
//! `ValidationOutcome::error_payload` for callers that persist it.

use serde::Serialize;
use serde_json::{json, Value};

pub const MSG_LOAD_REJECTED: &str = "Error with load endpoint";
pub const MSG_UNREACHABLE: &str = "Cannot connect to FMR instance";
pub const MSG_SESSION_TIMED_OUT: &str = "Session timed out";
pub const MSG_UNFINISHED: &str = "Validation did not complete";

/// Why a validation run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The dataset does not conform to its DSD.
    Invalid,
    /// The load endpoint answered with a non-200 status.
    LoadRejected,
    /// No usable response: transport error or a non-JSON body.
    Unreachable,
    /// The load-status endpoint reported a session error.
    SessionTimedOut,
    /// The status never reached a final state within the poll budget.
    Unfinished,
    /// The dataset file could not be read locally.
    UnreadableFile,
}

/// The error detail attached to a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValidationReport {
    /// One entry per dataset in the load, holding that dataset's errors.
    Datasets(Vec<Value>),
    /// A single diagnostic message.
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub report: ValidationReport,
}

impl ValidationFailure {
    pub fn message(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            report: ValidationReport::Message(message.into()),
        }
    }
}

/// Result of validating one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Passed,
    Failed(ValidationFailure),
}

impl ValidationOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed(ValidationFailure::message(kind, message))
    }

    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Passed => None,
            Self::Failed(failure) => Some(failure.kind),
        }
    }

    /// `{}` when passed, `{"ValidationReport": <report>}` otherwise.
    pub fn error_payload(&self) -> Value {
        match self {
            Self::Passed => json!({}),
            Self::Failed(failure) => json!({ "ValidationReport": failure.report }),
        }
    }
}

/// Result of a batch validation request.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchValidation {
    /// Validation was not requested.
    Skipped,
    /// Validation ran; one `(file name, outcome)` entry per requested file,
    /// in request order. A name given twice is uploaded and reported twice.
    Ran(Vec<(String, ValidationOutcome)>),
}

impl BatchValidation {
    pub fn was_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// True when validation ran and every file passed. A skipped batch is
    /// not considered passed.
    pub fn all_passed(&self) -> bool {
        match self {
            Self::Skipped => false,
            Self::Ran(results) => results.iter().all(|(_, outcome)| outcome.passed()),
        }
    }

    pub fn outcomes(&self) -> Option<&[(String, ValidationOutcome)]> {
        match self {
            Self::Skipped => None,
            Self::Ran(results) => Some(results.as_slice()),
        }
    }

    /// First outcome recorded for `file_name`.
    pub fn outcome(&self, file_name: &str) -> Option<&ValidationOutcome> {
        self.outcomes()?
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, outcome)| outcome)
    }
}

/// State of a load as reported by one status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadProgress {
    Pending,
    Finished(ValidationOutcome),
}

/// Classify a parsed load-status body.
///
/// A body carrying `Errors` is final once `Errors` is truthy or the status
/// is `Complete` (or absent). A body carrying only `Error` means the session
/// is gone. Anything else is still being processed.
pub fn classify_load_status(status: &Value) -> LoadProgress {
    if let Some(errors) = status.get("Errors") {
        let state = status.get("Status").and_then(Value::as_str);
        if is_truthy(errors) {
            return LoadProgress::Finished(ValidationOutcome::Failed(ValidationFailure {
                kind: FailureKind::Invalid,
                report: ValidationReport::Datasets(dataset_errors(status)),
            }));
        }
        if matches!(state, None | Some("Complete")) {
            return LoadProgress::Finished(ValidationOutcome::Passed);
        }
        return LoadProgress::Pending;
    }
    if status.get("Error").is_some() {
        return LoadProgress::Finished(ValidationOutcome::failed(
            FailureKind::SessionTimedOut,
            MSG_SESSION_TIMED_OUT,
        ));
    }
    LoadProgress::Pending
}

fn dataset_errors(status: &Value) -> Vec<Value> {
    status
        .get("Datasets")
        .and_then(Value::as_array)
        .map(|datasets| {
            datasets
                .iter()
                .map(|dataset| dataset.pointer("/ValidationReport/0/Errors").cloned().unwrap_or(Value::Null))
                .collect()
        })
        .unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
