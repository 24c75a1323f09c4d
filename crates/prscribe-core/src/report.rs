use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ErrorCategory, ReviewError, Upstream};

/// Serializable error body for callers that render failures as data.
///
/// # Examples
///
/// ```
/// use prscribe_core::{ErrorReport, ReviewError};
///
/// let report = ErrorReport::from_error(&ReviewError::Configuration("no template".into()));
/// assert_eq!(report.status, 500);
/// assert_eq!(report.error, "Configuration Error");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Short error title.
    pub error: String,
    /// Full human-readable message.
    pub message: String,
    /// HTTP-style status code.
    pub status: u16,
    /// Caller-facing category.
    pub category: ErrorCategory,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Per-field detail for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Vec<FieldError>>,
    /// Generated review that survived a publish failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Field name.
    pub field: String,
    /// Value that was rejected.
    pub rejected_value: String,
    /// Why it was rejected.
    pub message: String,
}

impl ErrorReport {
    /// Build a report for `err`, stamped with the current time.
    pub fn from_error(err: &ReviewError) -> Self {
        let field_errors = match err {
            ReviewError::Validation(v) => Some(vec![FieldError {
                field: v.field.to_string(),
                rejected_value: v.value.clone(),
                message: v.message.clone(),
            }]),
            _ => None,
        };

        Self {
            error: title(err).to_string(),
            message: err.to_string(),
            status: err.status_code(),
            category: err.category(),
            timestamp: Utc::now(),
            field_errors,
            review: err.review_text().map(str::to_string),
        }
    }
}

fn title(err: &ReviewError) -> &'static str {
    match (err.category(), err) {
        (ErrorCategory::Validation, _) => "Validation Error",
        (ErrorCategory::Configuration, _) => "Configuration Error",
        (ErrorCategory::Gateway, ReviewError::Gateway { source, .. }) => match source.upstream() {
            Upstream::SourceControl => "GitHub API Error",
            Upstream::Inference { .. } => "AI Service Error",
        },
        _ => "Review Generation Error",
    }
}
