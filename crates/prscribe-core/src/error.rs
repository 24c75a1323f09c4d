use std::fmt;

use serde::Serialize;

/// The external service a gateway talks to.
///
/// # Examples
///
/// ```
/// use prscribe_core::Upstream;
///
/// let upstream = Upstream::Inference { model: "openchat:latest".into() };
/// assert_eq!(upstream.to_string(), "inference backend (model openchat:latest)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    /// The source-control host (GitHub API).
    SourceControl,
    /// The text-generation backend, tagged with the model that was requested.
    Inference {
        /// Model name sent with the request.
        model: String,
    },
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::SourceControl => write!(f, "GitHub"),
            Upstream::Inference { model } => write!(f, "inference backend (model {model})"),
        }
    }
}

/// First-level classification of a failed outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatewayErrorKind {
    /// Connection refused, timeout, or an interrupted body.
    Network,
    /// The upstream answered with a status of 300 or above.
    UpstreamStatus,
    /// The operation needs a credential that is not configured.
    Auth,
    /// The gateway could not classify the failure.
    Unclassified,
}

/// A failure raised by one of the outbound gateways.
///
/// Every variant records which upstream was called and what the gateway was
/// doing, so the detail survives when the orchestrator re-wraps it.
///
/// # Examples
///
/// ```
/// use prscribe_core::{GatewayError, GatewayErrorKind, Upstream};
///
/// let err = GatewayError::UpstreamStatus {
///     upstream: Upstream::SourceControl,
///     operation: "fetching diff".into(),
///     status: 404,
///     message: "Not Found".into(),
/// };
/// assert_eq!(err.kind(), GatewayErrorKind::UpstreamStatus);
/// assert_eq!(err.status(), Some(404));
/// assert_eq!(err.upstream_message(), Some("Not Found"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level failure.
    #[error("network error talking to {upstream} while {operation}: {message}")]
    Network {
        /// Service being called.
        upstream: Upstream,
        /// What the gateway was doing.
        operation: String,
        /// Transport error detail.
        message: String,
    },

    /// The upstream returned a non-success status.
    #[error("{upstream} returned status {status} while {operation}: {message}")]
    UpstreamStatus {
        /// Service being called.
        upstream: Upstream,
        /// What the gateway was doing.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A credential is required but not configured. No request was sent.
    #[error("a {upstream} token is required for {operation}")]
    Auth {
        /// Service that needs the credential.
        upstream: Upstream,
        /// Operation that was refused.
        operation: String,
    },

    /// Any failure the gateway could not place in the categories above.
    #[error("unexpected failure talking to {upstream} while {operation}: {message}")]
    Unclassified {
        /// Service being called.
        upstream: Upstream,
        /// What the gateway was doing.
        operation: String,
        /// Error detail.
        message: String,
    },
}

impl GatewayError {
    /// Classification of this failure.
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::Network { .. } => GatewayErrorKind::Network,
            GatewayError::UpstreamStatus { .. } => GatewayErrorKind::UpstreamStatus,
            GatewayError::Auth { .. } => GatewayErrorKind::Auth,
            GatewayError::Unclassified { .. } => GatewayErrorKind::Unclassified,
        }
    }

    /// The service that failed.
    pub fn upstream(&self) -> &Upstream {
        match self {
            GatewayError::Network { upstream, .. }
            | GatewayError::UpstreamStatus { upstream, .. }
            | GatewayError::Auth { upstream, .. }
            | GatewayError::Unclassified { upstream, .. } => upstream,
        }
    }

    /// HTTP status returned by the upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message the upstream put in its error response.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            GatewayError::UpstreamStatus { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Model name when the failing call went to the inference backend.
    pub fn model(&self) -> Option<&str> {
        match self.upstream() {
            Upstream::Inference { model } => Some(model),
            Upstream::SourceControl => None,
        }
    }
}

/// Why an input value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationReason {
    /// The value was blank.
    Empty,
    /// The value does not have the required shape.
    Format,
    /// The number is below the allowed minimum.
    TooSmall,
    /// The number is above the allowed maximum.
    TooLarge,
}

/// Rejected user input, naming the offending field and value.
///
/// # Examples
///
/// ```
/// use prscribe_core::validate::validate_pr_number;
///
/// let err = validate_pr_number(0).unwrap_err();
/// assert_eq!(err.field, "prNumber");
/// assert_eq!(err.value, "0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (field: {field}, value: {value})")]
pub struct ValidationError {
    /// Field name as the caller spelled it.
    pub field: &'static str,
    /// The rejected value, rendered as text.
    pub value: String,
    /// Machine-readable rejection reason.
    pub reason: ValidationReason,
    /// Human-readable explanation.
    pub message: String,
}

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// Bad input shape; never reaches the network.
    Validation,
    /// Missing or unknown template, missing credential, bad settings.
    Configuration,
    /// An upstream call failed.
    Gateway,
    /// The calls succeeded but produced nothing usable, or publishing failed.
    BusinessLogic,
}

/// Errors surfaced by the review pipeline and its configuration layer.
///
/// Library crates return this type directly; the binary propagates it into
/// `miette::Result` at the boundary.
///
/// # Examples
///
/// ```
/// use prscribe_core::{ErrorCategory, ReviewError};
///
/// let err = ReviewError::Configuration("unknown template 'x.txt'".into());
/// assert_eq!(err.category(), ErrorCategory::Configuration);
/// assert_eq!(err.status_code(), 500);
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ReviewError {
    /// Input failed validation.
    #[error("validation error: {0}")]
    #[diagnostic(code(prscribe::validation))]
    Validation(#[from] ValidationError),

    /// Deployment or settings problem.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(prscribe::configuration),
        help("check .prscribe.toml and the PRSCRIBE_* / GITHUB_TOKEN environment variables")
    )]
    Configuration(String),

    /// A gateway call failed.
    #[error("{source} (repository: {repository}, PR: #{pr_number})")]
    #[diagnostic(code(prscribe::gateway))]
    Gateway {
        /// Repository under review.
        repository: String,
        /// Pull request under review.
        pr_number: u32,
        /// The gateway's classified failure.
        source: GatewayError,
    },

    /// The pull request diff was empty.
    #[error("No diff content found for pull request (repository: {repository}, PR: #{pr_number})")]
    #[diagnostic(code(prscribe::empty_diff))]
    NoDiffContent {
        /// Repository under review.
        repository: String,
        /// Pull request under review.
        pr_number: u32,
    },

    /// The inference backend answered but produced no text.
    #[error("AI service returned empty review (repository: {repository}, PR: #{pr_number})")]
    #[diagnostic(code(prscribe::empty_review))]
    EmptyReview {
        /// Repository under review.
        repository: String,
        /// Pull request under review.
        pr_number: u32,
    },

    /// The review was generated but could not be posted, under the strict
    /// publish policy. The generated text is kept.
    #[error("review generated, but posting it failed: {source} (repository: {repository}, PR: #{pr_number})")]
    #[diagnostic(code(prscribe::publish_failed))]
    PublishFailed {
        /// Repository under review.
        repository: String,
        /// Pull request under review.
        pr_number: u32,
        /// The generated review that was not posted.
        review: String,
        /// Why posting failed.
        source: GatewayError,
    },

    /// A failure nothing downstream could classify.
    #[error("Failed to generate review: {message} (repository: {repository}, PR: #{pr_number})")]
    #[diagnostic(code(prscribe::orchestration))]
    Orchestration {
        /// Repository under review.
        repository: String,
        /// Pull request under review.
        pr_number: u32,
        /// Underlying failure.
        message: String,
    },

    /// Filesystem I/O failure while loading configuration or templates.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ReviewError {
    /// Which of the four caller-facing categories this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReviewError::Validation(_) => ErrorCategory::Validation,
            ReviewError::Configuration(_) | ReviewError::Io(_) | ReviewError::Toml(_) => {
                ErrorCategory::Configuration
            }
            ReviewError::Gateway { source, .. } => match source.kind() {
                GatewayErrorKind::Auth => ErrorCategory::Configuration,
                _ => ErrorCategory::Gateway,
            },
            ReviewError::NoDiffContent { .. }
            | ReviewError::EmptyReview { .. }
            | ReviewError::PublishFailed { .. }
            | ReviewError::Orchestration { .. } => ErrorCategory::BusinessLogic,
        }
    }

    /// HTTP-style status a request/response boundary should answer with.
    ///
    /// # Examples
    ///
    /// ```
    /// use prscribe_core::{GatewayError, ReviewError, Upstream};
    ///
    /// let err = ReviewError::Gateway {
    ///     repository: "octocat/Hello-World".into(),
    ///     pr_number: 1,
    ///     source: GatewayError::UpstreamStatus {
    ///         upstream: Upstream::SourceControl,
    ///         operation: "fetching diff".into(),
    ///         status: 503,
    ///         message: "unavailable".into(),
    ///     },
    /// };
    /// assert_eq!(err.status_code(), 502);
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            ReviewError::Validation(_) => 400,
            ReviewError::Gateway { source, .. } => match source {
                GatewayError::UpstreamStatus { status, .. } => upstream_status_code(*status),
                GatewayError::Network { .. } => 502,
                GatewayError::Auth { .. } | GatewayError::Unclassified { .. } => 500,
            },
            _ => 500,
        }
    }

    /// The generated review text, when the error happened after generation.
    pub fn review_text(&self) -> Option<&str> {
        match self {
            ReviewError::PublishFailed { review, .. } => Some(review),
            _ => None,
        }
    }
}

/// Map an upstream HTTP status onto the status reported to our caller.
fn upstream_status_code(status: u16) -> u16 {
    match status {
        400 | 401 | 403 | 404 | 422 | 429 => status,
        500 | 502 | 503 | 504 => 502,
        _ => 500,
    }
}
