//! Core types, configuration, validation, and error handling for prscribe.
//!
//! This crate provides the shared foundation used by the review pipeline:
//! - [`ReviewError`] and [`GatewayError`]: the error taxonomy, using `thiserror`
//! - [`PrscribeConfig`]: configuration loaded from `.prscribe.toml`
//! - [`validate`]: input checks run before any network call
//! - Shared types: [`ReviewRequest`], [`ReviewOutcome`], [`PullRequestDiff`],
//!   [`GeneratedReview`], [`TemplateKind`], [`OutputFormat`]

mod config;
mod error;
mod report;
mod types;
pub mod validate;

pub use config::{GitHubConfig, InferenceConfig, PrscribeConfig, ReviewConfig};
pub use error::{
    ErrorCategory, GatewayError, GatewayErrorKind, ReviewError, Upstream, ValidationError,
    ValidationReason,
};
pub use report::{ErrorReport, FieldError};
pub use types::{
    GeneratedReview, OutcomeStatus, OutputFormat, PrNumber, PublishPolicy, PullRequestDiff,
    RepositoryId, ReviewOutcome, ReviewRequest, TemplateKind,
};

/// A convenience `Result` type for prscribe operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
