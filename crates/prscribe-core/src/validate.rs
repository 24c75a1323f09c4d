//! Syntactic checks on user input. Pure functions; nothing here touches the
//! network or the filesystem.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ValidationError, ValidationReason};
use crate::types::{PrNumber, RepositoryId};

/// Smallest accepted pull request number.
pub const MIN_PR_NUMBER: i64 = 1;
/// Largest accepted pull request number.
pub const MAX_PR_NUMBER: i64 = 999_999;

const TEMPLATE_EXTENSION: &str = ".txt";

// Exactly one slash; each side starts and ends with an alphanumeric.
static REPOSITORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?/[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$")
        .expect("repository pattern is valid")
});

/// Validate an `owner/repo` identifier.
///
/// # Errors
///
/// Returns a [`ValidationError`] for field `repository` when the value is
/// blank or does not have the `owner/repo` shape.
///
/// # Examples
///
/// ```
/// use prscribe_core::validate::validate_repository;
///
/// assert!(validate_repository("octocat/Hello-World").is_ok());
/// assert!(validate_repository("not-a-repo").is_err());
/// assert!(validate_repository("-owner/repo").is_err());
/// ```
pub fn validate_repository(repository: &str) -> Result<RepositoryId, ValidationError> {
    if repository.trim().is_empty() {
        return Err(ValidationError {
            field: "repository",
            value: repository.to_string(),
            reason: ValidationReason::Empty,
            message: "Repository cannot be empty".into(),
        });
    }

    if !REPOSITORY_REGEX.is_match(repository) {
        return Err(ValidationError {
            field: "repository",
            value: repository.to_string(),
            reason: ValidationReason::Format,
            message: format!(
                "Repository '{repository}' must be in format 'owner/repo' (e.g., 'octocat/Hello-World')"
            ),
        });
    }

    let (owner, name) = repository
        .split_once('/')
        .ok_or_else(|| ValidationError {
            field: "repository",
            value: repository.to_string(),
            reason: ValidationReason::Format,
            message: "Repository must contain a '/'".into(),
        })?;
    Ok(RepositoryId::new(owner, name))
}

/// Validate a pull request number against `1..=999999`.
///
/// Numbers below and above the range fail with different messages and
/// reasons.
///
/// # Errors
///
/// Returns a [`ValidationError`] for field `prNumber`.
///
/// # Examples
///
/// ```
/// use prscribe_core::ValidationReason;
/// use prscribe_core::validate::validate_pr_number;
///
/// assert_eq!(validate_pr_number(42).unwrap().get(), 42);
/// assert_eq!(validate_pr_number(0).unwrap_err().reason, ValidationReason::TooSmall);
/// assert_eq!(validate_pr_number(1_000_000).unwrap_err().reason, ValidationReason::TooLarge);
/// ```
pub fn validate_pr_number(pr_number: i64) -> Result<PrNumber, ValidationError> {
    if pr_number < MIN_PR_NUMBER {
        return Err(ValidationError {
            field: "prNumber",
            value: pr_number.to_string(),
            reason: ValidationReason::TooSmall,
            message: format!("Pull request number {pr_number} must be at least {MIN_PR_NUMBER}"),
        });
    }
    if pr_number > MAX_PR_NUMBER {
        return Err(ValidationError {
            field: "prNumber",
            value: pr_number.to_string(),
            reason: ValidationReason::TooLarge,
            message: format!(
                "Pull request number {pr_number} exceeds maximum allowed value of {MAX_PR_NUMBER}"
            ),
        });
    }

    let n = u32::try_from(pr_number).map_err(|_| ValidationError {
        field: "prNumber",
        value: pr_number.to_string(),
        reason: ValidationReason::TooLarge,
        message: format!(
            "Pull request number {pr_number} exceeds maximum allowed value of {MAX_PR_NUMBER}"
        ),
    })?;
    Ok(PrNumber::new(n))
}

/// Validate a caller-supplied template name.
///
/// The name must end in `.txt`, carry no path separators, and be longer than
/// the bare extension. This keeps lookups inside the template store.
///
/// # Errors
///
/// Returns a [`ValidationError`] for field `templateName`.
///
/// # Examples
///
/// ```
/// use prscribe_core::validate::validate_template_name;
///
/// assert!(validate_template_name("prompt-template.txt").is_ok());
/// assert!(validate_template_name("../etc/passwd.txt").is_err());
/// assert!(validate_template_name(".txt").is_err());
/// ```
pub fn validate_template_name(template: &str) -> Result<(), ValidationError> {
    let valid = template.ends_with(TEMPLATE_EXTENSION)
        && !template.contains('/')
        && !template.contains('\\')
        && template.len() > TEMPLATE_EXTENSION.len();

    if valid {
        Ok(())
    } else {
        Err(ValidationError {
            field: "templateName",
            value: template.to_string(),
            reason: ValidationReason::Format,
            message: format!(
                "Template name '{template}' must be a .txt file name without path separators"
            ),
        })
    }
}
