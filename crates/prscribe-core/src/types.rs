use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;

/// A repository identifier that has passed validation.
///
/// Only [`validate_repository`](crate::validate::validate_repository) can
/// construct one, so holding a `RepositoryId` proves the `owner/name` shape.
///
/// # Examples
///
/// ```
/// use prscribe_core::validate::validate_repository;
///
/// let repo = validate_repository("octocat/Hello-World").unwrap();
/// assert_eq!(repo.owner(), "octocat");
/// assert_eq!(repo.name(), "Hello-World");
/// assert_eq!(repo.to_string(), "octocat/Hello-World");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    pub(crate) fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Account or organisation that owns the repository.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A pull request number within `1..=999999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrNumber(u32);

impl PrNumber {
    pub(crate) const fn new(n: u32) -> Self {
        Self(n)
    }

    /// The raw number.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One review invocation, exactly as the caller supplied it.
///
/// Nothing here is trusted; the orchestrator validates every field before
/// any network call.
///
/// # Examples
///
/// ```
/// use prscribe_core::ReviewRequest;
///
/// let request = ReviewRequest::new("octocat/Hello-World", 123)
///     .with_template("qa-automation-prompt-template.txt")
///     .with_post_comment(true);
/// assert!(request.post_comment);
/// assert_eq!(request.template.as_deref(), Some("qa-automation-prompt-template.txt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Pull request number.
    pub pr_number: i64,
    /// Template name; `None` or blank selects the configured default.
    #[serde(default)]
    pub template: Option<String>,
    /// Post the generated review back as a PR comment.
    #[serde(default)]
    pub post_comment: bool,
}

impl ReviewRequest {
    /// A request using the default template and no post-back.
    pub fn new(repository: impl Into<String>, pr_number: i64) -> Self {
        Self {
            repository: repository.into(),
            pr_number,
            template: None,
            post_comment: false,
        }
    }

    /// Select a template by name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Request (or not) that the review be posted to the pull request.
    pub fn with_post_comment(mut self, post: bool) -> Self {
        self.post_comment = post;
        self
    }
}

/// Unified diff text of a pull request. May be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDiff(String);

impl PullRequestDiff {
    /// Wrap raw diff text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The diff text, verbatim.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when the diff is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Text produced by the inference backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReview(String);

impl GeneratedReview {
    /// Wrap generated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The generated text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when there is nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Take ownership of the text.
    pub fn into_text(self) -> String {
        self.0
    }
}

/// Terminal state of a review request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeStatus {
    /// Review generated; publishing was not requested.
    Generated,
    /// Review generated and posted.
    Published,
    /// Review generated, but posting it failed.
    PublishFailed,
    /// Nothing usable was produced.
    Failed,
}

/// The result handed back to the caller.
///
/// # Examples
///
/// ```
/// use prscribe_core::{OutcomeStatus, ReviewOutcome};
///
/// let outcome = ReviewOutcome::generated("LGTM".into());
/// assert_eq!(outcome.review.as_deref(), Some("LGTM"));
/// assert!(!outcome.posted);
/// assert_eq!(outcome.status, OutcomeStatus::Generated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Generated review text; `None` when the request failed before generation.
    pub review: Option<String>,
    /// Whether the review was posted to the pull request.
    pub posted: bool,
    /// Terminal state.
    pub status: OutcomeStatus,
    /// Human-readable status message.
    pub message: String,
}

impl ReviewOutcome {
    /// Review generated; posting was not requested.
    pub fn generated(review: String) -> Self {
        Self {
            review: Some(review),
            posted: false,
            status: OutcomeStatus::Generated,
            message: "Review generated successfully".into(),
        }
    }

    /// Review generated and posted to `pr_number`.
    pub fn published(review: String, pr_number: PrNumber) -> Self {
        Self {
            review: Some(review),
            posted: true,
            status: OutcomeStatus::Published,
            message: format!("Review generated and posted to GitHub PR #{pr_number}"),
        }
    }

    /// Review generated, but posting to `pr_number` failed because of `reason`.
    pub fn publish_failed(review: String, pr_number: PrNumber, reason: &dyn fmt::Display) -> Self {
        Self {
            review: Some(review),
            posted: false,
            status: OutcomeStatus::PublishFailed,
            message: format!(
                "Review generated, but posting to GitHub PR #{pr_number} failed: {reason}"
            ),
        }
    }

    /// Outcome describing a failed request. Any review text the error still
    /// carries is kept.
    pub fn from_error(err: &ReviewError) -> Self {
        Self {
            review: err.review_text().map(str::to_string),
            posted: false,
            status: OutcomeStatus::Failed,
            message: err.to_string(),
        }
    }

    /// Render the outcome as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Review\n\n");
        out.push_str(&format!("> {}\n\n", self.message));
        match &self.review {
            Some(review) => {
                out.push_str(review.trim_end());
                out.push('\n');
            }
            None => out.push_str("No review was generated.\n"),
        }
        out
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(review) = &self.review {
            writeln!(f, "{}", review.trim_end())?;
            writeln!(f)?;
        }
        write!(f, "--- {} ---", self.message)
    }
}

/// What to do when posting fails after a successful generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishPolicy {
    /// Return the review with `posted: false` and an explanatory message.
    #[default]
    Partial,
    /// Fail the request, keeping the review text inside the error.
    Strict,
}

impl fmt::Display for PublishPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishPolicy::Partial => write!(f, "partial"),
            PublishPolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for PublishPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "partial" => Ok(PublishPolicy::Partial),
            "strict" => Ok(PublishPolicy::Strict),
            other => Err(format!("unknown publish policy: {other}")),
        }
    }
}

/// The prompt templates shipped with prscribe.
///
/// # Examples
///
/// ```
/// use prscribe_core::TemplateKind;
///
/// let kind: TemplateKind = "qa-automation".parse().unwrap();
/// assert_eq!(kind.file_name(), "qa-automation-prompt-template.txt");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    /// General-purpose code review.
    General,
    /// Review focused on test automation code.
    QaAutomation,
}

impl TemplateKind {
    /// Every built-in template.
    pub const ALL: [TemplateKind; 2] = [TemplateKind::General, TemplateKind::QaAutomation];

    /// Name of the template in the store.
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateKind::General => "prompt-template.txt",
            TemplateKind::QaAutomation => "qa-automation-prompt-template.txt",
        }
    }

    /// One-line description.
    pub fn description(self) -> &'static str {
        match self {
            TemplateKind::General => "General code review",
            TemplateKind::QaAutomation => "QA automation review",
        }
    }

    /// The built-in kind stored under `file_name`, if any.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.file_name() == file_name)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::General => write!(f, "general"),
            TemplateKind::QaAutomation => write!(f, "qa-automation"),
        }
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "general" => Ok(TemplateKind::General),
            "qa-automation" | "qa" => Ok(TemplateKind::QaAutomation),
            other => Err(format!("unknown template kind: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use prscribe_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Review text followed by a status line.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn template_kind_maps_to_file_names() {
        assert_eq!(TemplateKind::General.file_name(), "prompt-template.txt");
        assert_eq!(
            TemplateKind::from_file_name("qa-automation-prompt-template.txt"),
            Some(TemplateKind::QaAutomation)
        );
        assert_eq!(TemplateKind::from_file_name("custom.txt"), None);
        assert_eq!(
            "QA_AUTOMATION".parse::<TemplateKind>().unwrap(),
            TemplateKind::QaAutomation
        );
        assert!("security".parse::<TemplateKind>().is_err());
    }

    #[test]
    fn publish_policy_defaults_to_partial() {
        assert_eq!(PublishPolicy::default(), PublishPolicy::Partial);
        assert_eq!("Strict".parse::<PublishPolicy>().unwrap(), PublishPolicy::Strict);
        let parsed: PublishPolicy = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(parsed, PublishPolicy::Partial);
    }

    #[test]
    fn blank_diff_and_review_detection() {
        assert!(PullRequestDiff::new("").is_blank());
        assert!(PullRequestDiff::new(" \n\t").is_blank());
        assert!(!PullRequestDiff::new("diff --git a/f b/f").is_blank());
        assert!(GeneratedReview::new("   ").is_blank());
        assert!(!GeneratedReview::new(" ok ").is_blank());
    }

    #[test]
    fn outcome_messages_name_the_pull_request() {
        let pr = PrNumber::new(123);
        let published = ReviewOutcome::published("LGTM".into(), pr);
        assert!(published.posted);
        assert_eq!(
            published.message,
            "Review generated and posted to GitHub PR #123"
        );

        let failed = ReviewOutcome::publish_failed("LGTM".into(), pr, &"403 Forbidden");
        assert!(!failed.posted);
        assert_eq!(failed.status, OutcomeStatus::PublishFailed);
        assert_eq!(failed.review.as_deref(), Some("LGTM"));
        assert!(failed.message.contains("#123 failed: 403 Forbidden"));
    }

    #[test]
    fn outcome_from_error_has_no_review() {
        let err = ReviewError::EmptyReview {
            repository: "a/b".into(),
            pr_number: 1,
        };
        let outcome = ReviewOutcome::from_error(&err);
        assert_eq!(outcome.review, None);
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.message.contains("empty review"));
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let json = serde_json::to_value(ReviewOutcome::generated("ok".into())).unwrap();
        assert_eq!(json["review"], "ok");
        assert_eq!(json["posted"], false);
        assert_eq!(json["status"], "generated");
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: ReviewRequest =
            serde_json::from_str(r#"{"repository":"a/b","prNumber":5}"#).unwrap();
        assert_eq!(request, ReviewRequest::new("a/b", 5));
    }

    #[test]
    fn outcome_renders_text_and_markdown() {
        let outcome = ReviewOutcome::generated("Looks fine.\n".into());
        let text = outcome.to_string();
        assert!(text.starts_with("Looks fine."));
        assert!(text.ends_with("--- Review generated successfully ---"));
        let md = outcome.to_markdown();
        assert!(md.starts_with("# Review"));
        assert!(md.contains("Looks fine."));
    }
}
