use async_trait::async_trait;
use prscribe_core::{
    GatewayError, GitHubConfig, PrNumber, PullRequestDiff, RepositoryId, ReviewError, Upstream,
};

use crate::upstream::{status_error, transport_error};

const USER_AGENT: &str = concat!("prscribe/", env!("CARGO_PKG_VERSION"));
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const ERROR_FIELDS: [&str; 2] = ["message", "error"];

/// Source-control operations the review pipeline needs.
///
/// Fetching and posting are separate operations because they have different
/// credential requirements: diffs of public repositories can be read
/// anonymously, posting always needs a token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Fetch the unified diff of a pull request.
    async fn fetch_diff(
        &self,
        repo: &RepositoryId,
        pr_number: PrNumber,
    ) -> Result<PullRequestDiff, GatewayError>;

    /// Create a new comment on a pull request.
    ///
    /// Every successful call creates another comment; callers must not retry.
    async fn post_comment(
        &self,
        repo: &RepositoryId,
        pr_number: PrNumber,
        body: &str,
    ) -> Result<(), GatewayError>;
}

/// GitHub REST client for fetching diffs and posting comments.
///
/// # Examples
///
/// ```
/// use prscribe_core::GitHubConfig;
/// use prscribe_review::github::GitHubClient;
///
/// let client = GitHubClient::new(&GitHubConfig::default()).unwrap();
/// assert!(!client.has_token());
/// ```
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ReviewError::Configuration(format!("failed to create GitHub HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token().map(str::to_string),
        })
    }

    /// Whether a token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn fetch_diff(
        &self,
        repo: &RepositoryId,
        pr_number: PrNumber,
    ) -> Result<PullRequestDiff, GatewayError> {
        let operation = format!("fetching diff of {repo}#{pr_number}");
        let url = format!(
            "{}/repos/{}/{}/pulls/{pr_number}",
            self.base_url,
            repo.owner(),
            repo.name()
        );
        tracing::debug!(%url, authenticated = self.has_token(), "fetching pull request diff");

        let response = self
            .with_auth(self.http.get(&url).header("Accept", DIFF_MEDIA_TYPE))
            .send()
            .await
            .map_err(|e| transport_error(Upstream::SourceControl, operation.clone(), &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(Upstream::SourceControl, operation.clone(), &e))?;

        if status.as_u16() >= 300 {
            return Err(status_error(
                Upstream::SourceControl,
                operation,
                status,
                &body,
                &ERROR_FIELDS,
            ));
        }

        tracing::debug!(bytes = body.len(), "received pull request diff");
        Ok(PullRequestDiff::new(body))
    }

    async fn post_comment(
        &self,
        repo: &RepositoryId,
        pr_number: PrNumber,
        body: &str,
    ) -> Result<(), GatewayError> {
        let operation = format!("posting comment to {repo}#{pr_number}");
        let Some(token) = &self.token else {
            return Err(GatewayError::Auth {
                upstream: Upstream::SourceControl,
                operation,
            });
        };

        let url = format!(
            "{}/repos/{}/{}/issues/{pr_number}/comments",
            self.base_url,
            repo.owner(),
            repo.name()
        );
        tracing::debug!(%url, "posting pull request comment");

        let response = self
            .http
            .post(&url)
            .header("Accept", JSON_MEDIA_TYPE)
            .bearer_auth(token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .map_err(|e| transport_error(Upstream::SourceControl, operation.clone(), &e))?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(error = %e, "could not read error response body");
                    String::new()
                }
            };
            return Err(status_error(
                Upstream::SourceControl,
                operation,
                status,
                &text,
                &ERROR_FIELDS,
            ));
        }
        Ok(())
    }
}
