use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;
use crate::types::{PublishPolicy, TemplateKind};

/// Top-level configuration loaded from `.prscribe.toml`.
///
/// Resolution order: CLI flags > environment variables > config file >
/// defaults. The value is built once at startup and handed to each gateway
/// by reference.
///
/// # Examples
///
/// ```
/// use prscribe_core::PrscribeConfig;
///
/// let config = PrscribeConfig::default();
/// assert_eq!(config.github.base_url, "https://api.github.com");
/// assert_eq!(config.inference.model, "openchat:latest");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrscribeConfig {
    /// Source-control host settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Text-generation backend settings.
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl PrscribeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Io`] if the file cannot be read, or
    /// [`ReviewError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ReviewError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use prscribe_core::PrscribeConfig;
    ///
    /// let toml = r#"
    /// [inference]
    /// model = "llama3"
    /// "#;
    /// let config = PrscribeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.inference.model, "llama3");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ReviewError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    ///
    /// | Variable | Setting |
    /// |---|---|
    /// | `GITHUB_TOKEN`, then `GH_TOKEN` | `github.token` |
    /// | `PRSCRIBE_GITHUB_URL` | `github.base_url` |
    /// | `PRSCRIBE_INFERENCE_URL` | `inference.api_url` |
    /// | `PRSCRIBE_INFERENCE_TOKEN` | `inference.api_token` |
    /// | `PRSCRIBE_MODEL` | `inference.model` |
    ///
    /// # Examples
    ///
    /// ```
    /// use prscribe_core::PrscribeConfig;
    ///
    /// let config = PrscribeConfig::default().with_overrides(|key| match key {
    ///     "GITHUB_TOKEN" => Some("ghp_test".into()),
    ///     "PRSCRIBE_MODEL" => Some("   ".into()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
    /// assert_eq!(config.inference.model, "openchat:latest");
    /// ```
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("GITHUB_TOKEN").or_else(|| get("GH_TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(url) = get("PRSCRIBE_GITHUB_URL") {
            self.github.base_url = url;
        }
        if let Some(url) = get("PRSCRIBE_INFERENCE_URL") {
            self.inference.api_url = url;
        }
        if let Some(token) = get("PRSCRIBE_INFERENCE_TOKEN") {
            self.inference.api_token = Some(token);
        }
        if let Some(model) = get("PRSCRIBE_MODEL") {
            self.inference.model = model;
        }
        self
    }

    /// Check settings that would otherwise fail deep inside a request.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Configuration`] for blank URLs or model names,
    /// zero timeouts, or a default template name with path separators.
    pub fn validate(&self) -> Result<(), ReviewError> {
        require_non_blank("github.base_url", &self.github.base_url)?;
        require_non_blank("inference.api_url", &self.inference.api_url)?;
        require_non_blank("inference.model", &self.inference.model)?;
        require_positive("github.connect_timeout_secs", self.github.connect_timeout_secs)?;
        require_positive("github.request_timeout_secs", self.github.request_timeout_secs)?;
        require_positive(
            "inference.connect_timeout_secs",
            self.inference.connect_timeout_secs,
        )?;
        require_positive(
            "inference.request_timeout_secs",
            self.inference.request_timeout_secs,
        )?;
        crate::validate::validate_template_name(&self.review.default_template).map_err(|e| {
            ReviewError::Configuration(format!("review.default_template: {}", e.message))
        })?;

        if self.inference.request_timeout_secs <= self.github.request_timeout_secs {
            tracing::warn!(
                inference = self.inference.request_timeout_secs,
                github = self.github.request_timeout_secs,
                "inference request timeout is not longer than the GitHub request timeout"
            );
        }
        Ok(())
    }
}

fn require_non_blank(key: &str, value: &str) -> Result<(), ReviewError> {
    if value.trim().is_empty() {
        return Err(ReviewError::Configuration(format!("{key} must not be empty")));
    }
    Ok(())
}

fn require_positive(key: &str, value: u64) -> Result<(), ReviewError> {
    if value == 0 {
        return Err(ReviewError::Configuration(format!("{key} must be positive")));
    }
    Ok(())
}

/// Source-control host configuration.
///
/// # Examples
///
/// ```
/// use prscribe_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert_eq!(config.connect_timeout().as_secs(), 15);
/// assert_eq!(config.request_timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API base URL (default: `https://api.github.com`).
    #[serde(default = "default_github_url")]
    pub base_url: String,
    /// Personal access token. Optional for reading diffs, required for posting.
    pub token: Option<String>,
    /// Connect timeout in seconds (default: 15).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (default: 30).
    #[serde(default = "default_github_request_timeout")]
    pub request_timeout_secs: u64,
}

impl GitHubConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The token, if one is set and not blank.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

fn default_github_url() -> String {
    "https://api.github.com".into()
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_github_request_timeout() -> u64 {
    30
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: default_github_url(),
            token: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_github_request_timeout(),
        }
    }
}

/// Text-generation backend configuration.
///
/// # Examples
///
/// ```
/// use prscribe_core::InferenceConfig;
///
/// let config = InferenceConfig::default();
/// assert_eq!(config.api_url, "http://localhost:11434/api/generate");
/// assert_eq!(config.request_timeout().as_secs(), 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Generation endpoint (default: a local Ollama `/api/generate`).
    #[serde(default = "default_inference_url")]
    pub api_url: String,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Model identifier (default: `openchat:latest`).
    #[serde(default = "default_model")]
    pub model: String,
    /// Connect timeout in seconds (default: 15).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (default: 60).
    #[serde(default = "default_inference_request_timeout")]
    pub request_timeout_secs: u64,
}

impl InferenceConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The API token, if one is set and not blank.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

fn default_inference_url() -> String {
    "http://localhost:11434/api/generate".into()
}

fn default_model() -> String {
    "openchat:latest".into()
}

fn default_inference_request_timeout() -> u64 {
    60
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_url: default_inference_url(),
            api_token: None,
            model: default_model(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_inference_request_timeout(),
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use prscribe_core::{PublishPolicy, ReviewConfig};
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.default_template, "prompt-template.txt");
/// assert_eq!(config.publish_policy, PublishPolicy::Partial);
/// assert!(config.template_dir.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Template used when a request names none.
    #[serde(default = "default_template")]
    pub default_template: String,
    /// Directory of extra `*.txt` templates, overlaid on the built-ins.
    pub template_dir: Option<PathBuf>,
    /// What a publish failure after generation means for the request.
    #[serde(default)]
    pub publish_policy: PublishPolicy,
}

fn default_template() -> String {
    TemplateKind::General.file_name().into()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_template: default_template(),
            template_dir: None,
            publish_policy: PublishPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = PrscribeConfig::default();
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert!(config.github.token.is_none());
        assert_eq!(config.github.connect_timeout_secs, 15);
        assert_eq!(config.github.request_timeout_secs, 30);
        assert_eq!(config.inference.model, "openchat:latest");
        assert_eq!(config.inference.request_timeout_secs, 60);
        assert_eq!(config.review.default_template, "prompt-template.txt");
        assert_eq!(config.review.publish_policy, PublishPolicy::Partial);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = PrscribeConfig::from_toml("").unwrap();
        assert_eq!(config.inference.model, "openchat:latest");
        assert_eq!(config.github.request_timeout_secs, 30);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[github]
base_url = "https://github.example.com/api/v3"
token = "ghp_abc"
connect_timeout_secs = 5
request_timeout_secs = 10

[inference]
api_url = "https://llm.example.com/api/generate"
api_token = "secret"
model = "codellama:13b"
request_timeout_secs = 300

[review]
default_template = "qa-automation-prompt-template.txt"
template_dir = "/etc/prscribe/templates"
publish_policy = "strict"
"#;
        let config = PrscribeConfig::from_toml(toml).unwrap();
        assert_eq!(config.github.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.github.token(), Some("ghp_abc"));
        assert_eq!(config.github.connect_timeout().as_secs(), 5);
        assert_eq!(config.inference.model, "codellama:13b");
        assert_eq!(config.inference.api_token(), Some("secret"));
        assert_eq!(config.inference.connect_timeout_secs, 15);
        assert_eq!(config.inference.request_timeout_secs, 300);
        assert_eq!(
            config.review.template_dir.as_deref(),
            Some(Path::new("/etc/prscribe/templates"))
        );
        assert_eq!(config.review.publish_policy, PublishPolicy::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = PrscribeConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(ReviewError::Toml(_))));
    }

    #[test]
    fn unknown_publish_policy_is_rejected() {
        let result = PrscribeConfig::from_toml("[review]\npublish_policy = \"sometimes\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".prscribe.toml");
        std::fs::write(&path, "[inference]\nmodel = \"mistral\"\n").unwrap();
        let config = PrscribeConfig::from_file(&path).unwrap();
        assert_eq!(config.inference.model, "mistral");
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let result = PrscribeConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ReviewError::Io(_))));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let config = PrscribeConfig::from_toml("[github]\ntoken = \"from-file\"\n")
            .unwrap()
            .with_overrides(|key| match key {
                "GH_TOKEN" => Some("from-gh".into()),
                "PRSCRIBE_GITHUB_URL" => Some("http://127.0.0.1:9".into()),
                "PRSCRIBE_INFERENCE_URL" => Some("http://127.0.0.1:10/gen".into()),
                "PRSCRIBE_INFERENCE_TOKEN" => Some("tok".into()),
                "PRSCRIBE_MODEL" => Some("phi3".into()),
                _ => None,
            });
        assert_eq!(config.github.token(), Some("from-gh"));
        assert_eq!(config.github.base_url, "http://127.0.0.1:9");
        assert_eq!(config.inference.api_url, "http://127.0.0.1:10/gen");
        assert_eq!(config.inference.api_token(), Some("tok"));
        assert_eq!(config.inference.model, "phi3");
    }

    #[test]
    fn github_token_preferred_over_gh_token() {
        let config = PrscribeConfig::default().with_overrides(|key| match key {
            "GITHUB_TOKEN" => Some("primary".into()),
            "GH_TOKEN" => Some("secondary".into()),
            _ => None,
        });
        assert_eq!(config.github.token(), Some("primary"));
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = PrscribeConfig::default().with_overrides(|_| Some("  ".into()));
        assert!(config.github.token.is_none());
        assert_eq!(config.inference.model, "openchat:latest");
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let config = GitHubConfig {
            token: Some("   ".into()),
            ..GitHubConfig::default()
        };
        assert_eq!(config.token(), None);
    }

    #[test]
    fn validate_rejects_zero_timeouts_and_blank_values() {
        let mut config = PrscribeConfig::default();
        config.github.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ReviewError::Configuration(msg)) if msg.contains("github.request_timeout_secs")
        ));

        let mut config = PrscribeConfig::default();
        config.inference.model = " ".into();
        assert!(config.validate().is_err());

        let mut config = PrscribeConfig::default();
        config.review.default_template = "../x.txt".into();
        assert!(config.validate().is_err());
    }
}
