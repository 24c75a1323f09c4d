use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use prscribe_core::{PullRequestDiff, ReviewConfig, ReviewError, TemplateKind};

/// Placeholder replaced by the pull request diff.
pub const DIFF_MARKER: &str = "{DIFF_CONTENT}";

const GENERAL_TEMPLATE: &str = include_str!("../templates/prompt-template.txt");
const QA_AUTOMATION_TEMPLATE: &str = include_str!("../templates/qa-automation-prompt-template.txt");

/// A named prompt skeleton containing [`DIFF_MARKER`].
///
/// # Examples
///
/// ```
/// use prscribe_review::prompt::PromptTemplate;
///
/// assert!(PromptTemplate::new("short.txt", "Review:\n{DIFF_CONTENT}").is_ok());
/// assert!(PromptTemplate::new("broken.txt", "Review this").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    body: String,
}

impl PromptTemplate {
    /// Create a template, rejecting bodies without the diff marker.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Configuration`] if `body` lacks [`DIFF_MARKER`];
    /// substituting into such a template would silently drop the diff.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Result<Self, ReviewError> {
        let name = name.into();
        let body = body.into();
        if !body.contains(DIFF_MARKER) {
            return Err(ReviewError::Configuration(format!(
                "prompt template '{name}' does not contain the {DIFF_MARKER} placeholder"
            )));
        }
        Ok(Self { name, body })
    }

    /// Name the template is stored under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// One-line description; built-ins have their own, others are "Custom template".
    pub fn description(&self) -> &'static str {
        TemplateKind::from_file_name(&self.name)
            .map(TemplateKind::description)
            .unwrap_or("Custom template")
    }

    fn render(&self, diff: &PullRequestDiff) -> String {
        self.body.replace(DIFF_MARKER, diff.as_str())
    }
}

/// Read-only name → template lookup, populated once at startup.
///
/// # Examples
///
/// ```
/// use prscribe_review::prompt::TemplateStore;
///
/// let store = TemplateStore::builtin();
/// assert!(store.get("prompt-template.txt").is_ok());
/// assert!(store.get("missing.txt").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, PromptTemplate>,
}

impl TemplateStore {
    /// The templates compiled into the binary.
    pub fn builtin() -> Self {
        let mut store = Self::default();
        for kind in TemplateKind::ALL {
            let body = match kind {
                TemplateKind::General => GENERAL_TEMPLATE,
                TemplateKind::QaAutomation => QA_AUTOMATION_TEMPLATE,
            };
            store.insert(PromptTemplate {
                name: kind.file_name().to_string(),
                body: body.to_string(),
            });
        }
        store
    }

    /// Built-ins plus the configured template directory, checked to contain
    /// the configured default template.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Io`] if the directory cannot be read, and
    /// [`ReviewError::Configuration`] for templates without the marker or a
    /// default template that does not exist.
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ReviewError> {
        let mut store = Self::builtin();
        if let Some(dir) = &config.template_dir {
            store = store.with_directory(dir)?;
        }
        if !store.contains(&config.default_template) {
            return Err(ReviewError::Configuration(format!(
                "default prompt template '{}' is not available",
                config.default_template
            )));
        }
        Ok(store)
    }

    /// Overlay every `*.txt` file in `dir`, replacing built-ins of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Io`] on read failures and
    /// [`ReviewError::Configuration`] if a file lacks the diff marker.
    pub fn with_directory(mut self, dir: &Path) -> Result<Self, ReviewError> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let body = std::fs::read_to_string(&path)?;
            tracing::debug!(template = name, path = %path.display(), "loaded prompt template");
            self.insert(PromptTemplate::new(name, body)?);
        }
        Ok(self)
    }

    /// Add or replace a template.
    pub fn insert(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Look up a template by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Configuration`] for unknown names: which
    /// templates exist is a deployment concern, not user input.
    pub fn get(&self, name: &str) -> Result<&PromptTemplate, ReviewError> {
        self.templates.get(name).ok_or_else(|| {
            ReviewError::Configuration(format!("unknown prompt template '{name}'"))
        })
    }

    /// `true` if a template named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All templates, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.values()
    }
}

/// Builds the prompt sent to the inference backend.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use prscribe_core::PullRequestDiff;
/// use prscribe_review::prompt::{PromptBuilder, TemplateStore};
///
/// let builder = PromptBuilder::new(Arc::new(TemplateStore::builtin()));
/// let diff = PullRequestDiff::new("+new line");
/// let prompt = builder.build(&diff, "prompt-template.txt").unwrap();
/// assert!(prompt.contains("+new line"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    store: Arc<TemplateStore>,
}

impl PromptBuilder {
    /// Create a builder over a shared template store.
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Substitute `diff` verbatim into the template named `template_name`.
    ///
    /// The diff is opaque: no escaping, no truncation, no size cap.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Configuration`] for unknown templates or a
    /// template without the marker.
    pub fn build(&self, diff: &PullRequestDiff, template_name: &str) -> Result<String, ReviewError> {
        let template = self.store.get(template_name)?;
        if !template.body.contains(DIFF_MARKER) {
            return Err(ReviewError::Configuration(format!(
                "prompt template '{template_name}' does not contain the {DIFF_MARKER} placeholder"
            )));
        }
        Ok(template.render(diff))
    }
}
