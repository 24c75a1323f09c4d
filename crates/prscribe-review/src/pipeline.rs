use prscribe_core::validate::{validate_pr_number, validate_repository, validate_template_name};
use prscribe_core::{
    GatewayError, PrNumber, PublishPolicy, RepositoryId, ReviewConfig, ReviewError, ReviewOutcome,
    ReviewRequest,
};

use crate::github::SourceControl;
use crate::llm::Inference;
use crate::prompt::PromptBuilder;

/// A request whose every field has been checked.
#[derive(Debug)]
struct ValidatedRequest {
    repo: RepositoryId,
    pr_number: PrNumber,
    template: String,
    post_comment: bool,
}

/// Review orchestrator that drives one request through the pipeline.
///
/// Validate → fetch diff → build prompt → generate → (optionally) publish.
/// Each step runs only after the previous one succeeded; nothing is retried.
/// The orchestrator holds no per-request state, so one instance can serve
/// concurrent requests.
pub struct ReviewOrchestrator<S, I> {
    source_control: S,
    inference: I,
    prompts: PromptBuilder,
    default_template: String,
    publish_policy: PublishPolicy,
}

impl<S: SourceControl, I: Inference> ReviewOrchestrator<S, I> {
    /// Create an orchestrator from its gateways, prompt builder, and review config.
    pub fn new(source_control: S, inference: I, prompts: PromptBuilder, config: &ReviewConfig) -> Self {
        Self {
            source_control,
            inference,
            prompts,
            default_template: config.default_template.clone(),
            publish_policy: config.publish_policy,
        }
    }

    /// Override the publish-failure policy from the configuration.
    pub fn with_publish_policy(mut self, policy: PublishPolicy) -> Self {
        self.publish_policy = policy;
        self
    }

    /// The policy applied when posting fails after generation.
    pub fn publish_policy(&self) -> PublishPolicy {
        self.publish_policy
    }

    /// Run a review request to completion.
    ///
    /// With [`PublishPolicy::Partial`], a failed post still returns `Ok` with
    /// the generated text, `posted: false`, and a message explaining the
    /// failure.
    ///
    /// # Errors
    ///
    /// - [`ReviewError::Validation`] for bad input; no network call is made.
    /// - [`ReviewError::Configuration`] for an unknown template; no network call is made.
    /// - [`ReviewError::Gateway`] when fetching or generating fails.
    /// - [`ReviewError::NoDiffContent`] / [`ReviewError::EmptyReview`] for blank results.
    /// - [`ReviewError::PublishFailed`] when posting fails under [`PublishPolicy::Strict`].
    /// - [`ReviewError::Orchestration`] for failures a gateway could not classify.
    pub async fn run(&self, request: &ReviewRequest) -> Result<ReviewOutcome, ReviewError> {
        let request = self.validate(request)?;
        let repo = &request.repo;
        let pr_number = request.pr_number;

        tracing::info!(
            repository = %repo,
            pr = pr_number.get(),
            template = %request.template,
            post = request.post_comment,
            "generating review"
        );

        let diff = self
            .source_control
            .fetch_diff(repo, pr_number)
            .await
            .map_err(|e| in_context(repo, pr_number, e))?;
        if diff.is_blank() {
            return Err(ReviewError::NoDiffContent {
                repository: repo.to_string(),
                pr_number: pr_number.get(),
            });
        }

        let prompt = self.prompts.build(&diff, &request.template)?;

        let generated = self
            .inference
            .generate(&prompt)
            .await
            .map_err(|e| in_context(repo, pr_number, e))?;
        if generated.is_blank() {
            return Err(ReviewError::EmptyReview {
                repository: repo.to_string(),
                pr_number: pr_number.get(),
            });
        }
        let review = generated.into_text();

        if !request.post_comment {
            tracing::info!(repository = %repo, pr = pr_number.get(), "review generated");
            return Ok(ReviewOutcome::generated(review));
        }

        match self.source_control.post_comment(repo, pr_number, &review).await {
            Ok(()) => {
                tracing::info!(repository = %repo, pr = pr_number.get(), "review posted");
                Ok(ReviewOutcome::published(review, pr_number))
            }
            Err(source) => self.publish_failed(repo, pr_number, review, source),
        }
    }

    fn validate(&self, request: &ReviewRequest) -> Result<ValidatedRequest, ReviewError> {
        let repo = validate_repository(&request.repository)?;
        let pr_number = validate_pr_number(request.pr_number)?;

        let template = match request.template.as_deref() {
            Some(name) if !name.trim().is_empty() => {
                validate_template_name(name)?;
                name.to_string()
            }
            _ => self.default_template.clone(),
        };
        // Unknown templates are caught here so they never cost a network call.
        self.prompts.store().get(&template)?;

        Ok(ValidatedRequest {
            repo,
            pr_number,
            template,
            post_comment: request.post_comment,
        })
    }

    fn publish_failed(
        &self,
        repo: &RepositoryId,
        pr_number: PrNumber,
        review: String,
        source: GatewayError,
    ) -> Result<ReviewOutcome, ReviewError> {
        tracing::warn!(
            repository = %repo,
            pr = pr_number.get(),
            policy = %self.publish_policy,
            error = %source,
            "review generated but not posted"
        );
        match self.publish_policy {
            PublishPolicy::Partial => Ok(ReviewOutcome::publish_failed(review, pr_number, &source)),
            PublishPolicy::Strict => Err(ReviewError::PublishFailed {
                repository: repo.to_string(),
                pr_number: pr_number.get(),
                review,
                source,
            }),
        }
    }
}

/// Attach repository and PR context to a gateway failure.
fn in_context(repo: &RepositoryId, pr_number: PrNumber, source: GatewayError) -> ReviewError {
    match source {
        GatewayError::Unclassified { .. } => ReviewError::Orchestration {
            repository: repo.to_string(),
            pr_number: pr_number.get(),
            message: source.to_string(),
        },
        _ => ReviewError::Gateway {
            repository: repo.to_string(),
            pr_number: pr_number.get(),
            source,
        },
    }
}
