//! End-to-end review runs with both upstreams served by mock HTTP servers.

use std::sync::Arc;

use prscribe_core::{
    ErrorCategory, GitHubConfig, InferenceConfig, OutcomeStatus, PublishPolicy, ReviewConfig,
    ReviewError, ReviewRequest,
};
use prscribe_review::github::GitHubClient;
use prscribe_review::llm::InferenceClient;
use prscribe_review::pipeline::ReviewOrchestrator;
use prscribe_review::prompt::{PromptBuilder, TemplateStore};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIFF: &str = "diff --git a/README b/README\n--- a/README\n+++ b/README\n@@ -1 +1 @@\n-Hello\n+Hello World\n";

struct Upstreams {
    github: MockServer,
    inference: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            github: MockServer::start().await,
            inference: MockServer::start().await,
        }
    }

    async fn serve_diff(&self, body: &str) {
        Mock::given(method("GET"))
            .and(path("/repos/octocat/Hello-World/pulls/123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.github)
            .await;
    }

    async fn serve_review(&self, review: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": review})),
            )
            .mount(&self.inference)
            .await;
    }

    fn orchestrator(
        &self,
        token: Option<&str>,
        policy: PublishPolicy,
    ) -> ReviewOrchestrator<GitHubClient, InferenceClient> {
        let github = GitHubConfig {
            base_url: self.github.uri(),
            token: token.map(str::to_string),
            ..GitHubConfig::default()
        };
        let inference = InferenceConfig {
            api_url: format!("{}/api/generate", self.inference.uri()),
            ..InferenceConfig::default()
        };
        let review = ReviewConfig::default();
        ReviewOrchestrator::new(
            GitHubClient::new(&github).unwrap(),
            InferenceClient::new(&inference).unwrap(),
            PromptBuilder::new(Arc::new(TemplateStore::from_config(&review).unwrap())),
            &review,
        )
        .with_publish_policy(policy)
    }
}

#[tokio::test]
async fn generates_review_without_posting() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff(DIFF).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({"model": "openchat:latest", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "LGTM"})))
        .expect(1)
        .mount(&upstreams.inference)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&upstreams.github)
        .await;

    let outcome = upstreams
        .orchestrator(None, PublishPolicy::Partial)
        .run(&ReviewRequest::new("octocat/Hello-World", 123))
        .await
        .unwrap();

    assert_eq!(outcome.review.as_deref(), Some("LGTM"));
    assert!(!outcome.posted);

    let prompt_requests = upstreams.inference.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&prompt_requests[0].body).unwrap();
    assert!(body["prompt"].as_str().unwrap().contains(DIFF));
}

#[tokio::test]
async fn invalid_repository_contacts_no_upstream() {
    let upstreams = Upstreams::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstreams.github)
        .await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstreams.inference)
        .await;

    let err = upstreams
        .orchestrator(Some("ghp_test"), PublishPolicy::Partial)
        .run(&ReviewRequest::new("not-a-repo", 123).with_post_comment(true))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn empty_diff_skips_generation() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff("").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstreams.inference)
        .await;

    let err = upstreams
        .orchestrator(None, PublishPolicy::Partial)
        .run(&ReviewRequest::new("octocat/Hello-World", 123))
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::NoDiffContent { .. }));
}

#[tokio::test]
async fn posts_review_to_pull_request() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff(DIFF).await;
    upstreams.serve_review("Looks good to me.").await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/Hello-World/issues/123/comments"))
        .and(body_partial_json(serde_json::json!({"body": "Looks good to me."})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 7})))
        .expect(1)
        .mount(&upstreams.github)
        .await;

    let outcome = upstreams
        .orchestrator(Some("ghp_test"), PublishPolicy::Partial)
        .run(&ReviewRequest::new("octocat/Hello-World", 123).with_post_comment(true))
        .await
        .unwrap();

    assert!(outcome.posted);
    assert_eq!(outcome.status, OutcomeStatus::Published);
    assert!(outcome.message.contains("#123"));
}

#[tokio::test]
async fn forbidden_post_returns_partial_outcome() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff(DIFF).await;
    upstreams.serve_review("LGTM").await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/Hello-World/issues/123/comments"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "Resource not accessible by integration"
        })))
        .expect(1)
        .mount(&upstreams.github)
        .await;

    let outcome = upstreams
        .orchestrator(Some("ghp_test"), PublishPolicy::Partial)
        .run(&ReviewRequest::new("octocat/Hello-World", 123).with_post_comment(true))
        .await
        .unwrap();

    assert_eq!(outcome.review.as_deref(), Some("LGTM"));
    assert!(!outcome.posted);
    assert_eq!(outcome.status, OutcomeStatus::PublishFailed);
    assert!(outcome.message.contains("Resource not accessible by integration"));
}

#[tokio::test]
async fn forbidden_post_fails_under_strict_policy() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff(DIFF).await;
    upstreams.serve_review("LGTM").await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/Hello-World/issues/123/comments"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&upstreams.github)
        .await;

    let err = upstreams
        .orchestrator(Some("ghp_test"), PublishPolicy::Strict)
        .run(&ReviewRequest::new("octocat/Hello-World", 123).with_post_comment(true))
        .await
        .unwrap_err();

    assert_eq!(err.review_text(), Some("LGTM"));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn upstream_server_error_maps_to_bad_gateway() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff(DIFF).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "out of memory"})))
        .mount(&upstreams.inference)
        .await;

    let err = upstreams
        .orchestrator(None, PublishPolicy::Partial)
        .run(&ReviewRequest::new("octocat/Hello-World", 123))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Gateway);
    assert_eq!(err.status_code(), 502);
    assert!(err.to_string().contains("out of memory"));
    assert!(err.to_string().contains("octocat/Hello-World"));
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let upstreams = Upstreams::start().await;
    upstreams.serve_diff(DIFF).await;
    upstreams.serve_review("LGTM").await;
    let orchestrator = Arc::new(upstreams.orchestrator(None, PublishPolicy::Partial));

    let ok = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator
                .run(&ReviewRequest::new("octocat/Hello-World", 123))
                .await
        })
    };
    let bad = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run(&ReviewRequest::new("bad", 123)).await })
    };

    assert_eq!(ok.await.unwrap().unwrap().review.as_deref(), Some("LGTM"));
    assert!(bad.await.unwrap().is_err());
}
