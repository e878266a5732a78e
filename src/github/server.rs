use std::any::Any;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::github::error::AppError;
use crate::github::webhook::{GitHubWebhook, WebhookSecret};
use crate::github::{GithubRepoName, PullRequestNumber};
use crate::review::{handle_review_event, ReviewContext};
use crate::utils::logging::LogError;
use crate::utils::text::pluralize;

/// Shared server state for all axum handlers.
pub struct ServerState {
    webhook_secret: WebhookSecret,
    ctx: Arc<ReviewContext>,
}

impl ServerState {
    pub fn new(webhook_secret: WebhookSecret, ctx: Arc<ReviewContext>) -> Self {
        Self {
            webhook_secret,
            ctx,
        }
    }

    pub fn get_webhook_secret(&self) -> &WebhookSecret {
        &self.webhook_secret
    }
}

pub type ServerStateRef = Arc<ServerState>;

pub fn create_app(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/webhook", post(github_webhook_handler))
        .route("/fetch-pr/{owner}/{repo}/{number}", get(fetch_pr_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
        .fallback(not_found_handler)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Router panicked: {err:?}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

async fn index_handler() -> impl IntoResponse {
    (StatusCode::OK, "Webhook server is live")
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "")
}

/// Axum handler that receives a verified webhook and reviews the pull request it describes.
///
/// The review runs in its own task so that a panic inside it cannot take down the handler. The
/// response is sent after the review finishes, and it is successful even when the review failed.
pub async fn github_webhook_handler(
    State(state): State<ServerStateRef>,
    GitHubWebhook(delivery): GitHubWebhook,
) -> impl IntoResponse {
    let span = tracing::info_span!(
        "Webhook",
        event = delivery.event_type.as_deref().unwrap_or("<missing>"),
        delivery = delivery.delivery_id.as_deref().unwrap_or("<missing>"),
    );

    async move {
        let Some(event) = delivery.event else {
            tracing::debug!("Ignoring event");
            return;
        };
        if !state.ctx.config.should_review(event.action) {
            tracing::info!(
                "Ignoring {} of {}, reviews on push are disabled",
                event.action.as_str(),
                event.pull_request
            );
            return;
        }

        let review_span = tracing::info_span!(
            "Review",
            pr = %event.pull_request,
            action = event.action.as_str()
        );
        let task = tokio::spawn(
            handle_review_event(event, state.ctx.clone()).instrument(review_span.clone()),
        );
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => review_span.log_review_error(error),
            Err(error) => review_span.log_error(anyhow::anyhow!("Review task failed: {error}")),
        }
    }
    .instrument(span)
    .await;

    (StatusCode::OK, "Webhook processed successfully")
}

/// Lists the changed files of a pull request, for checking the GitHub credentials by hand.
async fn fetch_pr_handler(
    State(state): State<ServerStateRef>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = GithubRepoName::new(&owner, &repo);
    let files = state
        .ctx
        .repository_client
        .list_changed_files(&repo, PullRequestNumber(number))
        .await?;
    Ok(Json(serde_json::json!({
        "message": format!(
            "Fetched {} changed {} of {repo}#{number}",
            files.len(),
            pluralize("file", files.len())
        ),
        "diffs": files,
    })))
}
