use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use url::Url;

use crate::github::server::ServerStateRef;
use crate::github::{GithubRepoName, PullRequestNumber, PullRequestRef};
use crate::review::event::{PullRequestAction, ReviewEvent};

/// GitHub caps webhook payloads at 25 MB.
const MAX_WEBHOOK_BODY_SIZE: usize = 25 * 1024 * 1024;

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(serde::Deserialize, Debug)]
struct WebhookAction {
    action: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookUser {
    login: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookRepository {
    name: String,
    owner: WebhookUser,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest {
    number: u64,
    title: Option<String>,
    user: WebhookUser,
    diff_url: Option<Url>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequestEvent {
    pull_request: WebhookPullRequest,
    repository: WebhookRepository,
}

/// A webhook delivery whose signature has been verified.
#[derive(Debug)]
pub struct WebhookDelivery {
    /// Value of the `x-github-event` header.
    pub event_type: Option<String>,
    /// Value of the `x-github-delivery` header, unique for each delivery.
    pub delivery_id: Option<String>,
    /// The event that should be reviewed, or `None` if the delivery should be ignored.
    pub event: Option<ReviewEvent>,
}

/// axum extractor for GitHub webhook events.
#[derive(Debug)]
pub struct GitHubWebhook(pub WebhookDelivery);

#[derive(Debug, PartialEq)]
pub enum WebhookRejection {
    InvalidSignature,
    UnreadableBody,
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        match self {
            WebhookRejection::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid signature").into_response()
            }
            WebhookRejection::UnreadableBody => {
                (StatusCode::BAD_REQUEST, "Cannot read webhook body").into_response()
            }
        }
    }
}

/// Extracts a webhook event from a HTTP request.
///
/// The signature is checked against the raw body before anything in the body is parsed.
impl FromRequest<ServerStateRef> for GitHubWebhook {
    type Rejection = WebhookRejection;

    async fn from_request(
        request: Request,
        state: &ServerStateRef,
    ) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
            .await
            .map_err(|error| {
                tracing::error!("Parsing webhook body failed: {error:?}");
                WebhookRejection::UnreadableBody
            })?;

        // Verify that the request is valid
        if !verify_gh_signature(&parts.headers, &body, state.get_webhook_secret()) {
            tracing::error!("Webhook request failed, could not authenticate webhook");
            return Err(WebhookRejection::InvalidSignature);
        }

        let event = match parse_webhook_event(&parts.headers, &body) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!("Ignoring malformed webhook event: {error:?}");
                None
            }
        };

        Ok(GitHubWebhook(WebhookDelivery {
            event_type: header_str(&parts.headers, "x-github-event"),
            delivery_id: header_str(&parts.headers, "x-github-delivery"),
            event,
        }))
    }
}

fn header_str(headers: &HeaderMap<HeaderValue>, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Parses a verified webhook body.
/// Returns `Ok(None)` for events that are not interesting for the reviewer.
fn parse_webhook_event(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
) -> anyhow::Result<Option<ReviewEvent>> {
    let Some(event_type) = headers.get("x-github-event") else {
        return Err(anyhow::anyhow!("x-github-event header not found"));
    };

    match event_type.as_bytes() {
        b"pull_request" => parse_pull_request_event(body),
        _ => {
            tracing::debug!("Ignoring event type {:?}", event_type.to_str());
            Ok(None)
        }
    }
}

fn parse_pull_request_event(body: &[u8]) -> anyhow::Result<Option<ReviewEvent>> {
    let WebhookAction { action } = serde_json::from_slice(body)?;
    let Some(action) = action.as_deref().and_then(PullRequestAction::parse) else {
        tracing::debug!("Ignoring pull request action {action:?}");
        return Ok(None);
    };

    let payload: WebhookPullRequestEvent = serde_json::from_slice(body)?;
    let pull_request = parse_pull_request(payload)?;
    Ok(Some(ReviewEvent {
        action,
        pull_request,
    }))
}

fn parse_pull_request(payload: WebhookPullRequestEvent) -> anyhow::Result<PullRequestRef> {
    let WebhookPullRequestEvent {
        pull_request,
        repository,
    } = payload;

    if pull_request.number == 0 {
        return Err(anyhow::anyhow!("Pull request number must be positive"));
    }
    if repository.owner.login.is_empty() || repository.name.is_empty() {
        return Err(anyhow::anyhow!("Repository owner or name is empty"));
    }

    Ok(PullRequestRef {
        repository: GithubRepoName::new(&repository.owner.login, &repository.name),
        number: PullRequestNumber(pull_request.number),
        diff_url: pull_request.diff_url,
        author: pull_request.user.login,
        title: pull_request.title.unwrap_or_default(),
    })
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is properly signed by GitHub with SHA-256 and the passed `secret`.
pub fn verify_gh_signature(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
    secret: &WebhookSecret,
) -> bool {
    let Some(signature) = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    verify_signature(secret.expose().as_bytes(), body, signature)
}

/// Returns true iff `signature` is exactly `sha256=<lowercase hex of HMAC-SHA256(secret, body)>`.
/// The digest itself is compared in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Some(digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    // GitHub always sends lowercase hex, `hex::decode` would also accept uppercase.
    if !digest
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return false;
    }
    let Ok(digest) = hex::decode(digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&digest).is_ok()
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}

impl From<SecretString> for WebhookSecret {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}
