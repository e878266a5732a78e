use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

use reviewbot::{
    base_github_url, base_openai_url, create_app, create_github_client, require_secret,
    DiffSource, DiffStrategy, DirectFetchDiffSource, FileListDiffSource, GithubRepositoryClient,
    OpenAiClient, RepositoryClient, ReviewConfig, ReviewContext, ServerState, WebhookSecret,
    DEFAULT_MAX_PATCH_CHARS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TEMPERATURE,
};

#[derive(clap::Parser)]
struct Opts {
    /// Token used to read pull requests and post comments.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// API key of the completion service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Secret used to authenticate webhooks.
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: String,

    /// Port of the webhook server.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    openai_model: String,

    /// Base URL of an OpenAI-compatible completion service.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = base_openai_url())]
    openai_base_url: String,

    /// Base URL of the GitHub REST API (for GitHub Enterprise, e.g. `https://ghe.local/api/v3`).
    #[arg(long, env = "GITHUB_API_URL", default_value = base_github_url())]
    github_api_url: String,

    #[arg(long, env = "REVIEW_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    review_temperature: f32,

    #[arg(long, env = "REVIEW_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    review_max_tokens: u32,

    /// Maximum number of characters of each patch included in the prompt.
    #[arg(long, env = "REVIEW_MAX_PATCH_CHARS", default_value_t = DEFAULT_MAX_PATCH_CHARS)]
    review_max_patch_chars: usize,

    #[arg(long, env = "REVIEW_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    review_system_prompt: String,

    /// Review pull requests again when new commits are pushed.
    #[arg(long, env = "REVIEW_ON_PUSH", default_value_t = true, action = clap::ArgAction::Set)]
    review_on_push: bool,

    /// How the diff of a pull request is obtained.
    #[arg(long, env = "DIFF_STRATEGY", value_enum, default_value_t = DiffStrategy::Files)]
    diff_strategy: DiffStrategy,
}

async fn server(state: ServerState, port: u16) -> anyhow::Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let github_token = require_secret("GITHUB_TOKEN", opts.github_token)?;
    let openai_api_key = require_secret("OPENAI_API_KEY", opts.openai_api_key)?;
    let webhook_secret = require_secret("WEBHOOK_SECRET", opts.webhook_secret)?;

    let config = ReviewConfig {
        model: opts.openai_model,
        system_prompt: opts.review_system_prompt,
        temperature: opts.review_temperature,
        max_tokens: opts.review_max_tokens,
        max_patch_chars: opts.review_max_patch_chars,
        review_on_push: opts.review_on_push,
        ..Default::default()
    }
    .validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    // Octocrab needs a running runtime for its HTTP layer.
    let ctx = runtime.block_on(async {
        let gh_client = create_github_client(&github_token, &opts.github_api_url)?;
        let repository_client: Arc<dyn RepositoryClient> =
            Arc::new(GithubRepositoryClient::new(gh_client));
        let diff_source: Arc<dyn DiffSource> = match opts.diff_strategy {
            DiffStrategy::Files => Arc::new(FileListDiffSource::new(repository_client.clone())),
            DiffStrategy::Direct => Arc::new(DirectFetchDiffSource::new(
                &opts.github_api_url,
                SecretString::new(github_token.expose_secret().clone()),
            )?),
        };
        let completion_client = Arc::new(OpenAiClient::new(&opts.openai_base_url, openai_api_key)?);
        tracing::info!(
            "Reviewing with model {} ({:?} diff strategy)",
            config.model,
            opts.diff_strategy
        );
        anyhow::Ok(ReviewContext::new(
            repository_client,
            diff_source,
            completion_client,
            config,
        ))
    })?;

    let state = ServerState::new(WebhookSecret::from(webhook_secret), Arc::new(ctx));
    runtime.block_on(server(state, opts.port))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
