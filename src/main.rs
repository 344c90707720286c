use std::path::Path;

use qraz_client::{ApiClient, Config, PresentationsController, RepositoriesController};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type QrazResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> QrazResult<()> {
    // Initialize tracing (logs). Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = "qraz_client=info,reqwest=warn,h2=warn".to_string();
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .pretty()
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting qraz client");

    // Load environment variables from .env files
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load();
    if let Err(e) = config.validate() {
        return Err(anyhow::anyhow!(e));
    }

    let mut api = ApiClient::new(&config.base_url)?;
    if !config.csrf_token.is_empty() {
        api = api.with_csrf_token(&config.csrf_token);
    }
    if !config.session_id.is_empty() {
        api = api.with_session_id(&config.session_id);
    }
    tracing::info!(
        base_url = %config.base_url,
        has_session = !config.session_id.is_empty(),
        "configured qraz client"
    );

    let mut presentations = PresentationsController::new(api.clone());
    presentations.refresh().await?;
    for presentation in presentations.presentations() {
        tracing::info!(
            id = presentation.id,
            fullname = %presentation.fullname,
            url = %presentation.url,
            "presentation"
        );
    }

    let repositories =
        RepositoriesController::new(api).with_poll_interval(config.poll_interval());
    repositories.refresh().await?;

    // Ctrl-C aborts the polling chain
    let cancel = repositories.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling synchronization");
            cancel.cancel();
        }
    });

    repositories.sync_github().await?;

    let view = repositories.snapshot().await;
    for repo in &view.repositories {
        tracing::info!(id = repo.id, name = %repo.name, state = %repo.state, "repository");
    }
    Ok(())
}
