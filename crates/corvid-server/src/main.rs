//! Corvid authorization server.
//!
//! Wires the PostgreSQL stores, the identity-service adapter, and the token
//! issuer into the authorization service, then serves the OAuth endpoints.

mod authn;
mod config;
mod router;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use corvid_auth::oauth::AuthorizationService;
use corvid_auth::{OAuthState, TokenIssuer};
use corvid_auth_postgres::PostgresAuthStorage;

use crate::authn::UpstreamAuthenticator;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load().context("loading configuration")?;
    config
        .auth
        .validate()
        .context("validating auth configuration")?;

    if config.auth.dev_mode {
        warn!(
            "DEV MODE ENABLED: redirect-URI registry enforcement is relaxed. \
             Never run production traffic in this mode."
        );
    }

    let storage = PostgresAuthStorage::connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    storage
        .ensure_schema()
        .await
        .context("creating auth tables")?;

    let issuer = Arc::new(TokenIssuer::new(
        config.auth.signing.secret.as_bytes(),
        config.auth.issuer.clone(),
    ));
    let authenticator = Arc::new(UpstreamAuthenticator::new(config.identity_url.clone()));

    let service = Arc::new(AuthorizationService::new(
        Arc::new(storage.sessions()),
        Arc::new(storage.refresh_tokens()),
        authenticator,
        issuer,
        config.auth.clone(),
    ));

    // One-time sweep: refresh tokens hashed before the slow lane existed
    // cannot be verified anymore and are revoked up front.
    let flagged = service
        .migrate_legacy_token_hashes()
        .await
        .context("migrating legacy token hashes")?;
    if flagged > 0 {
        info!(count = flagged, "Legacy refresh tokens revoked at startup");
    }

    let gc = tokio::spawn(gc_loop(service.clone(), config.gc_interval));

    let app = router::build(OAuthState::new(service));
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    info!(listen = %config.listen, issuer = %config.auth.issuer, "Corvid auth server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    gc.abort();
    info!("Corvid auth server stopped");
    Ok(())
}

/// Periodic garbage collection of expired sessions and refresh tokens.
///
/// Expired rows are filtered on read, so the sweep only bounds storage
/// growth; a failed sweep is logged and retried at the next tick.
async fn gc_loop(service: Arc<AuthorizationService>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match service.cleanup_expired().await {
            Ok((sessions, tokens)) if sessions > 0 || tokens > 0 => {
                info!(sessions, tokens, "Expired auth records deleted");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "GC sweep failed");
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
    }
}
