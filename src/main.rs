// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sales_api::{
    api::{api_mux, ApiMuxConfig},
    auth::{AuthError, Authenticator, KeyStore, KeyStoreError},
    config::{Config, ConfigError, LogFormat, DEFAULT_LOG_FILTER},
    mid::Metrics,
    users::{CredentialError, CredentialVerifier, InMemoryUsers},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("loading keys: {0}")]
    Keys(#[from] KeyStoreError),

    #[error("constructing authenticator: {0}")]
    Auth(#[from] AuthError),

    #[error("seeding user account: {0}")]
    Seed(#[from] CredentialError),

    #[error("binding {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(LogFormat::Pretty);
            tracing::error!(error = %err, "Startup failed");
            return Err(err.into());
        }
    };
    init_tracing(config.log_format);

    let result = run(config).await;
    if let Err(err) = &result {
        tracing::error!(error = %err, "Service stopped with error");
    }
    result
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    tracing::info!(config = ?config, "Starting sales-api");

    // Keys are loaded once; a missing active key aborts startup.
    let keys = KeyStore::from_dir(&config.auth.keys_folder)?;
    let auth = Arc::new(Authenticator::new(
        config.auth.active_kid.clone(),
        Arc::new(keys),
    )?);
    tracing::info!(active_kid = auth.active_kid(), "Authenticator ready");

    let verifier = match &config.seed_user {
        Some(seed) => {
            let users = InMemoryUsers::new(config.auth.issuer.clone(), config.auth.token_ttl);
            users.insert(
                uuid::Uuid::new_v4().to_string(),
                &seed.email,
                &seed.password,
                seed.roles.clone(),
            )?;
            tracing::info!(email = %seed.email, roles = ?seed.roles, "Seeded user account");
            Some(Arc::new(users) as Arc<dyn CredentialVerifier>)
        }
        None => None,
    };
    if verifier.is_none() {
        tracing::warn!("No credential verifier configured, token endpoint disabled");
    }

    let shutdown = CancellationToken::new();
    let router = api_mux(ApiMuxConfig {
        shutdown: shutdown.clone(),
        auth,
        verifier,
        metrics: Arc::new(Metrics::new()),
    });

    let addr = config.web.api_host;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(%addr, "Sales API listening");

    tokio::spawn(wait_for_signal(shutdown.clone()));

    let graceful = shutdown.clone();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { graceful.cancelled().await });
    let mut serving = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut serving => {
            return joined?.map_err(StartupError::Serve);
        }
        _ = shutdown.cancelled() => {}
    }

    let deadline = config.web.shutdown_timeout;
    tracing::info!(timeout = ?deadline, "Shutdown started");

    match tokio::time::timeout(deadline, &mut serving).await {
        Ok(joined) => {
            joined?.map_err(StartupError::Serve)?;
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Err(_) => {
            serving.abort();
            Err(StartupError::ShutdownTimeout(deadline))
        }
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Unable to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Shutdown signal received"),
        _ = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
