use anyhow::{Context, Result};
use chrono::Utc;
use ideaforge_ai::OpenAiProvider;
use ideaforge_storage::ReportStore;
use rand::Rng;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use ideaforge_server::app;
use ideaforge_server::config::{AiConfig, ServerConfig};
use ideaforge_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  ideaforge-server [config.toml]                                 Start the server");
    eprintln!("  ideaforge-server create-user <config.toml> <username> <password>  Create a user account");
}

#[tokio::main]
async fn main() -> Result<()> {
    ideaforge_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ideaforge=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("create-user") => {
            let (Some(config_path), Some(username), Some(password)) =
                (args.get(2), args.get(3), args.get(4))
            else {
                print_usage();
                anyhow::bail!("create-user requires <config.toml> <username> <password> arguments");
            };
            run_create_user(config_path, username, password).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn open_store(config: &ServerConfig) -> Result<ReportStore> {
    std::fs::create_dir_all(&config.database.data_dir).with_context(|| {
        format!(
            "Failed to create data directory '{}'",
            config.database.data_dir
        )
    })?;
    ReportStore::new(&config.database.connection_url()).await
}

/// Creates an account from the command line, e.g. when registration is closed.
async fn run_create_user(config_path: &str, username: &str, password: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;

    if store.get_user_by_username(username).await?.is_some() {
        anyhow::bail!("User '{username}' already exists");
    }
    let hash = ideaforge_storage::auth::hash_password(password)?;
    let id = store.create_user(username, &hash).await?;
    tracing::info!(user_id = %id, username = %username, "User created");
    Ok(())
}

/// 32 random bytes, hex encoded.
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn build_provider(ai: &AiConfig) -> Result<OpenAiProvider> {
    let api_key = ai.resolve_api_key().with_context(|| {
        format!(
            "No AI API key configured. Set [ai].api_key or the {} environment variable",
            AiConfig::API_KEY_ENV
        )
    })?;
    let provider = OpenAiProvider::new(
        api_key,
        Some(ai.model.clone()),
        Some(ai.base_url.clone()),
        Some(ai.timeout_secs),
        Some(ai.max_tokens),
        Some(ai.temperature),
    )?;
    Ok(provider)
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        model = %config.ai.model,
        "ideaforge-server starting"
    );

    let store = Arc::new(open_store(&config).await?);
    let analyzer = Arc::new(build_provider(&config.ai)?);

    // JWT secret: use configured value or generate random
    let jwt_secret = match config.auth.jwt_secret.as_deref().map(str::trim) {
        Some(secret) if !secret.is_empty() => Arc::new(secret.to_string()),
        _ => {
            tracing::warn!("No jwt_secret configured. A random secret was generated and will change on restart. Set [auth].jwt_secret in config for production use.");
            Arc::new(generate_secret())
        }
    };

    match store.count_users().await {
        Ok(0) if !config.auth.allow_registration => {
            tracing::warn!("No users exist and registration is disabled. Use `ideaforge-server create-user` to add one");
        }
        Ok(count) => tracing::info!(count, "Users loaded"),
        Err(e) => tracing::error!(error = %e, "Failed to check users table"),
    }

    let state = AppState {
        store,
        analyzer,
        start_time: Utc::now(),
        jwt_secret,
        token_expire_secs: config.auth.token_expire_secs,
        config: Arc::new(config.clone()),
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind {http_addr}"))?;

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
