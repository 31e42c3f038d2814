mod auth;
mod http_client;
mod model;

use std::sync::Arc;

use clap::Parser;

use auth::session::read_session;
use auth::{AuthError, FileSessionStore, LoginFlow, Navigator, SubmitOutcome};
use model::arg::Args;
use model::config::Config;

/// Hands the destination to whoever launched us
struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&self, destination: &str) {
        println!("{}", destination);
    }
}

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging (stdout is reserved for the destination)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {:#}", e);
        std::process::exit(1);
    });

    let session_file = args
        .session_file
        .unwrap_or_else(|| config.session_file.clone());
    let store = FileSessionStore::open(&session_file).unwrap_or_else(|e| {
        tracing::error!("Failed to open session store: {:#}", e);
        std::process::exit(1);
    });
    tracing::info!("Session file: {}", store.path().display());
    if read_session(&store).is_some() {
        tracing::info!("An existing session will be replaced on successful login");
    }

    let client = http_client::build_client_from_config(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client: {:#}", e);
        std::process::exit(1);
    });

    if config.proxy_url.is_some() {
        tracing::info!("HTTP proxy configured");
    }

    let flow = Arc::new(
        LoginFlow::new(
            &config,
            client,
            Arc::new(store),
            &args.query,
            Arc::new(StdoutNavigator),
        )
        .with_login_listener(|session| match &session.user_role {
            Some(role) => tracing::info!("Session started with role {}", role),
            None => tracing::info!("Session started without a role"),
        }),
    );
    tracing::info!("Login target: {}", flow.intent().destination());

    flow.set_username(args.username);
    flow.set_password(args.password);

    // Ctrl-C abandons the login instead of killing the process mid-write
    let interrupt = {
        let flow = flow.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                if flow.is_busy() {
                    tracing::warn!("Interrupted, abandoning the login in flight");
                }
                flow.teardown();
            }
        })
    };

    let result = flow.submit().await;
    interrupt.abort();

    match result {
        Ok(SubmitOutcome::Redirected(_)) => {
            tracing::info!("Logged in as {}", flow.username());
        }
        Ok(SubmitOutcome::Ignored) => {
            eprintln!("Login cancelled");
            std::process::exit(130);
        }
        Err(e) => {
            let message = flow.error().unwrap_or_else(|| e.user_message(&config.base_url));
            if matches!(e, AuthError::Unreachable) {
                tracing::error!("{}", e);
            }
            eprintln!("{}", message);
            std::process::exit(1);
        }
    }
}
