//! ESG assistant binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Install tracing
//! 3. Load the knowledge base (custom file, demo or built-in catalog)
//! 4. Pick the remote NLU client (webhook or offline)
//! 5. Start the axum REST API server

mod cli;

use std::sync::Arc;

use clap::Parser;

use esg_api::state::AppState;
use esg_chat::{OfflineClient, RemoteDialogueClient, WebhookClient};
use esg_core::{EsgConfig, KnowledgeBase};

use crate::cli::CliArgs;

fn build_remote(config: &EsgConfig) -> Result<Arc<dyn RemoteDialogueClient>, esg_chat::ChatError> {
    if !config.nlu.enabled {
        tracing::info!("NLU service disabled, answering from local rules only");
        return Ok(Arc::new(OfflineClient));
    }
    let client = WebhookClient::from_config(&config.nlu)?;
    tracing::info!(endpoint = %client.endpoint(), "NLU webhook client ready");
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Errors are reported once tracing is up.
    let config_file = args.resolve_config_path();
    let loaded = EsgConfig::load_if_exists(&config_file);
    let mut config = match loaded {
        Ok(Some(ref config)) => config.clone(),
        _ => EsgConfig::default(),
    };
    args.apply(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting ESG assistant v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(Some(_)) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Ok(None) => {
            tracing::info!(path = %config_file.display(), "No configuration file, using defaults")
        }
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load configuration, using defaults"
        ),
    }

    // Knowledge base.
    let knowledge = match KnowledgeBase::from_config(&config.chat) {
        Ok(kb) => kb,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load the question catalog");
            return Err(e.into());
        }
    };
    tracing::info!(
        questions = knowledge.questions().len(),
        responses = knowledge.responses().len(),
        rules = knowledge.keyword_rules().len(),
        "Knowledge base ready"
    );

    // Dialogue.
    let remote = build_remote(&config)?;
    let state = AppState::new(config.clone(), knowledge, remote);

    // API server.
    if let Err(e) = esg_api::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!(
            "Try: ESG_ASSISTANT_PORT={} cargo run -p esg-app",
            config.general.port.saturating_add(1)
        );
        return Err(e.into());
    }

    Ok(())
}
