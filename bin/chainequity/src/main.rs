use alloy_primitives::Address as AlloyAddress;
use chainequity_api::{build_router, AppState};
use chainequity_indexer::{Indexer, IndexerConfig};
use chainequity_store::Store;
use clap::Parser;

/// Server + indexer configuration. Every key is read from the environment,
/// with `clap`'s `env` feature falling back to a CLI flag of the same name
/// for local overrides.
#[derive(Parser, Debug)]
#[clap(about = "Chainequity indexer and cap-table API server")]
struct Cli {
    #[clap(long, env = "PORT", default_value_t = 4000)]
    port: u16,

    #[clap(long, env = "NODE_ENV", default_value = "development")]
    node_env: String,

    #[clap(long, env = "USE_LOCAL_NETWORK", default_value_t = true)]
    use_local_network: bool,

    #[clap(long, env = "LOCAL_RPC_URL", default_value = "http://127.0.0.1:8545")]
    local_rpc_url: String,

    #[clap(long, env = "ALCHEMY_API_KEY")]
    alchemy_api_key: Option<String>,

    #[clap(long, env = "ALCHEMY_NETWORK", default_value = "polygon-amoy")]
    alchemy_network: String,

    #[clap(long, env = "TOKEN_CONTRACT_ADDRESS")]
    token_contract_address: String,

    #[clap(long, env = "DATABASE_PATH", default_value = "sqlite://chainequity.db")]
    database_path: String,

    #[clap(long, env = "CORS_ORIGIN")]
    cors_origin: Option<String>,

    #[clap(long, env = "DEPLOYMENT_BLOCK")]
    deployment_block: Option<u64>,

    /// A safety override so the indexer can target a non-localhost RPC
    /// endpoint deliberately rather than by misconfiguration (see
    /// `AutoIndexGuard`).
    #[clap(long, env = "CHAINEQUITY_ALLOW_REMOTE_RPC", default_value_t = false)]
    allow_remote_rpc: bool,
}

impl Cli {
    /// Resolves the HTTP RPC endpoint from `USE_LOCAL_NETWORK` and the
    /// Alchemy settings (`ALCHEMY_API_KEY`, `ALCHEMY_NETWORK`).
    fn http_rpc_url(&self) -> eyre::Result<String> {
        if self.use_local_network {
            return Ok(self.local_rpc_url.clone());
        }

        let api_key = self
            .alchemy_api_key
            .as_ref()
            .ok_or_else(|| eyre::eyre!("ALCHEMY_API_KEY is required when USE_LOCAL_NETWORK is false"))?;

        Ok(format!("https://{}.g.alchemy.com/v2/{}", self.alchemy_network, api_key))
    }

    /// The matching push-subscription endpoint, when one exists. Local
    /// Anvil/Hardhat nodes and Alchemy both speak websockets on a sibling
    /// path; `None` here just means the indexer falls back to poll-only.
    fn ws_rpc_url(&self) -> Option<String> {
        if self.use_local_network {
            return Some(self.local_rpc_url.replacen("http", "ws", 1));
        }

        let api_key = self.alchemy_api_key.as_ref()?;
        Some(format!("wss://{}.g.alchemy.com/v2/{}", self.alchemy_network, api_key))
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    tracing::info!(node_env = %cli.node_env, port = cli.port, "starting chainequity");

    let contract: AlloyAddress = cli
        .token_contract_address
        .parse()
        .map_err(|_| eyre::eyre!("TOKEN_CONTRACT_ADDRESS is not a valid address: {}", cli.token_contract_address))?;

    let store = Store::connect(&cli.database_path).await?;

    let indexer_config = IndexerConfig {
        ws_url: cli.ws_rpc_url(),
        http_url: cli.http_rpc_url()?,
        contract,
        start_block: cli.deployment_block.unwrap_or(0),
        allow_remote_rpc: cli.allow_remote_rpc,
        ..IndexerConfig::default()
    };

    let indexer = Indexer::new(store.clone(), indexer_config)?;
    let state_handle = indexer.state_handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let indexer_task = tokio::spawn(async move {
        if let Err(e) = indexer.run(shutdown_rx).await {
            tracing::error!(error = %e, "indexer task exited with error");
        }
    });

    let app_state = AppState::new(store, state_handle);
    let router = build_router(app_state, cli.cors_origin.as_deref());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port)).await?;
    tracing::info!(port = cli.port, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(());
    let _ = indexer_task.await;

    Ok(())
}
