use c2a_proxy::{auth, build_router, AppState, ProxyConfig, SharedLogger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "c2a-proxy",
    about = "Accept OpenAI-style chat requests and forward them to an Anthropic-style Messages API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Credentials file holding the expected bearer token (overrides config)
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "c2a-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "c2a_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in c2a_proxy::config::config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(path) = cli.credentials {
        config.auth.credentials_path = Some(path);
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    let credentials_path = config
        .auth
        .credentials_path
        .clone()
        .or_else(auth::default_credentials_path);
    let expected_token = match credentials_path {
        Some(ref path) => match auth::load_access_token(path) {
            Ok(token) => token,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read credentials file");
                None
            }
        },
        None => None,
    };
    if expected_token.is_none() {
        warn!("No access token found; every request will be rejected with 401");
    }

    let mut client = reqwest::Client::builder();
    if let Some(timeout) = config.timeout() {
        client = client.timeout(timeout);
    }
    let client = client.build()?;

    let state = Arc::new(AppState::new(
        config.clone(),
        client,
        logger.clone(),
        expected_token,
    )?);

    info!("c2a-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:     {}", config.messages_url());
    info!("  API version:  {}", config.upstream.api_version);
    info!("  Image fetches: up to {} at once", state.images.max_concurrent());
    info!("  Models:       {} listed", config.models.len());
    info!("  Log file:     {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting c2a-proxy upstream={} port={}",
            config.messages_url(),
            config.port
        ),
    );

    let app = build_router(state);
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
