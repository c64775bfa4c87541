use clap::Parser;
use github_api_proxy::config::config_search_paths;
use github_api_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "github-api-proxy",
    about = "GitHub API proxy that keeps credentials on the server",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log file path
    #[arg(long, default_value = "github-api-proxy.log")]
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
                .unwrap_or_else(|_| "github_api_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    // Credentials are read per request; this only warns about an unusable setup.
    let auth = match config.credentials.read_env().credentials() {
        Some(credentials) => credentials.describe(),
        None => {
            warn!(
                "Neither {} nor {}/{} is set; requests will fail until they are",
                config.credentials.token_env,
                config.credentials.client_id_env,
                config.credentials.client_secret_env
            );
            "none".to_string()
        }
    };

    info!("github-api-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:  {}", config.upstream.base_url);
    info!("  GraphQL:   {}", config.upstream.graphql_url);
    info!("  Prefix:    {}", config.route_prefix);
    info!("  Auth:      {}", auth);
    info!("  Port:      {}", config.port);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting github-api-proxy upstream={} port={}",
            config.upstream.base_url, config.port
        ),
    );

    let port = config.port;
    let state = Arc::new(AppState::from_config(config, logger)?);

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
