use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use team_wire::cli::{Cli, Command};
use team_wire::collector::{run_collection, start_background_collection, Collector};
use team_wire::config::Config;
use team_wire::loader::FeedLoader;
use team_wire::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "team_wire=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;
    info!(
        "Loaded {} feeds from {}",
        config.feeds.len(),
        cli.config.display()
    );

    match cli.command() {
        Command::Collect => {
            let collector = Collector::new(config.clone())?;
            run_collection(&collector, &config.output).await?;
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Start background collection task
    if !config.feeds.is_empty() && config.refresh_interval > 0 {
        let collector = Arc::new(Collector::new(config.clone())?);
        let output = config.output.clone();
        let refresh_interval = config.refresh_interval;
        tokio::spawn(async move {
            start_background_collection(collector, output, refresh_interval).await;
        });
    }

    let loader = FeedLoader::new(
        &config.feed_url,
        Duration::from_secs(config.load_timeout),
        &config.user_agent,
    )?;
    info!("Page reads feed document from {:?}", loader.location());

    let state = Arc::new(AppState {
        loader: Arc::new(loader),
    });
    let app = routes::router(state, &config);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server starting on http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
