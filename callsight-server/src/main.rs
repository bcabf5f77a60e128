use clap::Parser;
use callsight_core::CallsightConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "callsight.toml")]
    config: String,

    /// Load the dataset and model artifact, report, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match CallsightConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let directive = config
        .service
        .log_level
        .parse()
        .unwrap_or_else(|_| tracing::Level::INFO.into());
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    // The dataset must load at startup; later requests re-read it.
    let dataset = match callsight_core::load_dataset(&config.dataset.path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to load dataset from {}: {}", config.dataset.path, e);
            std::process::exit(1);
        }
    };

    if args.check {
        println!(
            "✅ Dataset {}: {} sessions, {} agents, {} topics",
            config.dataset.path,
            dataset.table.len(),
            dataset.agents.len(),
            dataset.topics.len()
        );
        match callsight_core::load_model(&config.model) {
            Ok(model) => println!("✅ Model {} loaded ({})", config.model.path, model.name()),
            Err(e) => {
                println!("❌ Model {} failed to load: {}", config.model.path, e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    tracing::info!(
        "Serving {} sessions; {} model artifact at {}",
        dataset.table.len(),
        config.model.backend.as_str(),
        config.model.path
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if let Err(e) = callsight_server::http::start_http_server(config, tx.subscribe()).await {
        tracing::error!("HTTP server error: {}", e);
        return Err(e);
    }

    Ok(())
}
