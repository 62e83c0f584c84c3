use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resume_intake::config::Config;
use resume_intake::handlers::{create_router, AppState};
use resume_intake::services::{IntakePipeline, LlmDelegate, ScratchSpace};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // The log format is chosen before Config exists so config loading is logged too.
    let log_json = env::var("LOG_JSON")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    init_tracing(log_json);

    let config = Config::from_env()?;

    tracing::info!("Starting resume intake service");
    tracing::info!("Max file size: {}MB", config.max_file_size_mb);
    tracing::info!("Allowed extensions: {}", config.allowed_extensions.join(", "));

    // Scratch space is reset here, before the listener exists, so the wipe
    // can never race an in-flight upload.
    let scratch = ScratchSpace::initialize(&config.upload_path)?;
    let delegate = Arc::new(LlmDelegate::new(&config)?);
    let pipeline = IntakePipeline::new(&config, scratch, delegate);

    let app = create_router(AppState::new(pipeline));

    // Determine port from environment (PaaS compatibility)
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.server_port);

    let addr = format!("{}:{}", config.server_host, port);

    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "resume_intake=debug,tower_http=debug,axum::rejection=trace".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
