use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use emotion_lens::args::Args;
use emotion_lens::config::AppConfig;
use emotion_lens::server::{self, AppState};

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    // RUST_LOG directives take precedence over these defaults
    if std::env::var_os("RUST_LOG").is_none() {
        for directive in ["emotion_lens=info", "tower_http=info"] {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
    }
    fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    // 0. Load Config
    let mut config = AppConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    // 1. Load models once, shared by every request
    let state = AppState::from_config(&config)?;

    // 2. Serve
    let app = server::router(
        state,
        &config.paths.static_dir,
        config.server.max_body_bytes,
    );
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
