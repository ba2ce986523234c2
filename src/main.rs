use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webwx_rust::{
    ClientConfig, CommandDispatcher, HttpApi, LoginFlow, MemoryStore, SessionSnapshot,
    SessionTransport, StdinCommandSource, StdoutPublisher, SyncEngine,
};

/// WeChat Web protocol client: logs in via QR, publishes decoded messages
/// as JSON lines on stdout and dispatches JSON commands from stdin.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Override the user agent advertised by the client.
    #[arg(long)]
    user_agent: Option<String>,

    /// Override the login host.
    #[arg(long)]
    login_base: Option<String>,

    /// Retry backoff after transport failures, in seconds.
    #[arg(long)]
    backoff_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::default();
    if let Some(agent) = cli.user_agent {
        config = config.with_user_agent(agent);
    }
    if let Some(base) = cli.login_base {
        config = config.with_login_base(base);
    }
    if let Some(secs) = cli.backoff_secs {
        config = config.with_backoff_delay(Duration::from_secs(secs));
    }

    let transport = Arc::new(SessionTransport::new(&config)?);
    let api = Arc::new(HttpApi::new(transport, config.clone()));

    let flow = LoginFlow::new(api.clone(), config.clone());
    let outcome = flow.run().await?;
    info!(contacts = outcome.contacts.len(), "logged in");

    let (session_tx, session_rx) = tokio::sync::watch::channel(SessionSnapshot::default());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut engine = SyncEngine::new(
        api.clone(),
        config,
        outcome,
        Arc::new(StdoutPublisher),
        Arc::new(MemoryStore::new()),
        session_tx,
        shutdown_rx.clone(),
    );

    let dispatcher = CommandDispatcher::new(api, session_rx);
    let dispatcher_shutdown = shutdown_rx.clone();
    let dispatcher_task = tokio::spawn(async move {
        dispatcher
            .run(StdinCommandSource::new(), dispatcher_shutdown)
            .await;
    });

    let engine_task = tokio::spawn(async move {
        engine.run().await;
    });

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    if shutdown_tx.send(true).is_err() {
        error!("engine already gone");
    }

    let _ = engine_task.await;
    dispatcher_task.abort();
    Ok(())
}
