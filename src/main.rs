use std::env;

use kv_settings::ClientConfig;
use kv_settings::ConfigClient;
use kv_settings::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability();

    let settings = ClientConfig::load(None)?;
    let keys: Vec<String> = env::args().skip(1).collect();

    let client = ConfigClient::connect(settings).await?;
    for key in &keys {
        let value = client.get_setting(key, "").await;
        println!("{key}={value}");
    }

    let watcher = client.clone();
    client.on_config_change(move |changed| {
        info!("Configuration changed: {:?}", changed);
        let client = watcher.clone();
        let changed = changed.to_vec();
        tokio::spawn(async move {
            for key in changed {
                let value = client.get_setting(&key, "").await;
                println!("{key}={value}");
            }
        });
    });

    if client.watch_config() {
        info!("Watching for changes. Waiting for CTRL+C signal...");
    }

    if let Err(e) = graceful_shutdown().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
    }
    client.stop_watch();

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown completed");
    Ok(())
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();
}
