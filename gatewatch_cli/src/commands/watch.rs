//! Follow the live capture feed

use crate::api::ApiClient;
use crate::config::Config;
use crate::inspector::{RequestStore, StoreEvent, StreamConsumer};
use anyhow::Result;
use console::style;
use gatewatch_common::CapturedRequest;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Handle the watch command: snapshot + live feed until Ctrl+C
pub async fn run(start_capture: bool) -> Result<()> {
    use cliclack::intro;

    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    intro(style(" gatewatch ").on_cyan().black().to_string())?;

    if start_capture {
        let ack = api.start_capture().await?;
        if ack.running {
            println!("{}  {}", style("◆").green(), style("Traffic capture running").dim());
        } else {
            println!(
                "{}  {}",
                style("◆").yellow(),
                style("Backend reports capture is not running").dim()
            );
        }
    }

    let store = Arc::new(RequestStore::new());
    let mut events = store.subscribe();
    let consumer = StreamConsumer::start(api, config.websocket_url(), store.clone());

    println!();
    println!(
        "{}  {}",
        style("◆").green(),
        style("Waiting for captured requests... (Ctrl+C to stop)").dim()
    );
    println!();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::SnapshotMerged { total }) => {
                    println!(
                        "{}  {}",
                        style("◆").cyan(),
                        style(format!("Snapshot loaded: {} captured request(s)", total)).dim()
                    );
                }
                Ok(StoreEvent::NewRequest(request)) => print_request(&request, false),
                Ok(StoreEvent::Updated(request)) => print_request(&request, true),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Display fell behind the feed; {} updates skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    consumer.stop().await;

    println!();
    println!("{}  {}", style("◆").dim(), style("Capture feed closed").dim());
    Ok(())
}

fn print_request(request: &CapturedRequest, updated: bool) {
    let marker = if updated {
        style("~").yellow()
    } else {
        style("+").green()
    };
    let time = request
        .timestamp()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let verdict = match request.malicious {
        Some(true) => style("malicious").red().bold(),
        Some(false) => style("clean").green(),
        None => style("unscored").dim(),
    };

    println!(
        "{} {} {:<7} {}  [{}] {}",
        marker,
        style(time).dim(),
        style(&request.method).cyan().bold(),
        request.url,
        verdict,
        style(format!("#{}", request.id)).dim()
    );
}
