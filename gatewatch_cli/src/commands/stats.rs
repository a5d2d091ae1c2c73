//! Show dashboard telemetry

use crate::api::ApiClient;
use crate::config::Config;
use anyhow::Result;
use console::style;

/// Handle the stats command: fetch and print the aggregate telemetry
pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    let stats = api.dashboard_stats().await?;
    let totals = &stats.totals;

    println!("Totals:");
    println!("  Requests:       {}", totals.requests);
    println!(
        "  Blocked:        {}  ({:.1}% detection rate)",
        style(totals.blocked).red(),
        totals.detection_rate * 100.0
    );
    println!("  Forwarded:      {}", style(totals.forwarded).green());
    println!("  Pending:        {}", totals.pending);
    println!("  Unique targets: {}", totals.unique_targets);

    if !stats.attack_distribution.is_empty() {
        println!();
        println!("Attack distribution:");
        for (attack, count) in &stats.attack_distribution {
            println!("  {:<20} {}", attack, count);
        }
    }

    if !stats.traffic_series.is_empty() {
        println!();
        println!("Traffic (hourly):");
        for point in &stats.traffic_series {
            println!(
                "  {}  {:>4} total  {:>4} blocked",
                style(&point.label).dim(),
                point.total,
                point.blocked
            );
        }
    }

    if !stats.blacklist.is_empty() {
        println!();
        println!("Top offenders:");
        for entry in &stats.blacklist {
            println!(
                "  {:.2}  {} {}  {}",
                entry.probability,
                style(&entry.method).cyan(),
                entry.url,
                style(&entry.attack_type).red()
            );
        }
    }

    if !stats.recent_requests.is_empty() {
        println!();
        println!("Recent requests:");
        for recent in &stats.recent_requests {
            let status = recent.status.as_deref().unwrap_or("pending");
            println!(
                "  {} {}  [{}] {}",
                style(&recent.method).cyan(),
                recent.url,
                status,
                style(format!("#{}", recent.id)).dim()
            );
        }
    }

    Ok(())
}
