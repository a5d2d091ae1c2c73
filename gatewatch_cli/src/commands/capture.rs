//! Toggle traffic capture on the backend

use crate::api::ApiClient;
use crate::config::Config;
use anyhow::Result;
use console::style;

/// Start capturing traffic
pub async fn start() -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    let ack = api.start_capture().await?;
    if ack.running {
        println!("{} Traffic capture running", style("✓").green());
    } else {
        println!(
            "{} Backend declined to start capturing",
            style("✗").red()
        );
    }
    Ok(())
}

/// Stop capturing traffic
pub async fn stop() -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    let ack = api.stop_capture().await?;
    if ack.stopped {
        println!("{} Traffic capture stopped", style("✓").green());
    } else {
        println!(
            "{} Backend reports capture was still running",
            style("✗").red()
        );
    }
    Ok(())
}
