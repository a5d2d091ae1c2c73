//! Check a URL's reputation

use crate::api::ApiClient;
use crate::config::Config;
use anyhow::Result;
use console::style;

/// Handle the check command: ask the backend's reputation provider about
/// one URL and print the verdict it forwards.
pub async fn run(url: String) -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    let spinner = cliclack::spinner();
    spinner.start("Checking URL reputation...");
    let verdict = match api.check_url(&url).await {
        Ok(verdict) => {
            spinner.stop("Lookup complete");
            verdict
        }
        Err(e) => {
            spinner.stop("Lookup failed");
            return Err(e.into());
        }
    };

    if !verdict.success {
        println!(
            "{} The reputation provider did not return a verdict",
            style("✗").red()
        );
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&verdict.phishtank_response)?);
    Ok(())
}
