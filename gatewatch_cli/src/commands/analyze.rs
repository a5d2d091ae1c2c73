//! Classify a pasted raw request

use crate::api::ApiClient;
use crate::config::Config;
use crate::inspector::raw::parse_raw_request;
use anyhow::{Context, Result};
use console::style;
use gatewatch_common::AnalyzeVerdict;
use std::io::Read;
use std::path::PathBuf;

/// Handle the analyze command: parse the pasted block, reject unusable
/// drafts before any network call, then ask the classifier for a verdict.
pub async fn run(raw: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let input = match (raw, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read raw request from stdin")?;
            buffer
        }
    };

    let payload = parse_raw_request(&input);
    if payload.url.is_empty() {
        anyhow::bail!("Unable to detect a target URL. Include a full URL or Host header.");
    }

    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    let spinner = cliclack::spinner();
    spinner.start("Analyzing request...");
    let verdict = match api.analyze(&payload).await {
        Ok(verdict) => {
            spinner.stop("Analysis complete");
            verdict
        }
        Err(e) => {
            spinner.stop("Analysis failed");
            return Err(e.into());
        }
    };

    println!();
    println!(
        "{} {}  {}",
        style(&payload.method).cyan().bold(),
        payload.url,
        style(format!("({} header(s))", payload.headers.len())).dim()
    );
    println!();
    print_verdict(&verdict);
    Ok(())
}

fn print_verdict(verdict: &AnalyzeVerdict) {
    let label = if verdict.prediction == "Malicious" {
        style(verdict.prediction.as_str()).red().bold()
    } else {
        style(verdict.prediction.as_str()).green().bold()
    };
    println!(
        "Verdict: {}  (confidence {:.1}%)",
        label,
        verdict.confidence * 100.0
    );

    if !verdict.probabilities.is_empty() {
        println!();
        println!("Category scores:");
        for (category, score) in &verdict.probabilities {
            println!("  {:<20} {:>5.1}%", category, score * 100.0);
        }
    }

    if !verdict.malicious_patterns.is_empty() {
        println!();
        println!("Matched patterns: {}", verdict.malicious_patterns.join(", "));
    }

    if !verdict.explanation.is_empty() {
        println!();
        println!("{}", style(&verdict.explanation).dim());
    }
}
