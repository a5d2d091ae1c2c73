//! Edit and resend a captured request

use crate::api::ApiClient;
use crate::config::Config;
use crate::inspector::{CaptureList, Inspector, ReplayExecutor, RowField, Tab, ViewMode};
use anyhow::Result;
use console::style;

/// Edits applied to the draft before sending
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub id: String,
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Vec<String>,
    pub drop_headers: Vec<String>,
    pub body: Option<String>,
    pub view: Option<String>,
}

/// Handle the replay command: select a captured request, apply edits
/// through the draft, send it, and render the upstream response preview.
pub async fn run(opts: ReplayOptions) -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::new(&config.backend_url);

    let mut list = CaptureList::new();
    list.merge_snapshot(api.pending_requests().await?);
    let Some(request) = list.find(&opts.id) else {
        anyhow::bail!("No captured request matches id '{}'", opts.id);
    };

    let mut inspector = Inspector::new();
    inspector.select(Some(request));

    if let Some(method) = &opts.method {
        inspector.set_method(&method.to_ascii_uppercase());
    }
    if let Some(url) = &opts.url {
        inspector.set_url(url);
    }
    for entry in &opts.headers {
        let Some((name, value)) = entry.split_once(':') else {
            anyhow::bail!("Invalid header '{}': expected NAME:VALUE", entry);
        };
        set_header(&mut inspector, name.trim(), value.trim());
    }
    for name in &opts.drop_headers {
        drop_header(&mut inspector, name);
    }
    if let Some(body) = &opts.body {
        inspector.set_body(body);
    }
    match opts.view.as_deref() {
        Some("raw") => inspector.set_view_mode(ViewMode::Raw),
        Some("hex") => inspector.set_view_mode(ViewMode::Hex),
        Some("pretty") => inspector.set_view_mode(ViewMode::Pretty),
        _ => {}
    }

    print_draft(&inspector);

    let executor = ReplayExecutor::new(&api);
    let sent = executor.execute(&mut inspector).await;

    if let Some(error) = inspector.draft().and_then(|draft| draft.error.clone()) {
        anyhow::bail!("Replay failed: {}", error);
    }
    if !sent {
        anyhow::bail!("Replay was not sent");
    }

    if inspector.tab() == Tab::Response {
        if let Some(preview) = inspector.draft().and_then(|draft| draft.response.as_ref()) {
            println!();
            let status = if preview.status < 400 {
                style(preview.status.to_string()).green().bold()
            } else {
                style(preview.status.to_string()).red().bold()
            };
            println!("Response status: {}", status);

            if !preview.headers.is_empty() {
                println!();
                for (name, value) in &preview.headers {
                    println!("  {}: {}", style(name).cyan(), value);
                }
            }

            println!();
            if preview.body.is_empty() {
                println!("{}", style("[empty]").dim());
            } else {
                println!("{}", preview.body);
            }
        }
    }

    Ok(())
}

/// Update the value of the first row with this name, or append a new row
fn set_header(inspector: &mut Inspector, name: &str, value: &str) {
    let existing = inspector
        .draft()
        .and_then(|draft| draft.headers.iter().find(|row| row.name == name))
        .map(|row| row.id.clone());

    match existing {
        Some(id) => inspector.update_header(&id, RowField::Value, value),
        None => {
            if let Some(id) = inspector.add_header() {
                inspector.update_header(&id, RowField::Name, name);
                inspector.update_header(&id, RowField::Value, value);
            }
        }
    }
}

/// Remove every row carrying this name
fn drop_header(inspector: &mut Inspector, name: &str) {
    let ids: Vec<String> = inspector
        .draft()
        .map(|draft| {
            draft
                .headers
                .iter()
                .filter(|row| row.name == name)
                .map(|row| row.id.clone())
                .collect()
        })
        .unwrap_or_default();
    for id in ids {
        inspector.remove_header(&id);
    }
}

fn print_draft(inspector: &Inspector) {
    let Some(draft) = inspector.draft() else {
        return;
    };

    println!(
        "{} {}",
        style(&draft.method).cyan().bold(),
        draft.url
    );
    for row in &draft.headers {
        if row.name.is_empty() {
            continue;
        }
        println!("  {}: {}", style(&row.name).cyan(), row.value);
    }

    let body = inspector.display_body();
    if !body.is_empty() {
        println!();
        println!(
            "{}",
            style(format!("Body ({} view):", inspector.view_mode().as_str())).dim()
        );
        println!("{}", body);
    }
}
