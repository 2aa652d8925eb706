use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{sync, Document, FragmentClient, HttpTransport, LoadOutcome};
use shared::{
    markup::{Container, STUDENTS_FIELD},
    protocol::Method,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, parse_stale_policy};

#[derive(Parser, Debug)]
#[command(about = "Load server-rendered fragments the way the page client does")]
struct Cli {
    /// Base URL relative fragment URLs are resolved against.
    #[arg(long)]
    base_url: Option<String>,
    /// Request deadline in milliseconds; 0 disables it.
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    stale_policy: Option<String>,
    /// Print a JSON snapshot of the document instead of its containers.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Get {
        url: String,
        #[arg(long, default_value = "GET")]
        method: Method,
        /// Section title to show while the fragment loads.
        #[arg(long)]
        title: Option<String>,
    },
    Editor {
        url: String,
    },
    Submit {
        page_url: String,
        /// `input-id=value` written into the form before submitting.
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long = "toggle-student")]
        toggle_student: Vec<String>,
        #[arg(long, value_enum, default_value_t = Target::Fragment)]
        target: Target,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    Fragment,
    Modal,
    Editor,
}

impl From<Target> for Container {
    fn from(target: Target) -> Self {
        match target {
            Target::Fragment => Container::Fragment,
            Target::Modal => Container::Modal,
            Target::Editor => Container::Editor,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, value)) if !id.is_empty() => Ok((id.to_string(), value.to_string())),
        _ => Err(format!("expected input-id=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url.clone() {
        settings.base_url = Some(base_url);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.request_timeout_ms = Some(timeout_ms);
    }
    if let Some(raw) = cli.stale_policy.as_deref() {
        settings.stale_policy = parse_stale_policy(raw)
            .with_context(|| format!("unknown stale policy '{raw}'"))?;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = settings.client_options()?;
    let transport = HttpTransport::with_timeout(settings.request_timeout())?;
    let client = FragmentClient::new(Arc::new(transport), options.clone());
    info!(
        base_url = ?options.base_url.as_ref().map(|url| url.as_str()),
        stale_policy = ?settings.stale_policy,
        "fragment client ready"
    );

    let outcome = run(&client, cli.command).await?;
    print_document(&client.snapshot().await, outcome, cli.json)?;

    if outcome == LoadOutcome::Failed {
        bail!("fragment request failed");
    }
    Ok(())
}

async fn run(client: &FragmentClient, command: Command) -> Result<LoadOutcome> {
    let outcome = match command {
        Command::Get { url, method, title } => match title {
            Some(title) if method == Method::Get => client.request_section(&url, &title).await,
            Some(title) => {
                client.set_section_title(&title).await;
                client.request_url(&url, method, None).await
            }
            None => client.request_url(&url, method, None).await,
        },
        Command::Editor { url } => client.request_editor(&url, Method::Get, None).await,
        Command::Submit {
            page_url,
            set,
            toggle_student,
            target,
        } => {
            let loaded = client.request_url(&page_url, Method::Get, None).await;
            if !matches!(loaded, LoadOutcome::Injected(_)) {
                return Ok(loaded);
            }
            {
                let mut doc = client.document().await;
                apply_edits(&mut doc, &set, &toggle_student);
            }
            client.submit_form(Some(target.into())).await
        }
    };
    Ok(outcome)
}

/// Field synchronizations a user would do by hand before submitting.
fn apply_edits(doc: &mut Document, set: &[(String, String)], toggle_student: &[String]) {
    for (input_id, value) in set {
        sync::replace_form_value(doc, input_id, value);
    }
    for student in toggle_student {
        let toggled = doc
            .update_form(|form| {
                let selected = form
                    .multi(STUDENTS_FIELD.input_id)
                    .is_some_and(|group| group.contains(student));
                form.toggle(STUDENTS_FIELD.input_id, student, selected)
            })
            .flatten();
        match toggled {
            Some(toggle) => info!(student = %student, ?toggle, "student toggled"),
            None => warn!("no #{} on the page; --toggle-student ignored", STUDENTS_FIELD.container_id),
        }
    }
    if !toggle_student.is_empty() {
        let count = sync::form_values_by_id(doc, STUDENTS_FIELD.input_id).len();
        sync::replace_text(doc, STUDENTS_FIELD.display_id, &count.to_string());
    }
}

fn print_document(doc: &Document, outcome: LoadOutcome, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(doc).context("failed to serialize document")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("outcome: {outcome:?}");
    if let Some(title) = doc.section_title().filter(|title| !title.is_empty()) {
        println!("section: {title}");
    }
    for container in Container::ALL {
        let content = doc.content(container);
        if content.is_empty() {
            continue;
        }
        println!("--- {container} ---");
        println!("{content}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
