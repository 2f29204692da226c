//! tierfetch: fetch the item list the way a two-tier render would.
//!
//! ```text
//! tierfetch items [--bound-ms N] [--select I]   race, then repair on the client
//! tierfetch direct                              one unbounded fetch
//! tierfetch submit <a> <b>                      POST the two-field form
//! ```
//!
//! Items go to stdout as JSON; everything else is logged to stderr.
use std::io::{Write, stdout};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use url::Url;

use tierfetch_config::TierfetchConfig;
use tierfetch_fetch::{
    FormSubmitter, HttpItemSource, ItemList, RequestOptions, Selection, TracingSink, TwoTierFetch,
    fetch_items,
};

#[derive(Parser, Debug)]
#[command(name = "tierfetch")]
#[command(about = "Fetch the item list with a bounded first try and a client-side retry")]
struct Cli {
    /// Defaults to `items`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Race the server fetch against a deadline, then repair on the client
    Items {
        /// Server-side deadline in milliseconds (overrides config)
        #[arg(long, allow_hyphen_values = true)]
        bound_ms: Option<i64>,
        /// Index of the item whose description is logged
        #[arg(long)]
        select: Option<usize>,
    },
    /// One unbounded fetch
    Direct,
    /// POST the two-field form
    Submit { a: String, b: String },
}

impl Cli {
    fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Items {
            bound_ms: None,
            select: None,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries the JSON payload.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn load_config() -> TierfetchConfig {
    match TierfetchConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            tracing::warn!("Using default config: {err}");
            TierfetchConfig::default()
        }
    }
}

fn print_items(items: &ItemList) -> Result<()> {
    let json = serde_json::to_string_pretty(items).context("failed to encode items")?;
    let mut out = stdout().lock();
    writeln!(out, "{json}")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let command = Cli::parse().into_command();
    let config = load_config();

    let client = Client::builder()
        .user_agent(concat!("tierfetch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let origin = Url::parse(&config.client_origin())
        .with_context(|| format!("invalid client origin {:?}", config.client_origin()))?;
    let source = Arc::new(HttpItemSource::new(client.clone()).with_origin(origin));

    let mut options = RequestOptions::default();
    for (name, value) in config.headers() {
        options = options.with_header(name, value);
    }

    match command {
        Command::Items { bound_ms, select } => {
            let bound_ms = bound_ms.unwrap_or_else(|| config.bound_ms());
            let fetch = TwoTierFetch::new(
                source,
                config.items_url(),
                config.items_path(),
                bound_ms as f64,
            )
            .with_options(options);

            let outcome = fetch.run(TracingSink).await?;
            tracing::info!(
                used_fallback = outcome.used_fallback(),
                state = ?outcome.state,
                count = outcome.displayed.len(),
                "Items settled"
            );

            let mut selection = Selection::default();
            if let Some(index) = select {
                selection.select(index);
            }
            if let Some(description) = selection.description(&outcome.displayed) {
                tracing::info!("Selected: {description}");
            }
            print_items(&outcome.displayed)?;
        }
        Command::Direct => {
            let items = fetch_items(source.as_ref(), &config.items_url(), &options).await?;
            print_items(&items)?;
        }
        Command::Submit { a, b } => {
            let endpoint = Url::parse(&config.submit_url())
                .with_context(|| format!("invalid submit URL {:?}", config.submit_url()))?;
            let submitter = FormSubmitter::new(client, endpoint);
            submitter.submit(a, b).await?;
            tracing::info!(status = submitter.status().label(), "Form submitted");
        }
    }

    Ok(())
}
