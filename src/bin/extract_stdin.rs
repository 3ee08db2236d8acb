//! CLI that reads a rendered product page and prints its record as JSON.
//!
//! HTML comes from `--file` or stdin. Captured API responses can be
//! replayed with `--response URL=PATH` so the interceptor sees them before
//! extraction runs.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use product_extract::extractor::extract_complete_blocking;
use product_extract::intercept::MemoryHost;
use product_extract::{Error, Options, Page, Registry};

#[derive(Parser)]
#[command(
    name = "product-extract",
    about = "Extract a normalized product record from a rendered product page",
    version
)]
struct Cli {
    /// URL the page was loaded from; selects the site extractor.
    #[arg(short, long)]
    url: String,

    /// HTML file to read instead of stdin.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Captured JSON response to replay, as `URL=PATH`. Repeatable.
    #[arg(long = "response", value_name = "URL=PATH")]
    responses: Vec<String>,

    /// Currency used when the page does not reveal one.
    #[arg(long, default_value = "EUR")]
    default_currency: String,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn read_html(file: Option<&PathBuf>) -> io::Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path),
        None => {
            let mut html = Vec::new();
            io::stdin().read_to_end(&mut html)?;
            Ok(html)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let html = match read_html(cli.file.as_ref()) {
        Ok(html) => html,
        Err(err) => {
            eprintln!("failed to read HTML: {err}");
            return ExitCode::FAILURE;
        }
    };

    let page = match Page::from_bytes(&cli.url, &html, None) {
        Ok(page) => page,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let options = Options {
        default_currency: cli.default_currency,
        ..Options::default()
    };
    let registry = Registry::with_defaults(options);
    let extractor = match registry.create_for(&page) {
        Ok(extractor) => extractor,
        Err(err @ Error::UnsupportedPlatform(_)) => {
            eprintln!("{err} (known platforms: {})", registry.platforms().join(", "));
            return ExitCode::from(2);
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if !cli.responses.is_empty() {
        let host = MemoryHost::new();
        extractor.install_interception(&host);
        for entry in &cli.responses {
            let Some((url, path)) = entry.rsplit_once('=') else {
                eprintln!("ignoring malformed --response `{entry}`; expected URL=PATH");
                continue;
            };
            match std::fs::read_to_string(path) {
                Ok(body) => host.deliver_fetch(url, &body),
                Err(err) => eprintln!("failed to read {path}: {err}"),
            }
        }
    }

    let record = extract_complete_blocking(extractor.as_ref(), &page);
    let json = if cli.pretty {
        serde_json::to_string_pretty(&record)
    } else {
        serde_json::to_string(&record)
    };
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to serialize record: {err}");
            ExitCode::FAILURE
        }
    }
}
