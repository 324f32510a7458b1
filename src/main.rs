use std::time::Duration;

use anyhow::Context;
use citegrab::{CitationRecord, FetchConfig, HttpFetcher, Resolver, TracingReporter};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, Format, Source};

mod cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    match args.command {
        Command::Fetch {
            from,
            name,
            tags,
            pdf,
            format,
            timeout,
            user_agent,
        } => {
            let mut config = FetchConfig {
                global_timeout: Duration::from_secs(timeout),
                ..FetchConfig::default()
            };
            if let Some(ua) = user_agent {
                config.browser_user_agent = ua;
            }
            let resolver = Resolver::new(HttpFetcher::new(config), TracingReporter);

            let (mut ok, mut failed) = (0usize, 0usize);
            for (i, src) in from.iter().enumerate() {
                let key = match &name {
                    Some(n) if from.len() > 1 => format!("{n}-{}", i + 1),
                    Some(n) => n.clone(),
                    None => src.default_name(),
                };
                match build(&resolver, src, &key, &tags, pdf.as_deref())
                    .and_then(|record| render(&record, format))
                {
                    Ok(out) => {
                        if let Some(out) = out {
                            println!("{out}");
                        }
                        ok += 1;
                    }
                    Err(e) => {
                        eprintln!("{} {e:#}", paint("error:", |s| s.red().to_string()));
                        failed += 1;
                    }
                }
            }
            eprintln!(
                "{} {ok}  {} {failed}",
                paint("✓", |s| s.green().to_string()),
                paint("✗", |s| s.red().to_string())
            );
        }
    }
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("citegrab={level}"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

fn build(
    resolver: &Resolver,
    src: &Source,
    key: &str,
    tags: &[String],
    pdf: Option<&str>,
) -> anyhow::Result<CitationRecord> {
    let tags = tags.iter().cloned();
    let mut record = match src {
        Source::File(path) => {
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .with_context(|| format!("{} is not a file", path.display()))?;
            resolver.from_file(key, &filename, path.parent(), tags)
        }
        Source::Url(url) => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("fetching {url}"));
            spinner.enable_steady_tick(Duration::from_millis(100));
            let res = resolver.from_url(key, url, tags);
            spinner.finish_and_clear();
            res
        }
    }
    .with_context(|| format!("{src}"))?;

    if let Some(pdf) = pdf {
        record.set_pdf_name(pdf);
    }
    Ok(record)
}

/// `Ok(None)` when the format has nothing to say about this record.
fn render(record: &CitationRecord, format: Format) -> anyhow::Result<Option<String>> {
    Ok(match format {
        Format::Citation => {
            let block = record.render_citation_string();
            if block.is_none() {
                tracing::warn!(
                    record = record.name(),
                    "no citation block for {} records, try --format biblatex",
                    record.shape()
                );
            }
            block
        }
        Format::Biblatex => Some(
            record
                .to_biblatex()
                .with_context(|| record.name().to_string())?
                .to_biblatex_string(),
        ),
        Format::Json => Some(serde_json::to_string_pretty(&record.to_json())?),
    })
}

fn paint(s: &str, color: impl Fn(&str) -> String) -> String {
    if std::env::var_os("NO_COLOR").is_some() {
        s.to_string()
    } else {
        color(s)
    }
}
