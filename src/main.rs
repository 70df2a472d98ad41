use clap::{Arg, ArgMatches, Command};
use std::env;
use std::process;
use tracing::{error, info, warn, Level};

mod config;
mod error;
mod mcp;
mod tools;
mod utils;

use config::{ReaderConfig, DEFAULT_MAX_PDF_BYTES};
use mcp::server::McpServer;
use tools::pdf_reader_tool::PdfReaderTool;

/// Prints a formatted box with the given lines
/// Empty strings create empty lines, other strings are centered within the box
fn print_box(lines: &[&str]) {
    const BOX_WIDTH: usize = 60; // Total width including borders
    const CONTENT_WIDTH: usize = BOX_WIDTH - 4; // Width for content (excluding "║  " and "  ║")

    eprintln!("\n\x1b[36m╔{}╗", "═".repeat(BOX_WIDTH - 2));

    for line in lines {
        if line.is_empty() {
            eprintln!("║{}║", " ".repeat(BOX_WIDTH - 2));
            continue;
        }

        let visible_len = strip_ansi_codes(line).chars().count();
        if visible_len < CONTENT_WIDTH {
            let total_padding = CONTENT_WIDTH - visible_len;
            let left_padding = total_padding / 2;
            let right_padding = total_padding - left_padding;

            eprintln!(
                "║  {}{}{}\x1b[36m║",
                " ".repeat(left_padding),
                line,
                " ".repeat(right_padding)
            );
        } else {
            eprintln!("║  {}\x1b[36m  ║", line);
        }
    }

    eprintln!("╚{}╝\x1b[0m\n", "═".repeat(BOX_WIDTH - 2));
}

/// Strips ANSI escape codes to calculate visible text length
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn build_cli() -> Command {
    Command::new("mcp-pdf-reader")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Model Context Protocol server that reads PDF documents from URLs")
        .long_about(
            "This MCP server provides the following tool:\n\
            - pdf_reader: Fetch a PDF by URL and return its plain text\n\n\
            Use --fetch <URL> to run a single extraction without starting the server.",
        )
        .arg(
            Arg::new("max-pdf-bytes")
                .long("max-pdf-bytes")
                .value_name("BYTES")
                .help("Refuse documents larger than this many bytes (default: 500 MiB)")
                .value_parser(clap::value_parser!(u64))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("user-agent")
                .long("user-agent")
                .value_name("UA")
                .help("User-Agent header sent with every download")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("no-proxy")
                .long("no-proxy")
                .help("Ignore HTTP(S)_PROXY environment settings")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("fetch")
                .long("fetch")
                .value_name("URL")
                .help("Extract text from a single PDF, print it and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("metadata")
                .long("metadata")
                .requires("fetch")
                .help("With --fetch, also print the document metadata as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Suppress the banner and non-error logs (for MCP clients)")
                .action(clap::ArgAction::SetTrue),
        )
}

/// CLI flags win over environment variables, which win over defaults.
fn reader_config(matches: &ArgMatches) -> ReaderConfig {
    let max_pdf_bytes = matches
        .get_one::<u64>("max-pdf-bytes")
        .copied()
        .or_else(|| {
            let raw = env::var("PDF_READER_MAX_BYTES").ok()?;
            match raw.parse() {
                Ok(limit) => Some(limit),
                Err(e) => {
                    warn!("Ignoring PDF_READER_MAX_BYTES={:?}: {}", raw, e);
                    None
                }
            }
        })
        .unwrap_or(DEFAULT_MAX_PDF_BYTES);

    let defaults = ReaderConfig::default();
    let user_agent = matches
        .get_one::<String>("user-agent")
        .cloned()
        .or_else(|| env::var("PDF_READER_USER_AGENT").ok())
        .unwrap_or(defaults.user_agent);

    ReaderConfig {
        max_pdf_bytes,
        user_agent,
        no_proxy: matches.get_flag("no-proxy"),
    }
}

/// Log level: RUST_LOG when it names a level, else `error` in quiet mode, else `info`.
fn log_level(quiet: bool) -> Level {
    match env::var("RUST_LOG").ok().and_then(|v| v.parse::<Level>().ok()) {
        Some(level) => level,
        None if quiet => Level::ERROR,
        None => Level::INFO,
    }
}

/// One-shot extraction used for manual smoke testing. The document is
/// downloaded once, even when metadata is requested.
async fn fetch_once(tool: PdfReaderTool, url: String, with_metadata: bool) -> anyhow::Result<()> {
    let outcome = tokio::task::spawn_blocking(move || {
        if with_metadata {
            tool.read_with_metadata(&url)
                .map(|(text, metadata)| (text, Some(metadata)))
        } else {
            tool.read(&url).map(|text| (text, None))
        }
    })
    .await?;

    match outcome {
        Ok((text, metadata)) => {
            println!("{}", text);
            if let Some(metadata) = metadata {
                println!("\nPDF Metadata:\n{}", serde_json::to_string_pretty(&metadata)?);
            }
        }
        // Same text the tool would hand back to an agent
        Err(err) => println!("{}", err),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    let quiet = matches.get_flag("quiet");

    // stdout is reserved for JSON-RPC, so logs go to stderr only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(quiet))
        .init();

    let config = reader_config(&matches);
    info!(
        max_pdf_bytes = config.max_pdf_bytes,
        no_proxy = config.no_proxy,
        "Reader configuration loaded"
    );

    if let Some(url) = matches.get_one::<String>("fetch") {
        let tool = PdfReaderTool::new(config);
        if let Err(e) = fetch_once(tool, url.clone(), matches.get_flag("metadata")).await {
            error!("Fetch failed: {}", e);
            process::exit(1);
        }
        return;
    }

    if !quiet {
        print_box(&[
            "",
            "\x1b[1m\x1b[31m MCP-PDF-Reader: PDF Text Server \x1b[0m",
            "",
            "\x1b[0m Model Context Protocol server for PDF documents \x1b[0m",
            "",
        ]);
    }

    info!("Starting MCP server...");

    let mut server = McpServer::new(config);
    if let Err(e) = server.start().await {
        error!("Failed to start server: {}", e);
        process::exit(1);
    }
}
