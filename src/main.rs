// src/main.rs
mod utils;
mod naver;
mod extractors;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use utils::{AppError, CrawlError};
use naver::client::{DEFAULT_FINANCE_BASE_URL, DEFAULT_NEWS_BASE_URL, DEFAULT_USER_AGENT};
use naver::{CrawlerConfig, NaverClient};
use naver::encoding::decode_euc_kr;
use naver::models::{effective_display, parse_display, ListingRequest};

/// Stock news harvester for the Naver Finance news listing and article pages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Base URL of the finance site (listing pages, relative article links)
    #[arg(long, env = "NAVER_FINANCE_BASE_URL", default_value = DEFAULT_FINANCE_BASE_URL, global = true)]
    finance_base_url: String,

    /// Base URL of the news site (article pages)
    #[arg(long, env = "NAVER_NEWS_BASE_URL", default_value = DEFAULT_NEWS_BASE_URL, global = true)]
    news_base_url: String,

    /// User-Agent sent with every request
    #[arg(long, env = "CRAWLER_USER_AGENT", default_value = DEFAULT_USER_AGENT, global = true)]
    user_agent: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one page of a stock's news listing
    List {
        /// Stock code, e.g. 005930
        #[arg(short, long)]
        code: String,

        /// Number of articles to collect (1-100, default 10)
        #[arg(short, long)]
        display: Option<String>,

        /// Listing page number
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Save the decoded listing and an annotated copy here
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },

    /// Crawl the full text and images of one article
    Detail {
        /// Article URL from a listing (query or path form)
        #[arg(short, long)]
        url: String,
    },

    /// Parse a listing page saved on disk
    Parse {
        /// Saved listing page
        #[arg(short, long)]
        file: PathBuf,

        /// Stock code the page belongs to
        #[arg(short, long)]
        code: String,

        /// Number of articles to collect (1-100, default 10)
        #[arg(short, long)]
        display: Option<String>,

        /// Page number to report in the result
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// The file is UTF-8 rather than EUC-KR
        #[arg(long)]
        utf8: bool,
    },
}

impl Args {
    fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig {
            finance_base_url: self.finance_base_url.clone(),
            news_base_url: self.news_base_url.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting with command: {:?}", args.command);

    // 3. Build the HTTP client from explicit configuration
    let client = NaverClient::new(args.crawler_config())?;

    // 4. Run the command
    let json = match &args.command {
        Command::List { code, display, page, debug_dir } => {
            let mut request = ListingRequest::new(code.as_str()).page(*page);
            if let Some(requested) = display.as_deref().and_then(parse_display) {
                request = request.display(requested);
            }

            let (result, html) = extractors::crawl_listing(&client, &request).await?;

            if let Some(dir) = debug_dir {
                utils::html_debug::dump_listing(dir, &result.stock_code, *page, &html)?;
            }
            serde_json::to_string_pretty(&result)?
        }
        Command::Detail { url } => {
            let detail = extractors::crawl_detail(&client, url).await?;
            serde_json::to_string_pretty(&detail)?
        }
        Command::Parse { file, code, display, page, utf8 } => {
            let code = code.trim();
            if code.is_empty() {
                return Err(CrawlError::InvalidInput("Stock code is required".to_string()).into());
            }

            let bytes = std::fs::read(file)?;
            tracing::info!("Read {} bytes from {}", bytes.len(), file.display());
            let html = if *utf8 {
                String::from_utf8_lossy(&bytes).into_owned()
            } else {
                decode_euc_kr(&bytes)
            };

            let display = effective_display(display.as_deref().and_then(parse_display));
            let articles = extractors::parse_listing(&html, code, client.finance_base(), display);
            let result = extractors::build_listing_result("file", code, *page, display, articles, file.display().to_string());
            serde_json::to_string_pretty(&result)?
        }
    };

    // 5. Emit the result
    write_output(args.output.as_deref(), &json)?;

    tracing::info!("Processing finished.");
    Ok(())
}

fn write_output(path: Option<&Path>, json: &str) -> Result<(), AppError> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            tracing::info!("Saved result to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
