use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use list_scraper::{
    FetchOptions, FetcherKind, FieldMap, OutputFormat, ScrapeConfig, save_output, scrape_page,
};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "list-scraper")]
#[command(about = "Scrape list items from a webpage", long_about = None)]
struct Args {
    /// URL to scrape
    url: String,

    /// CSS selector for list items
    item_selector: String,

    /// Field definitions: name:selector,name2:selector2
    #[arg(long)]
    fields: String,

    /// Output file path
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Fetcher type to use
    #[arg(long, value_enum, default_value_t = FetcherKind::Basic)]
    fetcher: FetcherKind,

    /// Enable Cloudflare solving (stealth only)
    #[arg(long)]
    cloudflare: bool,

    /// Show browser window (dynamic/stealth)
    #[arg(long)]
    visible: bool,

    /// Enable the similarity fallback when the item selector finds nothing
    #[arg(long)]
    adaptive: bool,

    /// Block fonts/images/media for faster fetches
    #[arg(long)]
    disable_resources: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    Url::parse(&args.url).with_context(|| format!("invalid URL: {}", args.url))?;

    let fields = FieldMap::parse(&args.fields);
    if fields.is_empty() {
        eprintln!("Error: No valid fields specified");
        std::process::exit(1);
    }

    log::info!("Scraping {}", args.url);
    log::info!("Item selector: {}", args.item_selector);
    log::info!("Fields: {:?}", fields.names().collect::<Vec<_>>());
    if args.adaptive {
        log::info!("Adaptive mode: enabled");
    }

    let config = ScrapeConfig {
        url: args.url,
        item_selector: args.item_selector,
        fields,
        fetcher: args.fetcher,
        options: FetchOptions {
            headless: !args.visible,
            disable_resources: args.disable_resources,
            adaptive: args.adaptive,
            solve_cloudflare: args.cloudflare,
            timeout_secs: args.timeout,
        },
    };

    let items = scrape_page(&config).await?;

    if items.is_empty() {
        println!("No items found");
    } else {
        save_output(&items, &args.output, args.format)?;
    }

    Ok(())
}
