use amazon_scraper::{
    config::{FetchConfig, ScrapeConfig},
    search::SearchEngine,
    ScraperError, DEFAULT_PAGES,
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Scrape Amazon product data such as product name, images, URL, number of reviews,
/// ASIN and price.
#[derive(Parser, Debug)]
#[command(name = "amazon_scraper", version, about, long_about = None)]
struct Args {
    /// Amazon locale (e.g. "com", "co.uk", "de")
    #[arg(long, default_value = "co.uk")]
    locale: String,

    /// Search keywords
    #[arg(long, alias = "keyword")]
    keywords: Option<String>,

    /// Amazon search URL to walk instead of a keyword search
    #[arg(long)]
    url: Option<String>,

    /// Proxy API key
    #[arg(long = "proxy_api_key", env = "SCRAPER_API_KEY", hide_env_values = true)]
    proxy_api_key: Option<String>,

    /// Number of pages to scrape
    #[arg(long, default_value_t = DEFAULT_PAGES)]
    pages: u32,

    /// Also scrape reviews for every product with an ASIN
    #[arg(long)]
    review: bool,

    /// Directory for the CSV and JSON files
    #[arg(long = "output_dir", default_value = "output")]
    output_dir: PathBuf,

    /// Optional settings file overriding the fetch policy
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// The main entry point of the application.
///
/// Configuration problems exit with status 2, every other failure with status 1.
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<ScraperError>() {
                Some(ScraperError::ConfigurationError(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = ScrapeConfig::new(
        &args.locale,
        args.keywords,
        args.url,
        args.proxy_api_key,
        args.pages,
        args.review,
        args.output_dir,
    )?;
    let fetch_config = FetchConfig::load(args.config.as_deref())?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let start_time = Instant::now();
    let search_engine = SearchEngine::new(config, fetch_config)?;
    let summary = search_engine.run().await?;
    let elapsed = start_time.elapsed();

    println!("\n=== Scrape Summary ===");
    println!("Started: {}", summary.started_at.to_rfc3339());
    println!("Processing time: {:.2?}", elapsed);
    println!(
        "Pages scraped: {} of {}",
        summary.pages_attempted - summary.pages_failed,
        summary.pages_attempted
    );
    println!("Products: {}", summary.products);
    if search_engine.config().review_enabled {
        println!("Products with reviews: {}", summary.reviews);
    }
    println!("Output: {}", search_engine.config().output_dir.display());

    Ok(())
}
