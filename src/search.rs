use crate::endpoint::ProxyEndpoint;
use crate::fetch::Fetcher;
use crate::output::RecordWriter;
use crate::scraper::ProductScraper;
use crate::{FetchConfig, ProductRecord, Result, ReviewRecord, RunSummary, ScrapeConfig};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use tracing::{debug, info, instrument, warn};

/// The `SearchEngine` walks the search result pages of one run.
///
/// Pages are fetched strictly in order `1..=pages`. Products are handled in document
/// order, and when reviews are enabled a product's reviews are fetched before the next
/// product is written. A page whose fetch fails contributes nothing; the run goes on.
pub struct SearchEngine {
    /// The fetcher shared by page and review requests.
    fetcher: Fetcher,
    /// The markup extractor.
    scraper: ProductScraper,
    /// The URL builder for this run.
    endpoint: ProxyEndpoint,
    /// The validated run settings.
    config: ScrapeConfig,
}

impl SearchEngine {
    /// Creates a new `SearchEngine` for the given run and fetch policy.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `SearchEngine` instance, or an error if the client could not be created.
    pub fn new(config: ScrapeConfig, fetch_config: FetchConfig) -> Result<Self> {
        let endpoint = ProxyEndpoint::new(
            &fetch_config.proxy_endpoint,
            &config.api_key,
            config.locale,
            &config.target,
        );

        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            scraper: ProductScraper::default(),
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Runs the whole scrape into the configured output directory.
    pub async fn run(&self) -> Result<RunSummary> {
        let writer = RecordWriter::create(&self.config.output_dir, self.config.review_enabled)?;
        self.run_with(writer).await
    }

    /// Runs the whole scrape into an already opened writer.
    pub async fn run_with<W: Write>(&self, mut writer: RecordWriter<W>) -> Result<RunSummary> {
        let started_at = Utc::now();
        info!(
            "Scraping {} page(s) from amazon.{} (reviews: {})",
            self.config.pages, self.config.locale, self.config.review_enabled
        );

        let progress = ProgressBar::new(u64::from(self.config.pages));
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut pages_failed = 0;
        for page in 1..=self.config.pages {
            progress.set_message(format!("page {}", page));

            match self.scrape_page(page).await {
                Some(products) => {
                    info!("Page {}: {} products", page, products.len());
                    for product in products {
                        self.record_product(&mut writer, product).await?;
                    }
                }
                None => pages_failed += 1,
            }

            progress.inc(1);
        }

        progress.finish_with_message(format!(
            "{} products from {} page(s)",
            writer.products().len(),
            self.config.pages
        ));

        let (products, reviews) = writer.finish()?;
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            pages_attempted: self.config.pages,
            pages_failed,
            products: products.len(),
            reviews: reviews.len(),
        };

        info!(
            "Run finished: {} products, {} reviews, {}/{} pages failed",
            summary.products, summary.reviews, summary.pages_failed, summary.pages_attempted
        );
        Ok(summary)
    }

    /// Fetches and parses one search page. `None` means the fetch gave up.
    #[instrument(skip(self))]
    pub async fn scrape_page(&self, page: u32) -> Option<Vec<ProductRecord>> {
        let url = self.endpoint.page_url(page);

        match self.fetcher.fetch(&url).await {
            Ok(html) => Some(self.scraper.extract_products(&html, self.config.locale)),
            Err(e) => {
                warn!("Skipping page {}: {}", page, e);
                None
            }
        }
    }

    /// Fetches the review listing for `asin`. Any failure yields no reviews.
    #[instrument(skip(self))]
    pub async fn extract_reviews(&self, asin: &str) -> Vec<String> {
        let url = self.endpoint.review_url(asin);

        match self.fetcher.fetch(&url).await {
            Ok(html) => {
                let reviews = self.scraper.extract_reviews(&html);
                debug!("Found {} reviews", reviews.len());
                reviews
            }
            Err(e) => {
                warn!("No reviews for {}: {}", asin, e);
                Vec::new()
            }
        }
    }

    async fn record_product<W: Write>(
        &self,
        writer: &mut RecordWriter<W>,
        product: ProductRecord,
    ) -> Result<()> {
        let review = if self.config.review_enabled && !product.asin.is_empty() {
            let reviews = self.extract_reviews(&product.asin).await;
            (!reviews.is_empty()).then(|| ReviewRecord::for_product(&product, reviews))
        } else {
            None
        };

        writer.push_product(product)?;
        if let Some(review) = review {
            writer.push_review(review)?;
        }
        Ok(())
    }
}
