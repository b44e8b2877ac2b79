use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One product scraped from a search result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "product_name")]
    pub name: String,
    #[serde(rename = "product_images")]
    pub images: Vec<String>,
    /// Raw display text, e.g. `1,204`.
    #[serde(rename = "number_of_reviews")]
    pub review_count: String,
    /// Raw display text, e.g. `£19.99`.
    pub price: String,
    pub product_url: String,
    /// Empty when `product_url` has no `/dp/` segment.
    pub asin: String,
}

impl ProductRecord {
    pub const CSV_HEADER: [&'static str; 6] = [
        "product_name",
        "product_images",
        "number_of_reviews",
        "price",
        "product_url",
        "asin",
    ];

    /// The tabular row; images collapse into one `", "` joined cell.
    pub fn to_csv_record(&self) -> [String; 6] {
        [
            self.name.clone(),
            self.images.join(", "),
            self.review_count.clone(),
            self.price.clone(),
            self.product_url.clone(),
            self.asin.clone(),
        ]
    }
}

/// Review bodies collected for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub product_name: String,
    #[serde(rename = "product_reviews")]
    pub reviews: Vec<String>,
    pub product_url: String,
    pub asin: String,
}

impl ReviewRecord {
    pub const CSV_HEADER: [&'static str; 4] =
        ["product_name", "product_reviews", "product_url", "asin"];

    pub fn for_product(product: &ProductRecord, reviews: Vec<String>) -> Self {
        Self {
            product_name: product.name.clone(),
            reviews,
            product_url: product.product_url.clone(),
            asin: product.asin.clone(),
        }
    }

    pub fn to_csv_record(&self) -> [String; 4] {
        [
            self.product_name.clone(),
            self.reviews.join(", "),
            self.product_url.clone(),
            self.asin.clone(),
        ]
    }
}

/// Counters for one run, kept for the audit log.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_attempted: u32,
    pub pages_failed: u32,
    pub products: usize,
    pub reviews: usize,
}
