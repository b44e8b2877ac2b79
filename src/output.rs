use crate::{ProductRecord, Result, ReviewRecord};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PRODUCTS_CSV: &str = "amazon_products.csv";
pub const PRODUCTS_JSON: &str = "amazon_products.json";
pub const REVIEWS_CSV: &str = "amazon_reviews.csv";
pub const REVIEWS_JSON: &str = "amazon_reviews.json";

const JSON_INDENT: &[u8] = b"    ";

struct ReviewStreams<W: Write> {
    csv: csv::Writer<W>,
    json: W,
}

/// The `RecordWriter` accumulates records and mirrors them into the output files.
///
/// Each pushed record becomes a CSV row immediately and is kept in memory; `finish`
/// writes the whole list as indented JSON. Every stream is opened up front and is
/// closed when the writer is dropped, on error paths too.
pub struct RecordWriter<W: Write> {
    products_csv: csv::Writer<W>,
    products_json: W,
    review_streams: Option<ReviewStreams<W>>,
    products: Vec<ProductRecord>,
    reviews: Vec<ReviewRecord>,
}

impl RecordWriter<BufWriter<File>> {
    /// Creates the product files, and the review files when `reviews_enabled`, in `dir`.
    pub fn create(dir: &Path, reviews_enabled: bool) -> Result<Self> {
        let open = |name: &str| -> Result<BufWriter<File>> {
            let path: PathBuf = dir.join(name);
            debug!("Opening {}", path.display());
            Ok(BufWriter::new(File::create(path)?))
        };

        let review_streams = if reviews_enabled {
            Some((open(REVIEWS_CSV)?, open(REVIEWS_JSON)?))
        } else {
            None
        };

        Self::new(open(PRODUCTS_CSV)?, open(PRODUCTS_JSON)?, review_streams)
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wraps already opened streams and writes the CSV headers.
    pub fn new(products_csv: W, products_json: W, review_streams: Option<(W, W)>) -> Result<Self> {
        let mut products_csv = csv::Writer::from_writer(products_csv);
        products_csv.write_record(ProductRecord::CSV_HEADER)?;
        products_csv.flush()?;

        let review_streams = match review_streams {
            Some((csv_out, json)) => {
                let mut csv = csv::Writer::from_writer(csv_out);
                csv.write_record(ReviewRecord::CSV_HEADER)?;
                csv.flush()?;
                Some(ReviewStreams { csv, json })
            }
            None => None,
        };

        Ok(Self {
            products_csv,
            products_json,
            review_streams,
            products: Vec::new(),
            reviews: Vec::new(),
        })
    }

    pub fn push_product(&mut self, product: ProductRecord) -> Result<()> {
        self.products_csv.write_record(product.to_csv_record())?;
        self.products_csv.flush()?;
        self.products.push(product);
        Ok(())
    }

    /// Records reviews for a product. Ignored when review output was not opened.
    pub fn push_review(&mut self, review: ReviewRecord) -> Result<()> {
        let Some(streams) = self.review_streams.as_mut() else {
            debug!("Review output disabled; dropping reviews for {}", review.asin);
            return Ok(());
        };

        streams.csv.write_record(review.to_csv_record())?;
        streams.csv.flush()?;
        self.reviews.push(review);
        Ok(())
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        &self.reviews
    }

    /// Writes the JSON documents, flushes every stream and hands back the records.
    pub fn finish(mut self) -> Result<(Vec<ProductRecord>, Vec<ReviewRecord>)> {
        write_json(&mut self.products_json, &self.products)?;
        self.products_csv.flush()?;

        if let Some(streams) = self.review_streams.as_mut() {
            write_json(&mut streams.json, &self.reviews)?;
            streams.csv.flush()?;
        }

        info!(
            "Wrote {} products and {} reviews",
            self.products.len(),
            self.reviews.len()
        );
        Ok((self.products, self.reviews))
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(JSON_INDENT));
    value.serialize(&mut serializer)?;
    out.flush()?;
    Ok(())
}
