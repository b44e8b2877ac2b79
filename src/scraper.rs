use crate::{Locale, ProductRecord, Result, ScraperError};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

/// CSS selectors for the marketplace's search and review markup.
#[derive(Debug, Clone)]
pub struct ProductSelectors<'a> {
    pub container: &'a str,
    /// Tried in order; the first match wins.
    pub name: Vec<&'a str>,
    pub images: &'a str,
    pub review_count: &'a str,
    pub price: &'a str,
    pub link: &'a str,
    pub review_body: &'a str,
}

impl Default for ProductSelectors<'static> {
    fn default() -> Self {
        Self {
            container: "div.sg-col-inner",
            name: vec![
                "span.a-size-medium.a-color-base.a-text-normal",
                "span.a-size-base-plus.a-color-base.a-text-normal",
            ],
            images: "img.s-image",
            review_count: "span.a-size-base",
            price: "span.a-offscreen",
            link: "a.a-link-normal",
            review_body: "span[data-hook='review-body']",
        }
    }
}

/// The `ProductScraper` struct turns search and review pages into records.
/// Every field is looked up independently; only the product name is mandatory.
pub struct ProductScraper {
    container: Option<Selector>,
    name: Vec<Selector>,
    images: Option<Selector>,
    review_count: Option<Selector>,
    price: Option<Selector>,
    link: Option<Selector>,
    review_body: Option<Selector>,
}

impl Default for ProductScraper {
    fn default() -> Self {
        Self::new(&ProductSelectors::default())
    }
}

impl ProductScraper {
    /// Compiles the given selectors. A selector that fails to parse is logged and
    /// behaves as if it never matched.
    pub fn new(selectors: &ProductSelectors<'_>) -> Self {
        Self {
            container: compile(selectors.container),
            name: selectors.name.iter().filter_map(|s| compile(s)).collect(),
            images: compile(selectors.images),
            review_count: compile(selectors.review_count),
            price: compile(selectors.price),
            link: compile(selectors.link),
            review_body: compile(selectors.review_body),
        }
    }

    /// Extracts every product on a search result page, in document order.
    #[instrument(skip(self, html), fields(html_length = html.len()))]
    pub fn extract_products(&self, html: &str, locale: Locale) -> Vec<ProductRecord> {
        let Some(container) = &self.container else {
            return Vec::new();
        };

        let document = Html::parse_document(html);
        let base = Url::parse(&locale.base_url()).ok();

        let products: Vec<ProductRecord> = document
            .select(container)
            .filter_map(|element| self.extract_product(element, base.as_ref()))
            .collect();

        debug!("Extracted {} products", products.len());
        products
    }

    /// Extracts one product container. Returns `None` when the container is skipped.
    pub fn extract_product(
        &self,
        container: ElementRef<'_>,
        base: Option<&Url>,
    ) -> Option<ProductRecord> {
        match self.try_extract_product(container, base) {
            Ok(product) => Some(product),
            Err(e) => {
                debug!("Skipping product container: {}", e);
                None
            }
        }
    }

    fn try_extract_product(
        &self,
        container: ElementRef<'_>,
        base: Option<&Url>,
    ) -> Result<ProductRecord> {
        let name = self
            .name
            .iter()
            .find_map(|selector| first_text(container, selector))
            .ok_or_else(|| ScraperError::ExtractionError("no product name".to_string()))?;

        let images = self
            .images
            .as_ref()
            .map(|selector| all_attrs(container, selector, "src"))
            .unwrap_or_default();

        let review_count = self
            .review_count
            .as_ref()
            .and_then(|selector| first_text(container, selector))
            .unwrap_or_default();

        let price = self
            .price
            .as_ref()
            .and_then(|selector| first_text(container, selector))
            .unwrap_or_default();

        let product_url = self
            .link
            .as_ref()
            .and_then(|selector| first_attr(container, selector, "href"))
            .and_then(|href| resolve_url(base?, &href))
            .unwrap_or_default();

        let asin = asin_from_url(&product_url);

        Ok(ProductRecord {
            name,
            images,
            review_count,
            price,
            product_url,
            asin,
        })
    }

    /// Collects the trimmed, non-empty review bodies of a review listing page.
    #[instrument(skip(self, html), fields(html_length = html.len()))]
    pub fn extract_reviews(&self, html: &str) -> Vec<String> {
        let Some(selector) = &self.review_body else {
            return Vec::new();
        };

        let document = Html::parse_document(html);
        document
            .select(selector)
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect()
    }
}

fn compile(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Ignoring invalid selector '{}': {}", selector, e);
            None
        }
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>())
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(str::to_string)
}

fn all_attrs(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Vec<String> {
    scope
        .select(selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

/// Resolves a (usually relative) link against the marketplace root.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|url| url.to_string())
}

/// The path segment right after `/dp/`, or an empty string when there is none.
///
/// Localised or redirected URL shapes are not recognised and also yield "".
pub fn asin_from_url(product_url: &str) -> String {
    product_url
        .split_once("/dp/")
        .and_then(|(_, rest)| rest.split('/').next())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
            <div class="sg-col-inner">
                <span class="a-size-medium a-color-base a-text-normal">Widget Pro</span>
                <img class="s-image" src="https://m.media-amazon.com/images/I/1.jpg">
                <img class="s-image" src="https://m.media-amazon.com/images/I/2.jpg">
                <span class="a-size-base">1,204</span>
                <span class="a-price"><span class="a-offscreen">£19.99</span></span>
                <a class="a-link-normal" href="/Widget-Pro/dp/B001XYZ/ref=sr_1_1">Widget Pro</a>
            </div>
            <div class="sg-col-inner">
                <span class="a-size-base">12</span>
                <a class="a-link-normal" href="/Nameless/dp/B00NONAME/">Nameless</a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_named_products_only() {
        let scraper = ProductScraper::default();
        let products = scraper.extract_products(SEARCH_PAGE, Locale::CoUk);

        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert_eq!(product.name, "Widget Pro");
        assert_eq!(product.images.len(), 2);
        assert_eq!(product.review_count, "1,204");
        assert_eq!(product.price, "£19.99");
        assert_eq!(
            product.product_url,
            "https://www.amazon.co.uk/Widget-Pro/dp/B001XYZ/ref=sr_1_1"
        );
        assert_eq!(product.asin, "B001XYZ");
    }

    #[test]
    fn test_secondary_name_selector() {
        let html = r#"
            <div class="sg-col-inner">
                <span class="a-size-base-plus a-color-base a-text-normal">Grid Item</span>
            </div>
        "#;

        let products = ProductScraper::default().extract_products(html, Locale::Com);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Grid Item");
    }

    #[test]
    fn test_missing_optional_fields_default_to_empty() {
        let html = r#"
            <div class="sg-col-inner">
                <span class="a-size-medium a-color-base a-text-normal">Bare</span>
            </div>
        "#;

        let products = ProductScraper::default().extract_products(html, Locale::De);
        let product = &products[0];
        assert!(product.images.is_empty());
        assert_eq!(product.review_count, "");
        assert_eq!(product.price, "");
        assert_eq!(product.product_url, "");
        assert_eq!(product.asin, "");
    }

    #[test]
    fn test_link_without_dp_segment_has_no_asin() {
        let html = r#"
            <div class="sg-col-inner">
                <span class="a-size-medium a-color-base a-text-normal">Sponsored</span>
                <a class="a-link-normal" href="/sspa/click?ie=UTF8&spc=abc">Sponsored</a>
            </div>
        "#;

        let products = ProductScraper::default().extract_products(html, Locale::Com);
        assert!(products[0].product_url.starts_with("https://www.amazon.com/sspa/click"));
        assert_eq!(products[0].asin, "");
    }

    #[test]
    fn test_resolve_url_normalises_relative_and_keeps_absolute() {
        let base = Url::parse("https://www.amazon.com").unwrap();

        let encoded = resolve_url(&base, "/Café Mug/dp/B01 X/").unwrap();
        assert_eq!(encoded, "https://www.amazon.com/Caf%C3%A9%20Mug/dp/B01%20X/");
        assert_eq!(asin_from_url(&encoded), "B01%20X");

        assert_eq!(
            resolve_url(&base, "https://www.amazon.com/dp/B0ABS/").unwrap(),
            "https://www.amazon.com/dp/B0ABS/"
        );
    }

    #[test]
    fn test_asin_from_url() {
        assert_eq!(asin_from_url("https://www.amazon.com/x/dp/ABC123/ref=xyz"), "ABC123");
        assert_eq!(asin_from_url("https://www.amazon.com/dp/ABC123"), "ABC123");
        assert_eq!(asin_from_url("https://www.amazon.com/gp/product/ABC123"), "");
        assert_eq!(asin_from_url(""), "");
    }

    #[test]
    fn test_invalid_selector_is_treated_as_absent() {
        let selectors = ProductSelectors {
            price: "span[[",
            ..ProductSelectors::default()
        };
        let scraper = ProductScraper::new(&selectors);
        let products = scraper.extract_products(SEARCH_PAGE, Locale::CoUk);

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, "");
    }

    #[test]
    fn test_extract_reviews() {
        let html = r#"
            <div data-hook="review">
                <span data-hook="review-body">
                    <span>Works as described.</span>
                </span>
            </div>
            <div data-hook="review">
                <span data-hook="review-body">  Stopped working after a week.  </span>
            </div>
            <div data-hook="review"><span data-hook="review-body">   </span></div>
        "#;

        let reviews = ProductScraper::default().extract_reviews(html);
        assert_eq!(
            reviews,
            vec!["Works as described.", "Stopped working after a week."]
        );
    }
}
