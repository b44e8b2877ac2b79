//! Request URL construction for the proxy API.
//!
//! The marketplace URL is embedded verbatim in the proxy query string. Keywords only
//! get spaces turned into `+`; nothing else is escaped, so callers must not pass
//! control characters or stray `&`.

use crate::config::{Locale, SearchTarget};

/// Builds every URL a run needs from the locale, search target and proxy credentials.
#[derive(Debug, Clone)]
pub struct ProxyEndpoint {
    proxy: String,
    api_key: String,
    locale: Locale,
    base_query: String,
}

impl ProxyEndpoint {
    pub fn new(proxy: &str, api_key: &str, locale: Locale, target: &SearchTarget) -> Self {
        let target_url = match target {
            SearchTarget::Keyword(keyword) => {
                format!("{}/s?k={}", locale.base_url(), encode_keyword(keyword))
            }
            SearchTarget::Url(url) => url.clone(),
        };

        let proxy = proxy.trim_end_matches('/').to_string();
        let base_query = proxied(&proxy, api_key, &target_url);

        Self {
            proxy,
            api_key: api_key.to_string(),
            locale,
            base_query,
        }
    }

    /// The proxied search URL for a 1-based page index.
    pub fn page_url(&self, page: u32) -> String {
        format!("{}&page={}", self.base_query, page)
    }

    /// The proxied review listing for one product.
    pub fn review_url(&self, asin: &str) -> String {
        let target = format!("{}/product-reviews/{}", self.locale.base_url(), asin);
        proxied(&self.proxy, &self.api_key, &target)
    }
}

fn proxied(proxy: &str, api_key: &str, target: &str) -> String {
    format!("{}?api_key={}&url={}", proxy, api_key, target)
}

/// Spaces become `+`, everything else is passed through untouched.
pub fn encode_keyword(keyword: &str) -> String {
    keyword.replace(' ', "+")
}

/// Masks the `api_key` query value so URLs can be logged.
pub fn redact(url: &str) -> String {
    match url.split_once("api_key=") {
        Some((head, tail)) => {
            let rest = tail.find('&').map(|i| &tail[i..]).unwrap_or("");
            format!("{}api_key=***{}", head, rest)
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY: &str = "http://api.scraperapi.com";

    #[test]
    fn test_keyword_query() {
        let endpoint = ProxyEndpoint::new(
            PROXY,
            "secret",
            Locale::CoUk,
            &SearchTarget::Keyword("usb c cable".to_string()),
        );

        assert_eq!(
            endpoint.page_url(3),
            "http://api.scraperapi.com?api_key=secret&url=https://www.amazon.co.uk/s?k=usb+c+cable&page=3"
        );
    }

    #[test]
    fn test_seed_url_is_embedded_verbatim() {
        let seed = "https://www.amazon.de/s?k=kabel&i=electronics";
        let endpoint = ProxyEndpoint::new(
            "http://localhost:8080/",
            "k",
            Locale::De,
            &SearchTarget::Url(seed.to_string()),
        );

        assert_eq!(
            endpoint.page_url(1),
            format!("http://localhost:8080?api_key=k&url={}&page=1", seed)
        );
    }

    #[test]
    fn test_review_url() {
        let endpoint = ProxyEndpoint::new(
            PROXY,
            "k",
            Locale::Com,
            &SearchTarget::Keyword("x".to_string()),
        );

        assert_eq!(
            endpoint.review_url("B001XYZ"),
            "http://api.scraperapi.com?api_key=k&url=https://www.amazon.com/product-reviews/B001XYZ"
        );
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("http://p?api_key=secret&url=https://a/s?k=x&page=2"),
            "http://p?api_key=***&url=https://a/s?k=x&page=2"
        );
        assert_eq!(redact("http://p?api_key=secret"), "http://p?api_key=***");
        assert_eq!(redact("http://p/plain"), "http://p/plain");
    }
}
