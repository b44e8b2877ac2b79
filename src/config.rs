use crate::{Result, ScraperError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// The Amazon marketplaces the scraper knows how to address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    Com,
    #[default]
    CoUk,
    De,
    Fr,
    It,
    Es,
    Ca,
    CoJp,
    In,
    ComAu,
}

impl Locale {
    pub const ALL: [Locale; 10] = [
        Locale::Com,
        Locale::CoUk,
        Locale::De,
        Locale::Fr,
        Locale::It,
        Locale::Es,
        Locale::Ca,
        Locale::CoJp,
        Locale::In,
        Locale::ComAu,
    ];

    /// The top-level domain suffix, e.g. `co.uk`.
    pub fn domain(&self) -> &'static str {
        match self {
            Locale::Com => "com",
            Locale::CoUk => "co.uk",
            Locale::De => "de",
            Locale::Fr => "fr",
            Locale::It => "it",
            Locale::Es => "es",
            Locale::Ca => "ca",
            Locale::CoJp => "co.jp",
            Locale::In => "in",
            Locale::ComAu => "com.au",
        }
    }

    /// The marketplace root, e.g. `https://www.amazon.co.uk`.
    pub fn base_url(&self) -> String {
        format!("https://www.amazon.{}", self.domain())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}

impl FromStr for Locale {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self> {
        Locale::ALL
            .into_iter()
            .find(|locale| locale.domain() == s)
            .ok_or_else(|| {
                let supported = Locale::ALL.map(|l| l.domain()).join(", ");
                ScraperError::ConfigurationError(format!(
                    "unsupported locale '{}' (expected one of: {})",
                    s, supported
                ))
            })
    }
}

/// What the run searches: a keyword query, or a caller supplied listing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    Keyword(String),
    Url(String),
}

/// The validated settings for one scraping run. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub locale: Locale,
    pub target: SearchTarget,
    pub api_key: String,
    pub pages: u32,
    pub review_enabled: bool,
    pub output_dir: PathBuf,
}

impl ScrapeConfig {
    /// Validates raw invocation parameters.
    ///
    /// # Errors
    ///
    /// Returns `ScraperError::ConfigurationError` for an unknown locale, when neither or
    /// both of `keyword` and `url` are given, when `api_key` is missing or blank, or when
    /// `pages` is zero.
    pub fn new(
        locale: &str,
        keyword: Option<String>,
        url: Option<String>,
        api_key: Option<String>,
        pages: u32,
        review_enabled: bool,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let locale = locale.parse::<Locale>()?;

        let keyword = keyword.filter(|k| !k.trim().is_empty());
        let url = url.filter(|u| !u.trim().is_empty());
        let target = match (keyword, url) {
            (Some(keyword), None) => SearchTarget::Keyword(keyword),
            (None, Some(url)) => SearchTarget::Url(url),
            (Some(_), Some(_)) => {
                return Err(ScraperError::ConfigurationError(
                    "supply either a keyword or a url, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ScraperError::ConfigurationError(
                    "either a keyword or a url is required".to_string(),
                ))
            }
        };

        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ScraperError::ConfigurationError("a proxy API key is required".to_string())
            })?;

        if pages == 0 {
            return Err(ScraperError::ConfigurationError(
                "pages must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            locale,
            target,
            api_key,
            pages,
            review_enabled,
            output_dir: output_dir.into(),
        })
    }
}

/// The `FetchConfig` struct holds the request policy handed to the fetcher.
/// It covers the timeout, the retry bound, the pre-request delay, the backoff step,
/// the user agent pool and the proxy endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// The timeout for a single attempt.
    pub timeout: Duration,
    /// Retries allowed after the first failed attempt.
    pub max_retries: u32,
    /// Delay applied before every attempt, retries included.
    pub request_delay: Duration,
    /// Retry `n` waits `n * backoff_step`.
    pub backoff_step: Duration,
    /// User agents; one is picked at random per attempt.
    pub user_agents: Vec<String>,
    /// The proxy API that relays requests to the marketplace.
    pub proxy_endpoint: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: crate::DEFAULT_TIMEOUT,
            max_retries: crate::DEFAULT_MAX_RETRIES,
            request_delay: crate::DEFAULT_REQUEST_DELAY,
            backoff_step: crate::DEFAULT_BACKOFF_STEP,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            proxy_endpoint: crate::DEFAULT_PROXY_ENDPOINT.to_string(),
        }
    }
}

/// Flat, serde friendly view of `FetchConfig` used for file and environment overrides.
#[derive(Debug, Deserialize)]
struct FetchSettings {
    timeout_secs: u64,
    max_retries: u32,
    request_delay_ms: u64,
    backoff_step_secs: u64,
    proxy_endpoint: String,
    #[serde(default)]
    user_agents: Vec<String>,
}

impl FetchConfig {
    /// Loads the fetch policy: defaults, then an optional settings file, then
    /// `AMAZON_SCRAPER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let environment = ::config::Environment::with_prefix("AMAZON_SCRAPER")
            .try_parsing(true)
            .list_separator("|")
            .with_list_parse_key("user_agents");

        Self::from_sources(path, Some(environment))
    }

    fn from_sources(
        path: Option<&Path>,
        environment: Option<::config::Environment>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = ::config::Config::builder()
            .set_default("timeout_secs", defaults.timeout.as_secs() as i64)?
            .set_default("max_retries", i64::from(defaults.max_retries))?
            .set_default("request_delay_ms", defaults.request_delay.as_millis() as i64)?
            .set_default("backoff_step_secs", defaults.backoff_step.as_secs() as i64)?
            .set_default("proxy_endpoint", defaults.proxy_endpoint.clone())?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        if let Some(environment) = environment {
            builder = builder.add_source(environment);
        }

        let settings: FetchSettings = builder.build()?.try_deserialize()?;

        Ok(Self::from_settings(settings, defaults.user_agents))
    }

    fn from_settings(settings: FetchSettings, default_agents: Vec<String>) -> Self {
        let user_agents = if settings.user_agents.is_empty() {
            default_agents
        } else {
            settings.user_agents
        };

        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            request_delay: Duration::from_millis(settings.request_delay_ms),
            backoff_step: Duration::from_secs(settings.backoff_step_secs),
            user_agents,
            proxy_endpoint: settings.proxy_endpoint,
        }
    }
}

const DEFAULT_USER_AGENTS: [&str; 20] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:61.0) Gecko/20100101 Firefox/61.0",
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.113 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/63.0.3239.132 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) AppleWebKit/601.7.7 (KHTML, like Gecko) Version/9.1.2 Safari/601.7.7",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/67.0.3396.99 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2227.1 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/64.0.3282.140 Safari/537.36 Edge/17.17134",
    "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/47.0.2526.111 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:40.0) Gecko/20100101 Firefox/40.1",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:54.0) Gecko/20100101 Firefox/54.0",
    "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:54.0) Gecko/20100101 Firefox/54.0",
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/67.0.3396.99 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/68.0.3440.106 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/68.0.3440.106 Safari/537.36",
    "Mozilla/5.0 (Windows NT 5.1; rv:7.0.1) Gecko/20100101 Firefox/7.0.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/64.0.3282.140 Safari/537.36 Edge/17.17134",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:62.0) Gecko/20100101 Firefox/62.0",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn build(locale: &str, keyword: Option<&str>, url: Option<&str>) -> Result<ScrapeConfig> {
        ScrapeConfig::new(
            locale,
            keyword.map(String::from),
            url.map(String::from),
            Some("key".to_string()),
            1,
            false,
            "output",
        )
    }

    #[test]
    fn test_every_locale_round_trips_through_its_domain() {
        for locale in Locale::ALL {
            assert_eq!(locale.domain().parse::<Locale>().unwrap(), locale);
        }
        assert_eq!(Locale::default().base_url(), "https://www.amazon.co.uk");
    }

    #[test]
    fn test_unknown_locale_is_rejected() {
        let err = build("xyz", Some("laptop"), None).unwrap_err();
        assert!(matches!(err, ScraperError::ConfigurationError(_)));
    }

    #[test]
    fn test_exactly_one_search_target_is_required() {
        assert!(matches!(
            build("com", None, None),
            Err(ScraperError::ConfigurationError(_))
        ));
        assert!(matches!(
            build("com", Some("laptop"), Some("https://www.amazon.com/s?k=laptop")),
            Err(ScraperError::ConfigurationError(_))
        ));

        let config = build("com", Some("laptop"), None).unwrap();
        assert_eq!(config.target, SearchTarget::Keyword("laptop".to_string()));

        let config = build("com", None, Some("https://www.amazon.com/s?k=laptop")).unwrap();
        assert_eq!(
            config.target,
            SearchTarget::Url("https://www.amazon.com/s?k=laptop".to_string())
        );
    }

    #[test]
    fn test_missing_api_key_and_zero_pages_are_rejected() {
        let missing_key = ScrapeConfig::new("de", Some("x".into()), None, None, 1, false, "out");
        assert!(matches!(missing_key, Err(ScraperError::ConfigurationError(_))));

        let blank_key =
            ScrapeConfig::new("de", Some("x".into()), None, Some("  ".into()), 1, false, "out");
        assert!(matches!(blank_key, Err(ScraperError::ConfigurationError(_))));

        let zero_pages =
            ScrapeConfig::new("de", Some("x".into()), None, Some("k".into()), 0, false, "out");
        assert!(matches!(zero_pages, Err(ScraperError::ConfigurationError(_))));
    }

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_step, Duration::from_secs(2));
        assert_eq!(config.user_agents.len(), 20);
    }

    #[test]
    fn test_fetch_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.toml");
        std::fs::write(
            &path,
            "max_retries = 5\nrequest_delay_ms = 0\nproxy_endpoint = \"http://localhost:9999\"\n",
        )
        .unwrap();

        let config = FetchConfig::from_sources(Some(&path), None).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.proxy_endpoint, "http://localhost:9999");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.user_agents.len(), 20);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.toml");
        std::fs::write(&path, "max_retries = 5\nbackoff_step_secs = 1\n").unwrap();

        let source: ::config::Map<String, String> = [
            ("TESTFETCH_MAX_RETRIES", "1"),
            ("TESTFETCH_USER_AGENTS", "agent-a|agent-b"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let environment = ::config::Environment::with_prefix("TESTFETCH")
            .try_parsing(true)
            .list_separator("|")
            .with_list_parse_key("user_agents")
            .source(Some(source));

        let config = FetchConfig::from_sources(Some(&path), Some(environment)).unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.backoff_step, Duration::from_secs(1));
        assert_eq!(config.user_agents, vec!["agent-a", "agent-b"]);
    }
}
