use crate::error::{Result, ScanError};
use crate::robots::RobotsRules;
use crate::root::RootDescriptor;
use encoding_rs::Encoding;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ENCODING: &str = "utf-8";

/// HTTP client plus the fixed text encoding pages are assumed to use.
///
/// There is no charset negotiation: a body that does not decode cleanly under
/// the configured encoding is a fetch failure.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    encoding: &'static Encoding,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_TIMEOUT_SECS, DEFAULT_ENCODING)
    }

    pub fn with_options(timeout_secs: u64, encoding_label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(encoding_label.as_bytes())
            .ok_or_else(|| ScanError::UnknownEncoding(encoding_label.to_string()))?;

        let client = Client::builder()
            .user_agent(concat!(
                "Sitemapper/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/trapdoorsec/sitemapper)"
            ))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, encoding })
    }

    /// GET `url` and return its body as text.
    ///
    /// Non-success statuses are errors, as are bytes that are malformed in
    /// the configured encoding.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        self.decode(url, &bytes)
    }

    fn decode(&self, url: &str, bytes: &[u8]) -> Result<String> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| ScanError::DecodeError {
                url: url.to_string(),
                encoding: self.encoding.name(),
            })
    }

    /// Fetch and parse `robots.txt` from the root's origin.
    ///
    /// 401 and 403 disallow everything, any other error status allows
    /// everything. Transport failures are returned to the caller.
    pub async fn fetch_robots(&self, root: &RootDescriptor) -> Result<RobotsRules> {
        let robots_url = format!("{}/robots.txt", root.origin());
        info!("Reading {}", robots_url);

        let response = self.client.get(&robots_url).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!("{} answered {}, disallowing all", robots_url, status);
            return Ok(RobotsRules::disallow_all());
        }
        if !status.is_success() {
            debug!("{} answered {}, allowing all", robots_url, status);
            return Ok(RobotsRules::allow_all());
        }

        let bytes = response.bytes().await?;
        let text = self.decode(&robots_url, &bytes)?;
        Ok(RobotsRules::parse(&text))
    }
}
