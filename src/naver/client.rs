// src/naver/client.rs
use crate::naver::models::ArticleIds;
use crate::utils::error::CrawlError;
use reqwest::header;
use url::form_urlencoded;

pub const DEFAULT_FINANCE_BASE_URL: &str = "https://finance.naver.com";
pub const DEFAULT_NEWS_BASE_URL: &str = "https://n.news.naver.com";
// The finance site serves empty tables to non-browser agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where and as whom the crawler fetches. Built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub finance_base_url: String,
    pub news_base_url: String,
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            finance_base_url: DEFAULT_FINANCE_BASE_URL.to_string(),
            news_base_url: DEFAULT_NEWS_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP access to the finance listing and news article pages.
#[derive(Debug, Clone)]
pub struct NaverClient {
    http: reqwest::Client,
    config: CrawlerConfig,
}

impl NaverClient {
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { http, config })
    }

    /// The news listing page (iframe content) for one stock and page.
    pub fn listing_url(&self, stock_code: &str, page: u32) -> String {
        format!(
            "{}/item/news_news.naver?code={}&page={}&sm=title_entity_id.basic&clusterId=",
            self.finance_base(),
            encode(stock_code),
            page
        )
    }

    /// The stock's news overview page, sent as referer for the listing fetch.
    pub fn overview_url(&self, stock_code: &str) -> String {
        format!("{}/item/news.naver?code={}", self.finance_base(), encode(stock_code))
    }

    /// Direct article URL, bypassing the finance site's redirect.
    pub fn article_url(&self, ids: &ArticleIds) -> String {
        format!(
            "{}/mnews/article/{}/{}",
            self.config.news_base_url.trim_end_matches('/'),
            ids.office_id,
            ids.article_id
        )
    }

    pub fn finance_base(&self) -> &str {
        self.config.finance_base_url.trim_end_matches('/')
    }

    /// Downloads a listing page as raw bytes; the body is EUC-KR and must not go through a text decoder here.
    pub async fn fetch_listing(&self, stock_code: &str, page: u32) -> Result<Vec<u8>, CrawlError> {
        let url = self.listing_url(stock_code, page);
        tracing::info!("Fetching listing page: {}", url);

        let response = self.http.get(&url)
            .header(header::REFERER, self.overview_url(stock_code))
            .send()
            .await?; // Propagates reqwest::Error as CrawlError::NetworkUnreachable

        let response = ensure_success(response, &url).await?;
        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);

        Ok(body.to_vec())
    }

    /// Downloads an article page; this host serves UTF-8.
    pub async fn fetch_article(&self, url: &str) -> Result<String, CrawlError> {
        tracing::info!("Fetching article page: {}", url);

        let response = self.http.get(url)
            .header(header::REFERER, format!("{}/", self.finance_base()))
            .send()
            .await?;

        let response = ensure_success(response, url).await?;
        let body = response.text().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);

        Ok(body)
    }
}

/// Turns a non-2xx response into `UpstreamFetchFailed`, keeping the body when one can be read.
async fn ensure_success(response: reqwest::Response, url: &str) -> Result<reqwest::Response, CrawlError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::error!("HTTP error status: {} for URL: {}", status, url);
    if status == reqwest::StatusCode::FORBIDDEN {
        tracing::warn!("Received 403 Forbidden - check User-Agent and Referer headers.");
    }

    let body = match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => Some(String::from_utf8_lossy(&bytes).into_owned()),
        _ => None,
    };
    Err(CrawlError::UpstreamFetchFailed { status, body })
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
