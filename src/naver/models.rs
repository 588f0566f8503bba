// src/naver/models.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DISPLAY: usize = 10;
pub const MAX_DISPLAY: usize = 100;

// Optional sign and leading digits; whatever follows is ignored
static LEADING_INT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?)(\d+)").expect("Failed to compile LEADING_INT_RE")
});

/// One row of the stock news listing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub stock_code: String,
    pub article_id: String,
    pub office_id: String,
    pub title: String,
    pub provider: Option<String>,
    pub published_at: Option<String>, // "YYYY-MM-DD HH:MM:SS"
    pub origin_url: String,
    pub cluster_id: Option<String>,
    pub is_relation_head: bool,
}

/// Full article as read from the standalone news page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub article_id: String,
    pub office_id: String,
    pub title: String,
    pub provider: Option<String>,
    pub published_at: Option<String>,
    pub content: String,
    pub images: Vec<String>,
    pub origin_url: String,
    pub actual_url: String,
    #[serde(rename = "crawledAt")]
    pub crawled_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResult {
    pub method: String,
    pub stock_code: String,
    pub page: u32,
    pub display: usize,
    pub total_crawled: usize,
    pub articles: Vec<ArticleSummary>,
    pub source_url: String,
    pub crawled_at: String,
}

/// Caller input for a listing crawl.
#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub stock_code: String,
    /// Requested row limit; `None` or zero falls back to the default before clamping.
    pub display: Option<i64>,
    pub page: u32,
}

impl ListingRequest {
    pub fn new(stock_code: impl Into<String>) -> Self {
        Self {
            stock_code: stock_code.into(),
            display: None,
            page: 1,
        }
    }

    pub fn display(mut self, display: i64) -> Self {
        self.display = Some(display);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// The limit actually applied, always within [1, MAX_DISPLAY].
    pub fn effective_display(&self) -> usize {
        effective_display(self.display)
    }
}

/// Unparsable or zero requests become the default, the rest is clamped.
pub fn effective_display(requested: Option<i64>) -> usize {
    let requested = match requested {
        Some(n) if n != 0 => n,
        _ => DEFAULT_DISPLAY as i64,
    };
    requested.clamp(1, MAX_DISPLAY as i64) as usize
}

/// Reads the leading integer of a free-text display value: `"5.7"` is 5, `"20abc"` is 20.
/// Text without leading digits is `None`; out-of-range numbers saturate.
pub fn parse_display(raw: &str) -> Option<i64> {
    let caps = LEADING_INT_RE.captures(raw)?;
    let negative = &caps[1] == "-";
    let value = caps[2].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// The `{office_id, article_id}` pair identifying one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleIds {
    pub article_id: String,
    pub office_id: String,
}

impl ArticleIds {
    pub fn new(office_id: impl Into<String>, article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            office_id: office_id.into(),
        }
    }
}
