// src/extractors/detail.rs

// --- Imports ---
use crate::extractors::fields::{extract_article_ids, normalize_date, trimmed_attr, trimmed_text};
use crate::naver::client::NaverClient;
use crate::naver::models::ArticleDetail;
use crate::utils::error::CrawlError;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html, Selector};
use url::Url;

// Image sources containing these are layout assets, not article photos
const IMAGE_EXCLUDE_MARKERS: &[&str] = &["blank.gif", "logo", "icon"];

// --- Extraction Strategies ---

/// One way of reading a field from an article page.
/// Fields are read by trying strategies in order; the first `Some` wins.
pub trait ExtractionStrategy: Send + Sync {
    fn describe(&self) -> &str;
    fn extract(&self, document: &Html) -> Option<String>;
}

/// Trimmed text of the first matching element that has any.
pub struct TextStrategy {
    css: &'static str,
    selector: Selector,
}

/// Trimmed attribute of the first matching element.
pub struct AttrStrategy {
    css: &'static str,
    selector: Selector,
    attr: &'static str,
}

impl TextStrategy {
    pub fn new(css: &'static str) -> Self {
        Self { css, selector: Selector::parse(css).expect("Failed to compile TextStrategy selector") }
    }
}

impl AttrStrategy {
    pub fn new(css: &'static str, attr: &'static str) -> Self {
        Self { css, selector: Selector::parse(css).expect("Failed to compile AttrStrategy selector"), attr }
    }
}

impl ExtractionStrategy for TextStrategy {
    fn describe(&self) -> &str {
        self.css
    }

    fn extract(&self, document: &Html) -> Option<String> {
        document.select(&self.selector).find_map(trimmed_text)
    }
}

impl ExtractionStrategy for AttrStrategy {
    fn describe(&self) -> &str {
        self.css
    }

    fn extract(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.selector).next()?;
        trimmed_attr(element, self.attr)
    }
}

type Strategies = Vec<Box<dyn ExtractionStrategy>>;

static TITLE_STRATEGIES: Lazy<Strategies> = Lazy::new(|| {
    let strategies: Strategies = vec![
        Box::new(TextStrategy::new("h2#title_area span")),
        Box::new(TextStrategy::new("h2.media_end_head_headline")),
        Box::new(TextStrategy::new(".newsct_article h2")),
    ];
    strategies
});

static PROVIDER_STRATEGIES: Lazy<Strategies> = Lazy::new(|| {
    let strategies: Strategies = vec![
        Box::new(AttrStrategy::new("img.media_end_head_top_logo_img", "alt")),
        Box::new(AttrStrategy::new(".media_end_head_top_logo img", "alt")),
        Box::new(AttrStrategy::new(".press_logo img", "alt")),
    ];
    strategies
});

static DATE_STRATEGIES: Lazy<Strategies> = Lazy::new(|| {
    let strategies: Strategies = vec![
        Box::new(AttrStrategy::new(".media_end_head_info_datestamp_time", "data-date-time")),
        Box::new(TextStrategy::new(".media_end_head_info time")),
        Box::new(TextStrategy::new(".article_info .t11")),
    ];
    strategies
});

// --- CSS Selectors (Lazy Static) ---
static BODY_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#dic_area", "article#dic_area", "#articeBody"]
        .iter()
        .map(|s| Selector::parse(s).expect("Failed to compile BODY_SELECTORS"))
        .collect()
});

// Sub-elements of the body that are not article text
static NOISE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, .ad, .aside, .link_news").expect("Failed to compile NOISE_SELECTOR")
});

static BODY_CONTAINER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#dic_area, #articeBody, .article_body").expect("Failed to compile BODY_CONTAINER_SELECTOR")
});

static IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#dic_area img, #articeBody img, .article_body img").expect("Failed to compile IMAGE_SELECTOR")
});

static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").expect("Failed to compile BLANK_LINES_RE")
});

// --- Data Structures ---

/// Everything read from an article page itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticlePage {
    pub title: String,
    pub provider: Option<String>,
    pub published_at: Option<String>,
    pub content: String,
    pub images: Vec<String>,
}

/// Applies strategies in order and returns the first hit.
pub fn first_match(document: &Html, field: &str, strategies: &[Box<dyn ExtractionStrategy>]) -> Option<String> {
    let hit = strategies.iter().find_map(|strategy| {
        strategy.extract(document).map(|value| (strategy.describe(), value))
    });

    match hit {
        Some((css, value)) => {
            tracing::trace!("{} matched via '{}'", field, css);
            Some(value)
        }
        None => {
            tracing::debug!("No strategy matched for {}", field);
            None
        }
    }
}

/// Parses an article page. `page_url` resolves relative image paths.
pub fn parse_article_page(html: &str, page_url: &str) -> ArticlePage {
    let document = Html::parse_document(html);

    let title = first_match(&document, "title", &TITLE_STRATEGIES).unwrap_or_default();
    let provider = first_match(&document, "provider", &PROVIDER_STRATEGIES);
    // The first non-empty candidate decides; an unrecognized format leaves the date unset
    let published_at = first_match(&document, "date", &DATE_STRATEGIES).and_then(|d| normalize_date(&d));

    ArticlePage {
        title,
        provider,
        published_at,
        content: extract_content(&document),
        images: extract_images(&document, page_url),
    }
}

/// Fetches the direct article page for `origin_url` and parses it.
pub async fn crawl_detail(client: &NaverClient, origin_url: &str) -> Result<ArticleDetail, CrawlError> {
    if origin_url.trim().is_empty() {
        return Err(CrawlError::InvalidInput("Origin URL is required".to_string()));
    }

    let ids = extract_article_ids(origin_url)
        .ok_or_else(|| CrawlError::UnresolvableIdentifiers(origin_url.to_string()))?;

    let actual_url = client.article_url(&ids);
    let html = client.fetch_article(&actual_url).await?;
    let page = parse_article_page(&html, &actual_url);

    if page.title.is_empty() {
        tracing::warn!("No title found on article page {}", actual_url);
    }
    tracing::info!(
        "Parsed article {}/{}: {} chars of content, {} images",
        ids.office_id, ids.article_id, page.content.chars().count(), page.images.len()
    );

    Ok(ArticleDetail {
        article_id: ids.article_id,
        office_id: ids.office_id,
        title: page.title,
        provider: page.provider,
        published_at: page.published_at,
        content: page.content,
        images: page.images,
        origin_url: origin_url.to_string(),
        actual_url,
        crawled_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Body text with noise removed. Empty when no body container exists.
fn extract_content(document: &Html) -> String {
    let Some(body) = BODY_SELECTORS.iter().find_map(|s| document.select(s).next()) else {
        tracing::debug!("No article body container found");
        return String::new();
    };

    let mut text = String::new();
    collect_text(body, &mut text);
    BLANK_LINES_RE.replace_all(text.trim(), "\n").into_owned()
}

fn collect_text(element: ElementRef, out: &mut String) {
    for node in element.children() {
        match node.value() {
            Node::Text(text_node) => out.push_str(&text_node.text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(node) {
                    if !NOISE_SELECTOR.matches(&child) {
                        collect_text(child, out);
                    }
                }
            }
            _ => {} // Ignore comments, etc.
        }
    }
}

fn extract_images(document: &Html, page_url: &str) -> Vec<String> {
    document
        .select(&IMAGE_SELECTOR)
        .filter(|img| !inside_noise(*img))
        .filter_map(|img| trimmed_attr(img, "src").or_else(|| trimmed_attr(img, "data-src")))
        .filter(|src| !IMAGE_EXCLUDE_MARKERS.iter().any(|marker| src.contains(marker)))
        .filter_map(|src| absolute_image_url(&src, page_url))
        .collect()
}

/// True when an ancestor between the image and its body container is an ad, aside or link block.
fn inside_noise(img: ElementRef) -> bool {
    img.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| !BODY_CONTAINER_SELECTOR.matches(ancestor))
        .any(|ancestor| NOISE_SELECTOR.matches(&ancestor))
}

fn absolute_image_url(src: &str, page_url: &str) -> Option<String> {
    if src.starts_with("http") {
        return Some(src.to_string());
    }
    if src.starts_with("//") {
        return Some(format!("https:{}", src));
    }

    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Dropping image '{}': {}", src, e);
            None
        }
    }
}
