// src/extractors/fields.rs
//! Field helpers shared by the listing and detail parsers.

use crate::naver::models::ArticleIds;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::form_urlencoded;

static NORMALIZED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("Failed to compile NORMALIZED_DATE_RE")
});

// "2025.12.01 19:39" as printed in the listing table
static DOTTED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\.(\d{2})\.(\d{2})\s+(\d{2}):(\d{2})").expect("Failed to compile DOTTED_DATE_RE")
});

// n.news.naver.com/mnews/article/{office_id}/{article_id}
static ARTICLE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/article/(\d+)/(\d+)").expect("Failed to compile ARTICLE_PATH_RE")
});

// "relation_lst _clusterId2150001233359": office id followed by article id
static CLUSTER_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_clusterId(\d+)").expect("Failed to compile CLUSTER_CLASS_RE")
});

/// Normalizes a date to `YYYY-MM-DD HH:MM:SS`. Returns `None` for anything unrecognized.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if NORMALIZED_DATE_RE.is_match(raw) {
        return Some(raw.to_string());
    }

    // Listing dates carry no seconds
    DOTTED_DATE_RE.captures(raw).map(|caps| {
        format!("{}-{}-{} {}:{}:00", &caps[1], &caps[2], &caps[3], &caps[4], &caps[5])
    })
}

/// First value of a query parameter. Works on relative hrefs; empty values count as absent.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Extracts the `{office_id, article_id}` pair, trying query parameters before the path shape.
pub fn extract_article_ids(url: &str) -> Option<ArticleIds> {
    let by_query = query_param(url, "article_id").zip(query_param(url, "office_id"));
    if let Some((article_id, office_id)) = by_query {
        return Some(ArticleIds { article_id, office_id });
    }

    ARTICLE_PATH_RE
        .captures(url)
        .map(|caps| ArticleIds::new(&caps[1], &caps[2]))
}

/// Cluster id carried in a container row's class attribute.
pub fn cluster_id_from_class(class_attr: &str) -> Option<String> {
    CLUSTER_CLASS_RE.captures(class_attr).map(|caps| caps[1].to_string())
}

pub fn has_class(element: ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Whitespace-trimmed text of an element, `None` when empty.
pub fn trimmed_text(element: ElementRef) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub fn trimmed_attr(element: ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
