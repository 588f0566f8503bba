// src/extractors/listing.rs

// --- Imports ---
use crate::extractors::fields::{
    cluster_id_from_class, extract_article_ids, has_class, normalize_date, query_param, trimmed_text,
};
use crate::naver::client::NaverClient;
use crate::naver::encoding::decode_euc_kr;
use crate::naver::models::{ArticleSummary, ListingRequest, ListingResult};
use crate::utils::error::CrawlError;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

// --- Row Classes ---
const RELATION_CONTAINER_CLASS: &str = "relation_lst";
const RELATION_TITLE_CLASS: &str = "relation_tit";

// --- CSS Selectors (Lazy Static) ---
// The news table, newest markup first; the bare form matches the older page layout.
static MAIN_TABLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".tb_cont > table.type5", "table.type5"]
        .iter()
        .map(|s| Selector::parse(s).expect("Failed to compile MAIN_TABLE_SELECTORS"))
        .collect()
});

static NESTED_TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table.type5").expect("Failed to compile NESTED_TABLE_SELECTOR")
});

static TITLE_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".title a").expect("Failed to compile TITLE_LINK_SELECTOR")
});

static INFO_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".info").expect("Failed to compile INFO_SELECTOR")
});

static DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".date").expect("Failed to compile DATE_SELECTOR")
});

// "More related news" links of a container, tried in order
static CLUSTER_LINK_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["a.relation_lst_link", "a[href*='clusterId=']"]
        .iter()
        .map(|s| Selector::parse(s).expect("Failed to compile CLUSTER_LINK_SELECTORS"))
        .collect()
});

/// Parses a decoded listing page into at most `display` summaries, in document order.
///
/// Rows that are not articles (spacers, ads, rows without an id pair) are skipped.
/// Rows inside a `relation_lst` container inherit the container's cluster id.
pub fn parse_listing(html: &str, stock_code: &str, base_url: &str, display: usize) -> Vec<ArticleSummary> {
    let document = Html::parse_document(html);
    let mut articles = Vec::new();

    let Some(table) = find_main_table(&document) else {
        tracing::warn!("News table not found in listing page for {}", stock_code);
        return articles;
    };

    for row in direct_rows(table) {
        if articles.len() >= display {
            break;
        }

        if has_class(row, RELATION_CONTAINER_CLASS) {
            let cluster_id = container_cluster_id(row);
            tracing::debug!("Related-article container with cluster id {:?}", cluster_id);

            for nested_table in row.select(&NESTED_TABLE_SELECTOR) {
                for nested_row in direct_rows(nested_table) {
                    if articles.len() >= display {
                        break;
                    }
                    if let Some(mut article) = parse_article_row(nested_row, stock_code, base_url) {
                        article.cluster_id = cluster_id.clone();
                        article.is_relation_head = false;
                        articles.push(article);
                    }
                }
            }
            continue;
        }

        if let Some(article) = parse_article_row(row, stock_code, base_url) {
            articles.push(article);
        }
    }

    tracing::debug!("Parsed {} articles for {}", articles.len(), stock_code);
    articles
}

/// Fetches, decodes and parses one listing page.
/// The decoded page is returned alongside the result for debug dumps.
pub async fn crawl_listing(
    client: &NaverClient,
    request: &ListingRequest,
) -> Result<(ListingResult, String), CrawlError> {
    let stock_code = request.stock_code.trim();
    if stock_code.is_empty() {
        return Err(CrawlError::InvalidInput(
            "Stock code is required (e.g., 005930 for Samsung Electronics)".to_string(),
        ));
    }

    let limit = request.effective_display();
    let source_url = client.listing_url(stock_code, request.page);

    let bytes = client.fetch_listing(stock_code, request.page).await?;
    let html = decode_euc_kr(&bytes);
    let articles = parse_listing(&html, stock_code, client.finance_base(), limit);

    tracing::info!("Crawled {} of {} requested articles for {} (page {})", articles.len(), limit, stock_code, request.page);

    let result = build_listing_result("crawling", stock_code, request.page, limit, articles, source_url);
    Ok((result, html))
}

pub fn build_listing_result(
    method: &str,
    stock_code: &str,
    page: u32,
    display: usize,
    articles: Vec<ArticleSummary>,
    source_url: String,
) -> ListingResult {
    ListingResult {
        method: method.to_string(),
        stock_code: stock_code.to_string(),
        page,
        display,
        total_crawled: articles.len(),
        articles,
        source_url,
        crawled_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

fn find_main_table(document: &Html) -> Option<ElementRef<'_>> {
    MAIN_TABLE_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())
}

/// Top-level rows of a table, without descending into nested tables.
fn direct_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .flat_map(|child| match child.value().name() {
            "tbody" => child.children().filter_map(ElementRef::wrap).filter(is_row).collect(),
            "tr" => vec![child],
            _ => Vec::new(),
        })
}

fn is_row(element: &ElementRef) -> bool {
    element.value().name() == "tr"
}

/// Cluster id of a `relation_lst` container: class marker first, then the "more" link.
fn container_cluster_id(row: ElementRef) -> Option<String> {
    if let Some(id) = row.value().attr("class").and_then(cluster_id_from_class) {
        return Some(id);
    }

    CLUSTER_LINK_SELECTORS.iter().find_map(|selector| {
        row.select(selector)
            .filter_map(|link| link.value().attr("href"))
            .find_map(|href| query_param(href, "clusterId"))
    })
}

/// Converts one table row into a summary; `None` when the row is not an article.
fn parse_article_row(row: ElementRef, stock_code: &str, base_url: &str) -> Option<ArticleSummary> {
    let title_link = row.select(&TITLE_LINK_SELECTOR).next()?;
    let title = trimmed_text(title_link)?;
    let link = title_link.value().attr("href").map(str::trim).filter(|l| !l.is_empty())?;

    let Some(ids) = extract_article_ids(link) else {
        tracing::trace!("Skipping row without article/office id: {}", link);
        return None;
    };

    let is_relation_title = has_class(row, RELATION_TITLE_CLASS);
    let is_relation_head = is_relation_title || has_class(row, RELATION_CONTAINER_CLASS);

    // The grouping id belongs to the container, never to its head row
    let cluster_id = if is_relation_title { None } else { query_param(link, "clusterId") };

    let provider = row.select(&INFO_SELECTOR).next().and_then(trimmed_text);
    let published_at = row
        .select(&DATE_SELECTOR)
        .next()
        .and_then(trimmed_text)
        .and_then(|d| normalize_date(&d));

    Some(ArticleSummary {
        stock_code: stock_code.to_string(),
        article_id: ids.article_id,
        office_id: ids.office_id,
        title,
        provider,
        published_at,
        origin_url: absolute_url(base_url, link),
        cluster_id,
        is_relation_head,
    })
}

fn absolute_url(base_url: &str, link: &str) -> String {
    if link.starts_with("http") {
        link.to_string()
    } else if link.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), link)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), link)
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::naver::client::CrawlerConfig;
    use mockito::Matcher;

    const BASE: &str = "https://finance.naver.com";
    const LISTING: &str = include_str!("../../tests/fixtures/listing_005930.html");
    const RELATION_HEAD: &str = include_str!("../../tests/fixtures/listing_relation_head.html");

    #[test]
    fn test_standalone_rows_and_one_cluster() {
        let articles = parse_listing(LISTING, "005930", BASE, 5);

        assert_eq!(articles.len(), 5);
        let ids: Vec<&str> = articles.iter().map(|a| a.article_id.as_str()).collect();
        assert_eq!(ids, ["0005001001", "0005002002", "0003003003", "0014444445", "0004444446"]);

        for standalone in &articles[..3] {
            assert_eq!(standalone.cluster_id, None, "{}", standalone.title);
            assert!(!standalone.is_relation_head);
        }
        for nested in &articles[3..] {
            assert_eq!(nested.cluster_id.as_deref(), Some("0010014444444"));
            assert!(!nested.is_relation_head);
        }
    }

    #[test]
    fn test_row_fields() {
        let articles = parse_listing(LISTING, "005930", BASE, 10);
        let first = &articles[0];

        assert_eq!(first.stock_code, "005930");
        assert_eq!(first.office_id, "009");
        assert_eq!(first.title, "삼성전자, 4분기 실적 발표");
        assert_eq!(first.provider.as_deref(), Some("매일경제"));
        assert_eq!(first.published_at.as_deref(), Some("2025-12-01 19:39:00"));
        assert_eq!(
            first.origin_url,
            "https://finance.naver.com/item/news_read.naver?article_id=0005001001&office_id=009&code=005930&page=1&sm=title_entity_id.basic"
        );

        // Absolute path-style link kept verbatim, title trimmed
        let second = &articles[1];
        assert_eq!(second.title, "반도체 업황 회복 기대감");
        assert_eq!(second.office_id, "015");
        assert_eq!(second.origin_url, "https://n.news.naver.com/mnews/article/015/0005002002");

        // "어제" is not a recognized date; empty clusterId= is not a cluster
        let third = &articles[2];
        assert_eq!(third.published_at, None);
        assert_eq!(third.cluster_id, None);
    }

    #[test]
    fn test_display_limit_stops_early() {
        let articles = parse_listing(LISTING, "005930", BASE, 2);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].article_id, "0005002002");
    }

    #[test]
    fn test_relation_title_row_never_carries_cluster_id() {
        let articles = parse_listing(RELATION_HEAD, "005930", BASE, 10);
        let head = &articles[0];

        assert_eq!(head.article_id, "0001111111");
        assert!(head.is_relation_head);
        assert_eq!(head.cluster_id, None, "head link has clusterId=0090001111111 but must stay unset");
    }

    #[test]
    fn test_cluster_id_from_more_link_when_class_has_none() {
        let articles = parse_listing(RELATION_HEAD, "005930", BASE, 10);

        // Head, three nested rows (fourth has no ids), trailing standalone
        assert_eq!(articles.len(), 5);
        for nested in &articles[1..4] {
            assert_eq!(nested.cluster_id.as_deref(), Some("0090001111111"), "{}", nested.title);
            assert!(!nested.is_relation_head, "{}", nested.title);
        }
        assert_eq!(articles[2].office_id, "014");
        assert_eq!(articles[2].article_id, "0001111113");

        let last = &articles[4];
        assert_eq!(last.article_id, "0002222222");
        assert_eq!(last.cluster_id, None);
        assert!(!last.is_relation_head);
    }

    #[test]
    fn test_display_limit_applies_inside_cluster() {
        let articles = parse_listing(RELATION_HEAD, "005930", BASE, 3);
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[2].article_id, "0001111113");
    }

    #[test]
    fn test_every_article_has_id_pair() {
        for html in [LISTING, RELATION_HEAD] {
            for article in parse_listing(html, "005930", BASE, 100) {
                assert!(!article.article_id.is_empty());
                assert!(!article.office_id.is_empty());
                assert!(!article.title.is_empty());
            }
        }
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let first = parse_listing(LISTING, "005930", BASE, 10);
        let second = parse_listing(LISTING, "005930", BASE, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_older_layout_without_tb_cont() {
        let html = r#"<html><body><table class="type5"><tbody>
            <tr><td class="title"><a href="/item/news_read.naver?article_id=1&office_id=2">제목</a></td>
                <td class="info">언론사</td><td class="date">2025.01.02 03:04</td></tr>
        </tbody></table></body></html>"#;

        let articles = parse_listing(html, "000660", BASE, 10);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].published_at.as_deref(), Some("2025-01-02 03:04:00"));
    }

    #[test]
    fn test_missing_table_yields_nothing() {
        assert!(parse_listing("<html><body><p>점검 중</p></body></html>", "005930", BASE, 10).is_empty());
    }

    #[test]
    fn test_row_without_info_has_no_provider() {
        let html = r#"<div class="tb_cont"><table class="type5"><tbody>
            <tr><td class="title"><a href="/a?article_id=1&office_id=2">t</a></td></tr>
            <tr><td class="title"><a href="/a?article_id=3&office_id=4">   </a></td></tr>
        </tbody></table></div>"#;

        let articles = parse_listing(html, "005930", BASE, 10);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].provider, None);
        assert_eq!(articles[0].published_at, None);
    }

    #[tokio::test]
    async fn test_blank_stock_code_is_rejected_before_fetch() {
        let client = NaverClient::new(CrawlerConfig {
            finance_base_url: "http://127.0.0.1:1".into(),
            ..CrawlerConfig::default()
        })
        .unwrap();

        let result = crawl_listing(&client, &ListingRequest::new("   ")).await;
        assert!(matches!(result, Err(CrawlError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_crawl_decodes_euc_kr_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let (payload, _, unmappable) = encoding_rs::EUC_KR.encode(LISTING);
        assert!(!unmappable);

        let mock = server.mock("GET", "/item/news_news.naver")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "005930".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(payload.to_vec())
            .create_async()
            .await;

        let client = NaverClient::new(CrawlerConfig {
            finance_base_url: server.url(),
            ..CrawlerConfig::default()
        })
        .unwrap();

        let request = ListingRequest::new("005930").display(5).page(1);
        let (result, html) = tokio_test::assert_ok!(crawl_listing(&client, &request).await);
        assert!(html.contains("삼성전자"));

        assert_eq!(result.method, "crawling");
        assert_eq!(result.stock_code, "005930");
        assert_eq!(result.display, 5);
        assert_eq!(result.total_crawled, 5);
        assert_eq!(result.source_url, client.listing_url("005930", 1));
        assert_eq!(result.articles[0].title, "삼성전자, 4분기 실적 발표");
        assert!(result.articles[0].origin_url.starts_with(&server.url()));
        assert!(result.crawled_at.ends_with('Z'));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_crawl_clamps_display() {
        let mut server = mockito::Server::new_async().await;
        let (payload, _, _) = encoding_rs::EUC_KR.encode(LISTING);
        server.mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(payload.to_vec())
            .create_async()
            .await;

        let client = NaverClient::new(CrawlerConfig {
            finance_base_url: server.url(),
            ..CrawlerConfig::default()
        })
        .unwrap();

        let (result, _) = crawl_listing(&client, &ListingRequest::new("005930").display(500)).await.unwrap();
        assert_eq!(result.display, 100);
        assert_eq!(result.total_crawled, 5);
        assert!(result.total_crawled <= result.display);
    }
}
