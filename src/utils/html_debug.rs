// src/utils/html_debug.rs
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use crate::utils::error::AppError;

/// Markers that decide how a listing row is classified.
pub const LISTING_ROW_MARKERS: &[(&str, &str)] = &[
    (r"\brelation_lst\b", "container"),
    (r"\brelation_tit\b", "head"),
    (r"_clusterId\d+", "cluster"),
    (r"clusterId=\d+", "cluster"),
    (r#"class="title""#, "title"),
];

/// Saves a HTML document to a file with debug highlights
pub fn save_debug_html(html: &str, path: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), AppError> {
    let mut file = File::create(path)?;

    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");

    // CSS for highlight colors
    debug_html.push_str(".highlight-container { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-head { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-cluster { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-title { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n<pre>\n");

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| h.0); // Sort by position

    for (start, end, highlight_type) in sorted_highlights {
        // Overlapping matches are dropped; the earlier one wins
        if start < last_pos {
            continue;
        }
        debug_html.push_str(&escape(&html[last_pos..start]));

        let css_class = match highlight_type {
            "container" => "highlight-container",
            "head" => "highlight-head",
            "cluster" => "highlight-cluster",
            "title" => "highlight-title",
            _ => "highlight-custom",
        };

        debug_html.push_str(&format!("<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type));
        debug_html.push_str(&escape(&html[start..end]));
        debug_html.push_str("</span>");

        last_pos = end;
    }

    if last_pos < html.len() {
        debug_html.push_str(&escape(&html[last_pos..]));
    }

    debug_html.push_str("\n</pre>\n</body>\n</html>");

    file.write_all(debug_html.as_bytes())?;

    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}

/// Creates a debug version of an HTML document with locations of specified regex patterns highlighted
pub fn create_debug_html(html: &str, path: &Path, patterns: &[(&str, &str)]) -> Result<(), AppError> {
    use regex::Regex;

    let mut highlights = Vec::new();

    for (pattern, highlight_type) in patterns {
        let re = Regex::new(pattern).map_err(|e| {
            AppError::Config(format!("Invalid regex pattern '{}': {}", pattern, e))
        })?;

        for mat in re.find_iter(html) {
            highlights.push((mat.start(), mat.end(), *highlight_type));
        }
    }

    save_debug_html(html, path, &highlights)
}

/// Writes the decoded listing page and an annotated copy into `dir`.
/// Returns the path of the raw copy; a failed annotation is only logged.
pub fn dump_listing(dir: &Path, stock_code: &str, page: u32, html: &str) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;

    let raw_path = dir.join(format!("listing_{}_p{}.html", stock_code, page));
    fs::write(&raw_path, html)?;
    tracing::info!("Saved decoded listing to: {}", raw_path.display());

    let annotated_path = dir.join(format!("listing_{}_p{}_annotated.html", stock_code, page));
    if let Err(e) = create_debug_html(html, &annotated_path, LISTING_ROW_MARKERS) {
        tracing::warn!("Failed to create debug HTML: {}", e);
    }

    Ok(raw_path)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("finance_news_crawler_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_markers_are_highlighted() {
        let dir = temp_dir("markers");
        let html = r#"<tr class="relation_lst _clusterId0090001"><td class="title"><a href="/x?clusterId=0090001">t</a></td></tr>"#;

        dump_listing(&dir, "005930", 1, html).unwrap();
        let annotated = fs::read_to_string(dir.join("listing_005930_p1_annotated.html")).unwrap();

        assert!(annotated.contains("<span class=\"highlight-container\""));
        assert!(annotated.contains("<span class=\"highlight-cluster\""));
        assert!(annotated.contains("<span class=\"highlight-title\""));
        assert!(!annotated.contains("<span class=\"highlight-head\""), "no relation_tit in input");
        // Source markup is escaped so the dump renders as text
        assert!(annotated.contains("&lt;tr class="));

        let raw = fs::read_to_string(dir.join("listing_005930_p1.html")).unwrap();
        assert_eq!(raw, html);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_container_marker_skips_link_class() {
        let dir = temp_dir("link_class");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.html");

        create_debug_html(r#"<a class="relation_lst_link">more</a>"#, &path, LISTING_ROW_MARKERS).unwrap();
        let annotated = fs::read_to_string(&path).unwrap();

        assert!(!annotated.contains("<span class=\"highlight-container\""));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let dir = temp_dir("bad_pattern");
        fs::create_dir_all(&dir).unwrap();
        let result = create_debug_html("<p></p>", &dir.join("x.html"), &[("(", "custom")]);
        assert!(matches!(result, Err(AppError::Config(_))));
        fs::remove_dir_all(&dir).unwrap();
    }
}
