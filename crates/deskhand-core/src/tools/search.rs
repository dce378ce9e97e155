//! Web search through DuckDuckGo's HTML endpoint.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::utils::str_arg;

use super::executor::ToolContext;

const MAX_RESULTS: usize = 5;

static RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("result link pattern is valid")
});
static RESULT_LINK_HREF_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*href="([^"]*)"[^>]*class="result__a"[^>]*>(.*?)</a>"#)
        .expect("result link pattern is valid")
});
static RESULT_SNIPPET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("snippet pattern is valid")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Execute the `search_web` tool.
pub async fn execute_search_web(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let query = str_arg(args, "query")?;

    ctx.checkpoint()?;
    match search(ctx.http, &ctx.settings.search_endpoint, query).await {
        Ok(results) if results.is_empty() => Ok("No results found.".to_string()),
        Ok(results) => Ok(format_results(&results)),
        Err(e) => Ok(format!("Search failed: {}", e)),
    }
}

async fn search(client: &reqwest::Client, endpoint: &str, query: &str) -> Result<Vec<SearchResult>> {
    let response = client
        .get(endpoint)
        .query(&[("q", query)])
        .send()
        .await?
        .error_for_status()?;
    let html = response.text().await?;
    debug!("Search returned {} bytes of HTML", html.len());
    Ok(parse_results(&html))
}

pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pull the top results out of a DuckDuckGo HTML results page.
pub fn parse_results(html: &str) -> Vec<SearchResult> {
    html.split("result__body")
        .skip(1)
        .filter_map(|block| {
            let link = RESULT_LINK
                .captures(block)
                .or_else(|| RESULT_LINK_HREF_FIRST.captures(block))?;
            let url = resolve_redirect(&decode_entities(&link[1]));
            let title = clean_text(&link[2]);
            if title.is_empty() || url.is_empty() {
                return None;
            }
            let snippet = RESULT_SNIPPET
                .captures(block)
                .map(|c| clean_text(&c[1]))
                .unwrap_or_default();
            Some(SearchResult {
                title,
                snippet,
                url,
            })
        })
        .take(MAX_RESULTS)
        .collect()
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded url>`.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    match reqwest::Url::parse(&absolute) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned())
            .unwrap_or(absolute),
        Err(_) => absolute,
    }
}

fn clean_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, "");
    decode_entities(&without_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming <b>Language</b></a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F">A language empowering everyone to build reliable &amp; efficient software.</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Rust Book</a>
    </h2>
  </div>
</div>
"#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(PAGE);
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(
            results[0].snippet,
            "A language empowering everyone to build reliable & efficient software."
        );

        assert_eq!(results[1].title, "The Rust Book");
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>").is_empty());
    }

    #[test]
    fn test_format_results() {
        let results = vec![SearchResult {
            title: "Title".to_string(),
            snippet: "Body".to_string(),
            url: "https://example.com".to_string(),
        }];
        assert_eq!(format_results(&results), "1. Title\n   Body\n   https://example.com");
    }
}
