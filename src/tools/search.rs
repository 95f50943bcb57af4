//! Web search tool backed by the DuckDuckGo HTML endpoint

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use super::{string_arg, Tool, ToolDescriptor, ToolError};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: usize = 8;

#[derive(Debug, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

/// Searches the web and returns a JSON list of title/url/snippet results.
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn result_pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| {
            // Anchor + snippet pairs in the HTML results page.
            Regex::new(
                r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>.*?class="result__snippet"[^>]*>(.*?)</a>"#,
            )
            .expect("static regex")
        })
    }

    fn strip_tags(html: &str) -> String {
        static TAGS: OnceLock<Regex> = OnceLock::new();
        let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"));
        tags.replace_all(html, "")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#x27;", "'")
            .trim()
            .to_string()
    }

    fn parse_results(html: &str) -> Vec<SearchResult> {
        Self::result_pattern()
            .captures_iter(html)
            .take(MAX_RESULTS)
            .map(|caps| SearchResult {
                url: caps[1].to_string(),
                title: Self::strip_tags(&caps[2]),
                snippet: Self::strip_tags(&caps[3]),
            })
            .collect()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "web_search".to_string(),
            description: "Search the web and return a list of results with title, url and snippet."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query",
                        "minLength": 1,
                        "maxLength": 100
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let query = string_arg(&args, "query")?;
        log::debug!("web_search: {}", query);

        let html = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| ToolError::Fetch {
                url: SEARCH_ENDPOINT.to_string(),
                source,
            })?
            .text()
            .await
            .map_err(|source| ToolError::Fetch {
                url: SEARCH_ENDPOINT.to_string(),
                source,
            })?;

        let results = Self::parse_results(&html);
        if results.is_empty() {
            return Ok(format!("No results found for \"{}\".", query));
        }
        Ok(serde_json::to_string_pretty(&results).unwrap_or_else(|_| "[]".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://example.com/rust">The <b>Rust</b> Book</a>
          <a class="result__snippet" href="https://example.com/rust">Learn &amp; master <b>Rust</b></a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://example.org/async">Async in depth</a>
          <a class="result__snippet" href="https://example.org/async">Futures explained</a>
        </div>
    "#;

    #[test]
    fn test_parse_results_extracts_title_url_snippet() {
        let results = WebSearchTool::parse_results(SAMPLE);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/rust");
        assert_eq!(results[0].title, "The Rust Book");
        assert_eq!(results[0].snippet, "Learn & master Rust");
        assert_eq!(results[1].title, "Async in depth");
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(WebSearchTool::parse_results("<html></html>").is_empty());
    }

    #[test]
    fn test_strip_tags_decodes_entities() {
        assert_eq!(
            WebSearchTool::strip_tags("<b>a &lt;tag&gt;</b> &quot;q&quot;"),
            "a <tag> \"q\""
        );
    }
}
