//! Website content extraction tool
//!
//! Fetches a page and reduces it to readable text. Extraction quality is an
//! external concern; this implementation is deliberately thin.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::{string_arg, Tool, ToolDescriptor, ToolError};

/// Cap on returned content so a single page cannot blow the model context.
const MAX_CONTENT_CHARS: usize = 8_000;

pub struct WebsiteContentTool {
    client: reqwest::Client,
}

impl WebsiteContentTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Strip scripts, styles and markup; collapse whitespace runs.
    fn extract_text(html: &str) -> String {
        static NOISE: OnceLock<Regex> = OnceLock::new();
        static TAGS: OnceLock<Regex> = OnceLock::new();
        static BLANKS: OnceLock<Regex> = OnceLock::new();

        let noise = NOISE.get_or_init(|| {
            Regex::new(
                r"(?si)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<nav[^>]*>.*?</nav>|<header[^>]*>.*?</header>|<footer[^>]*>.*?</footer>",
            )
            .expect("static regex")
        });
        let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"));
        let blanks = BLANKS.get_or_init(|| Regex::new(r"[ \t]*\n[\s]*\n").expect("static regex"));

        let stripped = noise.replace_all(html, " ");
        let text = tags.replace_all(&stripped, "\n");
        let text = text
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&nbsp;", " ");
        let collapsed = blanks.replace_all(&text, "\n\n");

        let mut result: String = collapsed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if result.len() > MAX_CONTENT_CHARS {
            let mut cut = MAX_CONTENT_CHARS;
            while !result.is_char_boundary(cut) {
                cut -= 1;
            }
            result.truncate(cut);
            result.push_str("\n[content truncated]");
        }
        result
    }

    fn extract_title(html: &str) -> Option<String> {
        static TITLE: OnceLock<Regex> = OnceLock::new();
        let title = TITLE
            .get_or_init(|| Regex::new(r"(?si)<title[^>]*>(.*?)</title>").expect("static regex"));
        title
            .captures(html)
            .map(|caps| caps[1].trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl Tool for WebsiteContentTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "website_content".to_string(),
            description:
                "Fetch the content of a web page at the given URL and return it as readable text."
                    .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL of the page to fetch",
                        "minLength": 1,
                        "maxLength": 1000
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let url = string_arg(&args, "url")?;
        log::debug!("website_content: {}", url);

        let html = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| ToolError::Fetch {
                url: url.clone(),
                source,
            })?
            .text()
            .await
            .map_err(|source| ToolError::Fetch {
                url: url.clone(),
                source,
            })?;

        let content = Self::extract_text(&html);
        if content.is_empty() {
            return Ok(format!(
                "Could not extract readable content from {}. Check that the URL is correct.",
                url
            ));
        }

        let payload = json!({
            "title": Self::extract_title(&html),
            "content": content,
            "url": url,
        });
        Ok(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_drops_scripts_and_tags() {
        let html = r#"
            <html><head><title>Page</title><style>body { color: red }</style></head>
            <body><script>alert(1)</script>
            <h1>Heading</h1>
            <p>First &amp; second</p>
            </body></html>
        "#;
        let text = WebsiteContentTool::extract_text(html);
        assert!(text.contains("Heading"));
        assert!(text.contains("First & second"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_extract_text_truncates_long_pages() {
        let html = format!("<p>{}</p>", "word ".repeat(5_000));
        let text = WebsiteContentTool::extract_text(&html);
        assert!(text.len() <= MAX_CONTENT_CHARS + "\n[content truncated]".len());
        assert!(text.ends_with("[content truncated]"));
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title> My Page </title></head></html>";
        assert_eq!(
            WebsiteContentTool::extract_title(html).as_deref(),
            Some("My Page")
        );
        assert!(WebsiteContentTool::extract_title("<html></html>").is_none());
    }
}
