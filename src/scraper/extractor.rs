use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::warn;

use crate::scraper::ScraperConfig;

/// Turns a fetched HTML page into the plain text handed to the generator.
///
/// Boilerplate elements (scripts, navigation, forms, ...) are discarded, the
/// first matching content container is kept, and short lines are dropped.
pub struct ContentExtractor {
    content_selectors: Vec<Selector>,
    remove_selectors: Vec<Selector>,
    min_line_length: usize,
}

impl ContentExtractor {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            content_selectors: parse_selectors(&config.content_selectors),
            remove_selectors: parse_selectors(&config.remove_selectors),
            min_line_length: config.min_line_length,
        }
    }

    /// Extract readable text. Returns an empty string when nothing survives
    /// the filters.
    pub fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let mut removed = HashSet::new();
        for selector in &self.remove_selectors {
            for element in document.select(selector) {
                removed.extend(element.descendants().map(|node| node.id()));
            }
        }

        let container = self
            .content_selectors
            .iter()
            .find_map(|selector| {
                document
                    .select(selector)
                    .find(|element| !removed.contains(&element.id()))
            })
            .unwrap_or_else(|| document.root_element());

        let mut lines = Vec::new();
        for node in container.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            if removed.contains(&node.id()) {
                continue;
            }
            for line in text.lines() {
                let line = line.trim();
                if line.chars().count() > self.min_line_length {
                    lines.push(line.to_string());
                }
            }
        }

        lines.join("\n")
    }
}

fn parse_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Ignoring invalid selector '{}': {}", s, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ContentExtractor {
        ContentExtractor::new(&ScraperConfig::default())
    }

    #[test]
    fn test_prefers_article_and_drops_boilerplate() {
        let html = r#"
            <html><body>
              <nav>Home | World | Politics | Business | Technology</nav>
              <article>
                <h1>Short title</h1>
                <p>The committee approved the new budget late on Tuesday evening.</p>
                <script>var tracking = "this line is long enough to survive";</script>
                <p>Critics said the measure would not survive a second reading.</p>
              </article>
              <footer>Copyright notice that is definitely long enough</footer>
            </body></html>
        "#;

        let text = extractor().extract(html);
        assert_eq!(
            text,
            "The committee approved the new budget late on Tuesday evening.\n\
             Critics said the measure would not survive a second reading."
        );
    }

    #[test]
    fn test_falls_back_to_main_then_body() {
        let html = "<html><body><main><p>Main content paragraph with enough characters.</p></main>\
                    <p>Outside paragraph that also has enough characters.</p></body></html>";
        assert_eq!(
            extractor().extract(html),
            "Main content paragraph with enough characters."
        );

        let html = "<html><body><div>Body paragraph with plenty of characters here.</div></body></html>";
        assert_eq!(
            extractor().extract(html),
            "Body paragraph with plenty of characters here."
        );
    }

    #[test]
    fn test_container_inside_removed_element_is_skipped() {
        let html = "<html><body><aside><article><p>Sidebar teaser article that is long enough.</p>\
                    </article></aside><main><p>The real story lives in the main element.</p></main>\
                    </body></html>";
        assert_eq!(
            extractor().extract(html),
            "The real story lives in the main element."
        );
    }

    #[test]
    fn test_short_lines_only_yields_empty() {
        let html = "<html><body><p>Too short.</p><p>Also short.</p></body></html>";
        assert_eq!(extractor().extract(html), "");
    }

    #[test]
    fn test_invalid_selectors_are_ignored() {
        let config = ScraperConfig {
            content_selectors: vec!["[[".to_string(), "article".to_string()],
            ..Default::default()
        };
        let extractor = ContentExtractor::new(&config);
        let html = "<article><p>A paragraph comfortably over the threshold.</p></article>";
        assert_eq!(
            extractor.extract(html),
            "A paragraph comfortably over the threshold."
        );
    }
}
