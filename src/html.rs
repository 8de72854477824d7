use scraper::{ElementRef, Html, Selector};

use crate::error::{BookmarkError, Result};
use crate::models::{Bookmark, BookmarkCollection, ROOT_FOLDER};

/// Parser for Netscape-style HTML bookmark exports.
///
/// Each `<a href>` becomes a bookmark. Its folder is the text of the nearest `<H3>`
/// that precedes the anchor or one of its ancestors, which is where the export
/// format puts folder titles (`<DT><H3>Folder</H3><DL>...</DL>`).
#[derive(Debug, Clone)]
pub struct HtmlBookmarkParser {
    heading_search_depth: usize,
}

impl Default for HtmlBookmarkParser {
    fn default() -> Self {
        Self::new(10)
    }
}

impl HtmlBookmarkParser {
    /// # Arguments
    /// * `heading_search_depth` - How many ancestors above an anchor to inspect for a folder heading
    pub fn new(heading_search_depth: usize) -> Self {
        Self {
            heading_search_depth,
        }
    }

    /// Parses an HTML document into a fresh collection.
    ///
    /// Anchors with a blank, `#` or `javascript:` href are skipped. Fails when the
    /// text holds no markup at all or when no anchor survives.
    pub fn parse(&self, html: &str) -> Result<BookmarkCollection> {
        if html.trim().is_empty() || !html.contains('<') {
            return Err(BookmarkError::Parse(
                "Failed to parse HTML bookmarks: invalid HTML content provided".to_string(),
            ));
        }

        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            log::debug!("HTML parser recovered from {} errors", document.errors.len());
        }

        let anchors = selector("a[href]")?;
        let headings = selector("h3")?;

        let mut collection = BookmarkCollection::new();
        for heading in document.select(&headings) {
            collection.add_folder(&element_text(&heading));
        }

        let mut skipped = 0usize;
        for anchor in document.select(&anchors) {
            let href = anchor.value().attr("href").unwrap_or("");
            let title = element_text(&anchor);
            let folder = self
                .find_folder(&anchor)
                .unwrap_or_else(|| ROOT_FOLDER.to_string());
            let added = anchor
                .value()
                .attr("add_date")
                .and_then(|v| v.trim().parse::<i64>().ok());

            match Bookmark::new(Some(&title), href, &folder, added) {
                Some(bookmark) => collection.push(bookmark),
                None => skipped += 1,
            }
        }

        log::debug!(
            "Parsed {} bookmarks from HTML ({} links skipped)",
            collection.len(),
            skipped
        );

        if collection.is_empty() {
            return Err(BookmarkError::Parse(
                "Failed to parse HTML bookmarks: no valid bookmarks found in HTML file".to_string(),
            ));
        }
        Ok(collection)
    }

    /// Walks from the anchor towards the root, checking the preceding siblings
    /// of each node for a folder heading. Inspects `heading_search_depth`
    /// levels, the anchor's own level included.
    fn find_folder(&self, anchor: &ElementRef<'_>) -> Option<String> {
        let mut current = Some(**anchor);
        for _ in 0..self.heading_search_depth {
            let node = current?;
            for sibling in node.prev_siblings() {
                let Some(element) = ElementRef::wrap(sibling) else {
                    continue;
                };
                if element.value().name() == "h3" {
                    let text = element_text(&element);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
            current = node.parent();
        }
        None
    }
}

/// Parses HTML with the default heading search depth.
pub fn parse_html(html: &str) -> Result<BookmarkCollection> {
    HtmlBookmarkParser::default().parse(html)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| BookmarkError::Parse(format!("Invalid selector '{}': {}", css, e)))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
