use chrono::{DateTime, Utc};

use crate::error::{BookmarkError, Result};
use crate::models::{Bookmark, ExportFormat};

/// Serializes bookmarks as a JSON array of `{title, url, folder[, added]}`.
pub fn to_json(bookmarks: &[Bookmark], pretty: bool) -> Result<String> {
    let output = if pretty {
        serde_json::to_string_pretty(bookmarks)
    } else {
        serde_json::to_string(bookmarks)
    };
    output.map_err(|e| BookmarkError::Parse(format!("Failed to serialize bookmarks: {}", e)))
}

/// Renders bookmarks as a Netscape bookmark file.
///
/// One `<H3>`/`<DL>` group per folder, folders in the order they first appear,
/// bookmarks within a folder in list order. Bookmarks without a creation time
/// are stamped with `now`.
pub fn to_netscape_html(bookmarks: &[Bookmark], now: DateTime<Utc>) -> String {
    let mut groups: Vec<(&str, Vec<&Bookmark>)> = Vec::new();
    for bookmark in bookmarks {
        match groups.iter_mut().find(|(folder, _)| *folder == bookmark.folder) {
            Some((_, items)) => items.push(bookmark),
            None => groups.push((bookmark.folder.as_str(), vec![bookmark])),
        }
    }

    let mut html = String::from(
        "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
         <!-- This is an automatically generated file.\n     \
         It will be read and overwritten.\n     \
         DO NOT EDIT! -->\n\
         <META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
         <TITLE>Bookmarks</TITLE>\n\
         <H1>Bookmarks</H1>\n\
         <DL><p>\n",
    );

    for (folder, items) in groups {
        html.push_str("    <DT><H3>");
        push_escaped(&mut html, folder);
        html.push_str("</H3>\n    <DL><p>\n");
        for bookmark in items {
            let added = bookmark.added.unwrap_or_else(|| now.timestamp());
            html.push_str("        <DT><A HREF=\"");
            push_escaped(&mut html, &bookmark.url);
            html.push_str(&format!("\" ADD_DATE=\"{}\">", added));
            push_escaped(&mut html, &bookmark.title);
            html.push_str("</A>\n");
        }
        html.push_str("    </DL><p>\n");
    }

    html.push_str("</DL><p>\n");
    html
}

/// Exports in the requested format.
pub fn export(bookmarks: &[Bookmark], format: ExportFormat, pretty: bool) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(bookmarks, pretty),
        ExportFormat::Html => Ok(to_netscape_html(bookmarks, Utc::now())),
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;
    use crate::json::parse_json;
    use proptest::prelude::*;
    use regex::Regex;

    fn sample() -> Vec<Bookmark> {
        vec![
            Bookmark::new(Some("Rust"), "http://rust-lang.org", "Dev", Some(1_600_000_000)).unwrap(),
            Bookmark::new(Some("News & <Views>"), "http://news.com/?a=1&b=2", "Daily", None).unwrap(),
            Bookmark::new(Some("Crates"), "https://crates.io", "Dev", None).unwrap(),
            Bookmark::new(Some("Nested"), "http://n.com", "Dev > Sub", None).unwrap(),
        ]
    }

    #[test]
    fn test_html_groups_folders_in_first_seen_order() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let html = to_netscape_html(&sample(), now);

        assert!(html.starts_with("<!DOCTYPE NETSCAPE-Bookmark-file-1>"));
        let dev = html.find("<H3>Dev</H3>").unwrap();
        let daily = html.find("<H3>Daily</H3>").unwrap();
        let sub = html.find("<H3>Dev &gt; Sub</H3>").unwrap();
        assert!(dev < daily && daily < sub);
        assert_eq!(html.matches("<DL><p>").count(), 4);

        let rust = html.find("http://rust-lang.org").unwrap();
        let crates = html.find("https://crates.io").unwrap();
        assert!(dev < rust && rust < crates && crates < daily);
    }

    #[test]
    fn test_html_escapes_and_stamps_dates() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let html = to_netscape_html(&sample(), now);

        assert!(html.contains("News &amp; &lt;Views&gt;"));
        assert!(html.contains("HREF=\"http://news.com/?a=1&amp;b=2\""));
        assert!(html.contains("ADD_DATE=\"1600000000\""));
        assert!(html.contains("ADD_DATE=\"1700000000\""));

        let anchor = Regex::new(r#"<DT><A HREF="[^"]+" ADD_DATE="\d+">[^<]*</A>"#).unwrap();
        assert_eq!(anchor.find_iter(&html).count(), 4);
    }

    #[test]
    fn test_html_export_reimports() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let original = sample();
        let reimported = parse_html(&to_netscape_html(&original, now)).unwrap();

        let expected: Vec<(&str, &str, &str)> = vec![
            ("Rust", "http://rust-lang.org", "Dev"),
            ("Crates", "https://crates.io", "Dev"),
            ("News & <Views>", "http://news.com/?a=1&b=2", "Daily"),
            ("Nested", "http://n.com", "Dev > Sub"),
        ];
        let actual: Vec<(&str, &str, &str)> = reimported
            .bookmarks
            .iter()
            .map(|b| (b.title.as_str(), b.url.as_str(), b.folder.as_str()))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_json_export_round_trip() {
        let original = sample();
        let json = to_json(&original, true).unwrap();
        let reimported = parse_json(&json).unwrap();

        assert_eq!(reimported.bookmarks, original);
    }

    #[test]
    fn test_export_empty_list() {
        assert_eq!(to_json(&[], false).unwrap(), "[]");
        let html = export(&[], ExportFormat::Html, true).unwrap();
        assert!(html.trim_end().ends_with("</DL><p>"));
    }

    fn bookmark_strategy() -> impl Strategy<Value = Bookmark> {
        (
            "[A-Za-z0-9 &<>\"']{0,16}",
            "https?://[a-z]{1,10}\\.com(/[a-z0-9?=&]{0,8})?",
            "([A-Za-z ]{0,8}( > [A-Za-z]{1,8})?)",
            proptest::option::of(0i64..4_000_000_000),
        )
            .prop_map(|(title, url, folder, added)| Bookmark::new(Some(&title), &url, &folder, added).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_json_export_reimports_record_for_record(
            bookmarks in proptest::collection::vec(bookmark_strategy(), 1..25),
            pretty in any::<bool>(),
        ) {
            let json = to_json(&bookmarks, pretty).unwrap();
            let reimported = parse_json(&json).unwrap();
            prop_assert_eq!(reimported.bookmarks, bookmarks);
        }
    }
}
