use crate::models::{join_folder, Bookmark, BookmarkCollection, TreeNode};

/// Flattens a native bookmark tree into a fresh collection.
///
/// Traversal is depth-first with children in source order. Every named folder
/// is recorded, even one that holds no bookmarks.
pub fn extract(nodes: &[TreeNode]) -> BookmarkCollection {
    let mut collection = BookmarkCollection::new();
    extract_into(nodes, "", &mut collection);
    collection
}

fn extract_into(nodes: &[TreeNode], prefix: &str, out: &mut BookmarkCollection) {
    for node in nodes {
        if let Some(children) = &node.children {
            let title = node.title.trim();
            let path = if title.is_empty() {
                prefix.to_string()
            } else {
                join_folder(prefix, title)
            };
            out.add_folder(&path);
            extract_into(children, &path, out);
        } else if let Some(url) = &node.url {
            let added = node.date_added.map(|ms| ms / 1000);
            match Bookmark::new(Some(&node.title), url, prefix, added) {
                Some(bookmark) => out.push(bookmark),
                None => log::debug!("Skipping tree bookmark with unusable url {:?}", url),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROOT_FOLDER;

    #[test]
    fn test_extract_single_folder() {
        let tree = vec![TreeNode::folder(
            "Work",
            vec![TreeNode::link("Site", "http://a.com")],
        )];

        let collection = extract(&tree);

        assert_eq!(collection.len(), 1);
        let bookmark = &collection.bookmarks[0];
        assert_eq!(bookmark.title, "Site");
        assert_eq!(bookmark.url, "http://a.com");
        assert_eq!(bookmark.folder, "Work");
        assert_eq!(collection.folders.len(), 1);
        assert!(collection.folders.contains("Work"));
    }

    #[test]
    fn test_extract_nested_paths_and_order() {
        let tree = vec![TreeNode::folder(
            "",
            vec![
                TreeNode::folder(
                    "Bookmarks bar",
                    vec![
                        TreeNode::link("One", "http://one.com"),
                        TreeNode::folder("Rust", vec![TreeNode::link("", "http://rust-lang.org")]),
                        TreeNode::link("Two", "http://two.com"),
                    ],
                ),
                TreeNode::folder("Other bookmarks", vec![]),
            ],
        )];

        let collection = extract(&tree);

        let urls: Vec<&str> = collection.bookmarks.iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, vec!["http://one.com", "http://rust-lang.org", "http://two.com"]);
        assert_eq!(collection.bookmarks[1].folder, "Bookmarks bar > Rust");
        assert_eq!(collection.bookmarks[1].title, "http://rust-lang.org");
        assert!(collection.folders.contains("Other bookmarks"));
        assert!(!collection.folders.contains(""));
    }

    #[test]
    fn test_extract_top_level_link_uses_root_folder() {
        let mut link = TreeNode::link("Top", "http://top.com");
        link.date_added = Some(1_700_000_000_123);

        let collection = extract(&[link]);

        assert_eq!(collection.bookmarks[0].folder, ROOT_FOLDER);
        assert_eq!(collection.bookmarks[0].added, Some(1_700_000_000));
    }

    #[test]
    fn test_extract_skips_placeholder_urls() {
        let tree = vec![TreeNode::folder(
            "Work",
            vec![
                TreeNode::link("Script", "javascript:alert(1)"),
                TreeNode::link("Hash", "#"),
            ],
        )];

        let collection = extract(&tree);
        assert!(collection.is_empty());
        assert!(collection.folders.contains("Work"));
    }

    #[test]
    fn test_extract_does_not_leak_between_calls() {
        let tree = vec![TreeNode::link("A", "http://a.com")];
        let first = extract(&tree);
        let second = extract(&tree);
        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }
}
