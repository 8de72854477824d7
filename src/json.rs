use std::fmt;

use chrono::DateTime;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::error::{BookmarkError, Result};
use crate::models::{join_folder, Bookmark, BookmarkCollection, ROOT_FOLDER};

/// Seconds between 1601-01-01 (Chromium's epoch) and 1970-01-01
const CHROMIUM_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Converts a Chromium timestamp (microseconds since 1601-01-01) to unix seconds.
pub(crate) fn chromium_time_to_unix(micros: i64) -> Option<i64> {
    if micros <= 0 {
        return None;
    }
    let secs = micros / 1_000_000 - CHROMIUM_EPOCH_OFFSET_SECS;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.timestamp())
}

/// How a JSON node is interpreted, checked in declaration order.
#[derive(Debug)]
enum NodeShape<'a> {
    /// `"type": "url"` or any node carrying a `url` field
    Url(&'a Map<String, Value>),
    /// `"type": "folder"` or any node carrying a `children` array
    Folder {
        name: Option<&'a str>,
        children: &'a [Value],
    },
    /// An object matching neither case; its values are scanned for nodes
    Container(&'a Map<String, Value>),
    /// Scalars, nulls and anything else without bookmark content
    Opaque,
}

impl<'a> NodeShape<'a> {
    fn classify(value: &'a Value) -> Self {
        let Value::Object(node) = value else {
            return Self::Opaque;
        };
        let node_type = node.get("type").and_then(Value::as_str);

        if node_type == Some("url") || node.get("url").is_some_and(|u| !u.is_null()) {
            return Self::Url(node);
        }

        let children = node.get("children").and_then(Value::as_array);
        if node_type == Some("folder") || children.is_some() {
            return Self::Folder {
                name: first_text(node, &["name", "title"]),
                children: children.map(Vec::as_slice).unwrap_or(&[]),
            };
        }

        Self::Container(node)
    }
}

/// Returns the first non-blank string among `keys`.
fn first_text<'a>(node: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
}

fn added_time(node: &Map<String, Value>) -> Option<i64> {
    if let Some(secs) = node.get("added").and_then(Value::as_i64) {
        return Some(secs);
    }
    // Chromium stores date_added as a decimal string
    let micros = match node.get("date_added")? {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    chromium_time_to_unix(micros)
}

/// Parser for JSON bookmark files.
///
/// Understands the browser export layout (`{"roots": {...}}`), plain arrays of
/// nodes, a single node, and arbitrarily nested objects that contain nodes.
#[derive(Debug, Clone)]
pub struct JsonBookmarkParser {
    max_depth: usize,
}

impl Default for JsonBookmarkParser {
    fn default() -> Self {
        Self::new(100)
    }
}

impl JsonBookmarkParser {
    /// # Arguments
    /// * `max_depth` - Nodes nested deeper than this are dropped
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parses JSON text into a fresh collection.
    ///
    /// # Returns
    /// * `Ok(BookmarkCollection)` - At least one bookmark was found
    /// * `Err(BookmarkError::Parse)` - Syntax error, a scalar root, or no bookmarks
    pub fn parse(&self, text: &str) -> Result<BookmarkCollection> {
        // A walk node at depth d sits at most 2d + 2 JSON levels down
        let levels = self.max_depth.saturating_mul(2).saturating_add(5);
        let data = read_bounded(text, levels)
            .map_err(|e| BookmarkError::Parse(format!("Invalid JSON format: {}", e)))?;

        let mut walk = Walk {
            max_depth: self.max_depth,
            out: BookmarkCollection::new(),
            truncated: 0,
        };

        match &data {
            Value::Object(root) if root.get("roots").is_some_and(Value::is_object) => {
                let roots = root.get("roots").and_then(Value::as_object).into_iter().flatten();
                for (_, top) in roots {
                    let Some(top) = top.as_object() else { continue };
                    let Some(children) = top.get("children").and_then(Value::as_array) else {
                        continue;
                    };
                    let path = match first_text(top, &["name", "title"]) {
                        Some(name) => {
                            walk.out.add_folder(name);
                            name
                        }
                        None => ROOT_FOLDER,
                    };
                    for child in children {
                        walk.node(child, path, 1);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    walk.node(item, ROOT_FOLDER, 0);
                }
            }
            Value::Object(_) => walk.node(&data, ROOT_FOLDER, 0),
            _ => {
                return Err(BookmarkError::Parse(
                    "Invalid bookmark data: Expected object or array".to_string(),
                ))
            }
        }

        if walk.truncated > 0 {
            log::warn!(
                "Maximum nesting depth {} reached, skipped {} nodes",
                self.max_depth,
                walk.truncated
            );
        }
        log::debug!("Parsed {} bookmarks from JSON", walk.out.len());

        if walk.out.is_empty() {
            return Err(BookmarkError::Parse(
                "No valid bookmarks found in the file. Please check the format.".to_string(),
            ));
        }
        Ok(walk.out)
    }
}

/// Reads `text` into a `Value`, replacing everything nested `levels` or more
/// levels down with `Null`. Nesting depth is not limited by serde_json itself.
fn read_bounded(text: &str, levels: usize) -> serde_json::Result<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = Bounded { remaining: levels }.deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

#[derive(Debug, Clone, Copy)]
struct Bounded {
    remaining: usize,
}

impl Bounded {
    fn child(self) -> Self {
        Self {
            remaining: self.remaining.saturating_sub(1),
        }
    }
}

impl<'de> DeserializeSeed<'de> for Bounded {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        if self.remaining == 0 {
            <IgnoredAny as Deserialize>::deserialize(deserializer)?;
            return Ok(Value::Null);
        }
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for Bounded {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        DeserializeSeed::deserialize(self, deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self.child())? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(self.child())?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

/// Parses JSON with the default depth bound.
pub fn parse_json(text: &str) -> Result<BookmarkCollection> {
    JsonBookmarkParser::default().parse(text)
}

struct Walk {
    max_depth: usize,
    out: BookmarkCollection,
    truncated: usize,
}

impl Walk {
    fn node(&mut self, value: &Value, path: &str, depth: usize) {
        if depth > self.max_depth {
            self.truncated += 1;
            return;
        }

        match NodeShape::classify(value) {
            NodeShape::Url(node) => self.url_node(node, path),
            NodeShape::Folder { name, children } => {
                let next = match name {
                    None => path.to_string(),
                    Some(name) if path == ROOT_FOLDER => name.to_string(),
                    Some(name) => join_folder(path, name),
                };
                if name.is_some() {
                    self.out.add_folder(&next);
                }
                for child in children {
                    self.node(child, &next, depth + 1);
                }
            }
            NodeShape::Container(node) => {
                for value in node.values() {
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                self.node(item, path, depth + 1);
                            }
                        }
                        Value::Object(_) => self.node(value, path, depth + 1),
                        _ => {}
                    }
                }
            }
            NodeShape::Opaque => {}
        }
    }

    fn url_node(&mut self, node: &Map<String, Value>, path: &str) {
        let Some(url) = node.get("url").and_then(Value::as_str) else {
            return;
        };
        // Untyped records may carry their own folder, as produced by JSON export
        let folder = match node.get("type") {
            None => node
                .get("folder")
                .and_then(Value::as_str)
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(path),
            Some(_) => path,
        };
        let title = first_text(node, &["title", "name"]);

        if let Some(bookmark) = Bookmark::new(title, url, folder, added_time(node)) {
            self.out.push(bookmark);
        }
    }
}
