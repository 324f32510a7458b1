//! Highwire Press `<meta name="citation_*">` extraction.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
};

use once_cell::sync::Lazy;
use quick_xml::escape::resolve_html5_entity;
use regex::Regex;

use crate::{
    error::{Error, Result},
    report::{Reporter, TracingReporter},
};

/// The tag that may repeat, once per author.
pub const AUTHOR_TAG: &str = "author";

/// Auxiliary tag types that carry nothing used for classification.
const EXCLUDED_TAGS: [&str; 3] = ["reference", "abstract", "author_institution"];

/// Value of one extracted tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Single(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        TagValue::Single(s)
    }
}

impl From<Vec<String>> for TagValue {
    fn from(v: Vec<String>) -> Self {
        TagValue::List(v)
    }
}

impl From<Vec<&str>> for TagValue {
    fn from(v: Vec<&str>) -> Self {
        TagValue::List(v.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TagValue {
    fn from(v: [&str; N]) -> Self {
        TagValue::List(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Tag name (without the `citation_` prefix) to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap(BTreeMap<String, TagValue>);

impl TagMap {
    pub fn new() -> Self {
        TagMap::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<TagValue>) {
        self.0.insert(tag.into(), value.into());
    }

    /// Builder form of [`TagMap::insert`].
    pub fn with(mut self, tag: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.insert(tag, value);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&TagValue> {
        self.0.get(tag)
    }

    pub fn remove(&mut self, tag: &str) -> Option<TagValue> {
        self.0.remove(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<TagValue>> FromIterator<(K, V)> for TagMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        TagMap(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
struct MetaTag {
    name: String,
    content: Option<String>,
}

// quoted attribute values may contain a raw `>`
static META_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<meta\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap());
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    // key="value" or key='value'; no backreferences in Rust regex
    Regex::new(r#"(?i)([a-zA-Z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static TAG_TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^citation_([A-Za-z_]+)$").unwrap());

/// Extract every Highwire tag from `html`, reporting per-field fallbacks through `tracing`.
pub fn extract_tags(html: &str) -> Result<TagMap> {
    extract_tags_with(html, &TracingReporter)
}

/// Extract every Highwire tag from `html`.
///
/// Authors are collected from every `citation_author` occurrence, in document order. Any
/// other tag takes the first occurrence carrying a `content` attribute; a tag that never
/// carries one is stored as an empty string. Values are HTML-unescaped.
pub fn extract_tags_with(html: &str, reporter: &dyn Reporter) -> Result<TagMap> {
    let metas = collect_citation_meta(html);
    if metas.is_empty() {
        return Err(Error::NoMetadataFound);
    }

    let types: BTreeSet<&str> = metas
        .iter()
        .map(|m| m.name.as_str())
        .filter(|t| !EXCLUDED_TAGS.contains(t))
        .collect();

    let mut map = TagMap::new();
    for ty in types {
        if ty == AUTHOR_TAG {
            let authors = metas
                .iter()
                .filter(|m| m.name == AUTHOR_TAG)
                .filter_map(|m| m.content.as_deref())
                .map(|c| unescape(c).into_owned())
                .collect::<Vec<_>>();
            map.insert(ty, authors);
            continue;
        }

        let value = match metas
            .iter()
            .filter(|m| m.name == ty)
            .find_map(|m| m.content.as_deref())
        {
            Some(c) => unescape(c).into_owned(),
            None => {
                reporter.field_fallback(ty, "no content attribute");
                String::new()
            }
        };
        map.insert(ty, value);
    }
    Ok(map)
}

/// `citation_*` meta elements, with the prefix stripped from the name.
fn collect_citation_meta(html: &str) -> Vec<MetaTag> {
    META_TAG_RE
        .find_iter(html)
        .filter_map(|m| parse_meta_tag(m.as_str()))
        .collect()
}

fn parse_meta_tag(tag: &str) -> Option<MetaTag> {
    let mut name = None;
    let mut content = None;
    for cap in ATTR_RE.captures_iter(tag) {
        let key = &cap[1];
        let val = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
        if let Some(val) = val {
            match key.to_ascii_lowercase().as_str() {
                "name" => name = Some(val),
                "content" => content = Some(val.to_string()),
                _ => {}
            }
        }
    }
    let ty = TAG_TYPE_RE.captures(name?.trim())?.get(1)?.as_str().to_string();
    Some(MetaTag { name: ty, content })
}

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

/// HTML entity decoding, one entity at a time. Unknown or broken entities are kept as written.
fn unescape(raw: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(raw, |caps: &regex::Captures<'_>| {
        let body = &caps[1];
        let decoded = match body.strip_prefix('#') {
            Some(num) => {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse().ok(),
                };
                code.and_then(char::from_u32).map(String::from)
            }
            None => resolve_html5_entity(body).map(str::to_string),
        };
        decoded.unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testing::{Notice, Recorder};

    const PAGE: &str = r#"<html><head>
        <meta name="citation_title" content="Spin &amp; orbit">
        <meta name="citation_author" content="Jos&eacute; Q Garc&#237;a">
        <meta name="citation_author_institution" content="Somewhere U">
        <meta name="citation_author" content="Bob Lee">
        <meta content="Nature" name="citation_journal_title" />
        <meta name='citation_volume' content='12'>
        <meta name="citation_volume" content="99">
        <meta name="citation_abstract" content="Long text">
        <meta name="citation_reference" content="citation_title=Other">
        <meta name="description" content="not highwire">
        </head></html>"#;

    #[test]
    fn collects_scalars_and_authors() {
        let map = extract_tags_with(PAGE, &Recorder::default()).unwrap();
        assert_eq!(map.get("title"), Some(&TagValue::from("Spin & orbit")));
        assert_eq!(
            map.get("author"),
            Some(&TagValue::from(vec!["José Q García", "Bob Lee"]))
        );
        assert_eq!(map.get("journal_title"), Some(&TagValue::from("Nature")));
        assert_eq!(map.get("volume"), Some(&TagValue::from("12")));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn auxiliary_tags_are_excluded() {
        let map = extract_tags_with(PAGE, &Recorder::default()).unwrap();
        for t in EXCLUDED_TAGS {
            assert!(!map.contains(t), "{t} should be excluded");
        }
        assert!(!map.contains("description"));
    }

    #[test]
    fn no_tags_is_an_error() {
        assert!(matches!(extract_tags(""), Err(Error::NoMetadataFound)));
        assert!(matches!(
            extract_tags(r#"<meta name="dc.title" content="x">"#),
            Err(Error::NoMetadataFound)
        ));
    }

    #[test]
    fn only_excluded_tags_gives_empty_map() {
        let map = extract_tags(r#"<meta name="citation_abstract" content="x">"#).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn missing_content_falls_back_to_empty() {
        let rec = Recorder::default();
        let html = r#"<meta name="citation_issue"><meta name="citation_doi" content="10.1/x">"#;
        let map = extract_tags_with(html, &rec).unwrap();
        assert_eq!(map.get("issue"), Some(&TagValue::from("")));
        assert_eq!(map.get("doi"), Some(&TagValue::from("10.1/x")));
        assert_eq!(rec.notices(), vec![Notice::Fallback("issue".to_string())]);
    }

    #[test]
    fn unknown_entities_are_left_alone() {
        assert_eq!(unescape("A &bogus; B"), "A &bogus; B");
        assert_eq!(unescape("&lt;i&gt;"), "<i>");
        assert_eq!(unescape("&#233;&#xE9;&#xffffffff;"), "éé&#xffffffff;");
    }

    #[test]
    fn stray_ampersand_does_not_block_other_entities() {
        let html = r#"<meta name="citation_title" content="AT&T &amp; Bell Labs">
            <meta name="citation_publisher" content="Wiley &bogus; &amp; Sons">"#;
        let map = extract_tags(html).unwrap();
        assert_eq!(map.get("title"), Some(&TagValue::from("AT&T & Bell Labs")));
        assert_eq!(
            map.get("publisher"),
            Some(&TagValue::from("Wiley &bogus; & Sons"))
        );
    }

    #[test]
    fn angle_bracket_inside_quoted_content() {
        let rec = Recorder::default();
        let html = r#"<meta name="citation_title" content="When p > 0.05 matters">
            <meta name='citation_doi' content='10.1/a>b'>"#;
        let map = extract_tags_with(html, &rec).unwrap();
        assert_eq!(map.get("title"), Some(&TagValue::from("When p > 0.05 matters")));
        assert_eq!(map.get("doi"), Some(&TagValue::from("10.1/a>b")));
        assert!(rec.notices().is_empty());
    }

    #[test]
    fn tag_map_from_pairs() {
        let map: TagMap = [("title", "T"), ("doi", "D")].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["doi", "title"]
        );
    }
}
