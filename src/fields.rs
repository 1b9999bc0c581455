use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

/// Ordered mapping of field name to selector expression.
///
/// Parsed once from the `--fields` grammar (`name:selector`, comma-separated)
/// and immutable afterwards. Duplicate names overwrite the earlier value but
/// keep its position, so output columns stay in the order fields were first
/// declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    /// Parse field definitions like `"name:selector,price:.price::text"`.
    ///
    /// Each pair splits on the first colon; both halves are trimmed. Pairs
    /// without a colon are silently dropped.
    pub fn parse(spec: &str) -> Self {
        let mut map = FieldMap::default();
        for pair in spec.split(',') {
            if let Some((name, selector)) = pair.split_once(':') {
                map.insert(name.trim(), selector.trim());
            }
        }
        map
    }

    pub fn insert(&mut self, name: &str, selector: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = selector.to_string();
        } else {
            self.entries.push((name.to_string(), selector.to_string()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, selector)| selector.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, selector)| (name.as_str(), selector.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extract one field value from a matched element.
///
/// Three expression forms, checked in order:
/// - `sel::text` — trimmed text of the first sub-element matching `sel`,
///   or of the element itself when `sel` is empty
/// - `sel::attr(name)` — the named attribute of the first match
/// - `sel` — trimmed text of the first match
///
/// Absence is `None`, never an error: a missing sub-element, a malformed
/// attribute marker, and an unparsable sub-selector all yield `None`.
pub fn extract_field(element: &ElementRef<'_>, expression: &str) -> Option<String> {
    if expression.contains("::text") {
        let selector = expression.replace("::text", "");
        let target = select_target(element, selector.trim())?;
        return Some(element_text(&target));
    }

    if expression.contains("::attr(") {
        let (selector, attr) = split_attr_expression(expression)?;
        let target = select_target(element, selector.trim())?;
        return target.value().attr(&attr).map(str::to_string);
    }

    let selector = Selector::parse(expression).ok()?;
    let target = element.select(&selector).next()?;
    Some(element_text(&target))
}

/// Split `"a::attr(href)"` into `("a", "href")`. `None` when the marker is
/// malformed (attribute names are word characters only).
fn split_attr_expression(expression: &str) -> Option<(String, String)> {
    let marker = Regex::new(r"^(.*)::attr\((\w+)\)").ok()?;
    let captures = marker.captures(expression)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

/// First sub-element matching `selector`, or the element itself when the
/// selector is empty.
fn select_target<'a>(element: &ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    if selector.is_empty() {
        return Some(*element);
    }
    let selector = Selector::parse(selector).ok()?;
    element.select(&selector).next()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_element<'a>(document: &'a Html, selector: &str) -> ElementRef<'a> {
        let selector = Selector::parse(selector).unwrap();
        document.select(&selector).next().unwrap()
    }

    #[test]
    fn test_parse_field_map() {
        let fields = FieldMap::parse("a:.x,b:.y::text,c:a::attr(href)");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("a"), Some(".x"));
        assert_eq!(fields.get("b"), Some(".y::text"));
        assert_eq!(fields.get("c"), Some("a::attr(href)"));
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_drops_pairs_without_colon() {
        let fields = FieldMap::parse("title:.title,garbage,price:.price");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("title"), Some(".title"));
        assert_eq!(fields.get("price"), Some(".price"));
        assert_eq!(fields.get("garbage"), None);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let fields = FieldMap::parse(" title : .title , link :a::attr(href)");
        assert_eq!(fields.get("title"), Some(".title"));
        assert_eq!(fields.get("link"), Some("a::attr(href)"));
    }

    #[test]
    fn test_parse_duplicate_name_overwrites_in_place() {
        let fields = FieldMap::parse("a:.x,b:.y,a:.z");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("a"), Some(".z"));
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_empty_spec() {
        assert!(FieldMap::parse("").is_empty());
        assert!(FieldMap::parse(",,,").is_empty());
    }

    #[test]
    fn test_extract_text_marker() {
        let document = Html::parse_fragment(
            r#"<div class="card"><span class="title">  Widget  </span></div>"#,
        );
        let card = first_element(&document, ".card");
        assert_eq!(
            extract_field(&card, ".title::text"),
            Some("Widget".to_string())
        );
    }

    #[test]
    fn test_extract_text_marker_without_selector_uses_element_itself() {
        let document = Html::parse_fragment(r#"<div class="card"> Widget </div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, "::text"), Some("Widget".to_string()));
    }

    #[test]
    fn test_extract_text_marker_no_match_returns_none() {
        let document = Html::parse_fragment(r#"<div class="card"><span>x</span></div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, ".missing::text"), None);
    }

    #[test]
    fn test_extract_attribute_marker() {
        let document = Html::parse_fragment(r#"<div class="card"><a href="/x">link</a></div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, "a::attr(href)"), Some("/x".to_string()));
    }

    #[test]
    fn test_extract_attribute_marker_on_element_itself() {
        let document = Html::parse_fragment(r#"<div class="card" id="c1">x</div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, "::attr(id)"), Some("c1".to_string()));
    }

    #[test]
    fn test_extract_attribute_marker_missing_attribute_returns_none() {
        let document = Html::parse_fragment(r#"<div class="card"><a>no href</a></div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, "a::attr(href)"), None);
    }

    #[test]
    fn test_extract_malformed_attribute_marker_returns_none() {
        let document = Html::parse_fragment(
            r#"<div class="card"><img data-src="/i.jpg" src="/i.jpg"></div>"#,
        );
        let card = first_element(&document, ".card");
        // Hyphens are outside the marker grammar.
        assert_eq!(extract_field(&card, "img::attr(data-src)"), None);
    }

    #[test]
    fn test_extract_plain_selector_returns_text() {
        let document = Html::parse_fragment(
            r#"<div class="card"><span class="price"> $5 </span></div>"#,
        );
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, ".price"), Some("$5".to_string()));
    }

    #[test]
    fn test_extract_plain_selector_no_match_returns_none() {
        let document = Html::parse_fragment(r#"<div class="card">x</div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, ".missing"), None);
    }

    #[test]
    fn test_extract_invalid_selector_returns_none() {
        let document = Html::parse_fragment(r#"<div class="card">x</div>"#);
        let card = first_element(&document, ".card");
        assert_eq!(extract_field(&card, "???"), None);
        assert_eq!(extract_field(&card, ""), None);
    }
}
