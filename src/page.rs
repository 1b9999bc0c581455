use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};

/// One fetched page.
///
/// Browser-driven fetches do not surface an HTTP status, so `status` is
/// optional; the caller's status check only applies when one is present.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: Option<u16>,
    pub body: String,
}

impl Page {
    pub fn new(url: impl Into<String>, status: Option<u16>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// All elements matching a user-supplied selector, in document order.
/// An unparsable selector is an error here, unlike the per-field selectors.
pub fn select_all<'a>(document: &'a Html, selector: &str) -> Result<Vec<ElementRef<'a>>> {
    let parsed =
        Selector::parse(selector).map_err(|e| anyhow!("invalid selector '{selector}': {e}"))?;
    Ok(document.select(&parsed).collect())
}

/// First element matching a user-supplied selector.
pub fn select_first<'a>(document: &'a Html, selector: &str) -> Result<Option<ElementRef<'a>>> {
    let parsed =
        Selector::parse(selector).map_err(|e| anyhow!("invalid selector '{selector}': {e}"))?;
    Ok(document.select(&parsed).next())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAGE: &str = r#"
        <html><body>
            <ul>
                <li class="item">one</li>
                <li class="item">two</li>
            </ul>
        </body></html>
    "#;

    #[test]
    fn test_select_all_in_document_order() {
        let page = Page::new("https://example.com", Some(200), LIST_PAGE);
        let document = page.document();
        let items = select_all(&document, ".item").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text().collect::<String>(), "one");
    }

    #[test]
    fn test_select_first() {
        let page = Page::new("https://example.com", Some(200), LIST_PAGE);
        let document = page.document();
        let first = select_first(&document, ".item").unwrap();
        assert_eq!(first.unwrap().text().collect::<String>(), "one");
        assert!(select_first(&document, ".missing").unwrap().is_none());
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let page = Page::new("https://example.com", Some(200), LIST_PAGE);
        let document = page.document();
        assert!(select_all(&document, "???").is_err());
        assert!(select_first(&document, "???").is_err());
    }
}
