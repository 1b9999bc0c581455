use anyhow::{Context, Result};
use scraper::{ElementRef, Html};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

use crate::fetch::{self, FetchOptions, FetcherKind};
use crate::fields::{FieldMap, extract_field};
use crate::page::{select_all, select_first};
use crate::similar::{SIMILARITY_THRESHOLD, find_similar};

/// Everything one scrape run needs. Built once by the CLI driver.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub url: String,
    pub item_selector: String,
    pub fields: FieldMap,
    #[serde(default)]
    pub fetcher: FetcherKind,
    #[serde(default)]
    pub options: FetchOptions,
}

/// One extracted item: field name to value, in field-map order.
/// Serializes as a JSON object whose keys keep that order; missing values
/// become `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.fields.iter().map(|(_, value)| value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Scrape a single page and extract one record per matched item element.
pub async fn scrape_page(config: &ScrapeConfig) -> Result<Vec<Record>> {
    let page = fetch::fetch(config.fetcher, &config.url, &config.options)
        .await
        .with_context(|| format!("failed to fetch {}", config.url))?;

    if let Some(status) = page.status {
        if status >= 400 {
            log::warn!("HTTP {status} response from {}", page.url);
        }
    }

    let document = page.document();
    let elements = collect_items(&document, &config.item_selector, config.options.adaptive)?;
    Ok(extract_records(&elements, &config.fields))
}

/// Select item elements with the primary selector. A fully empty result with
/// adaptive mode on falls back to similarity matching against a reference
/// element re-selected with the plain selector; partial matches never
/// trigger the fallback.
pub fn collect_items<'a>(
    document: &'a Html,
    item_selector: &str,
    adaptive: bool,
) -> Result<Vec<ElementRef<'a>>> {
    let elements = select_all(document, item_selector)?;

    if elements.is_empty() && adaptive {
        if let Some(similar) = similar_fallback(document, item_selector)? {
            return Ok(similar);
        }
    }

    Ok(elements)
}

/// The adaptive fallback: broaden the match set around one reference
/// element. `None` when no reference is available.
pub fn similar_fallback<'a>(
    document: &'a Html,
    item_selector: &str,
) -> Result<Option<Vec<ElementRef<'a>>>> {
    let Some(reference) = select_first(document, item_selector)? else {
        return Ok(None);
    };
    let similar = find_similar(document, reference, SIMILARITY_THRESHOLD);
    log::info!("Similarity fallback matched {} elements", similar.len());
    Ok(Some(similar))
}

/// Run the field extractor over each matched element, one record per element
/// in document order.
pub fn extract_records(elements: &[ElementRef<'_>], fields: &FieldMap) -> Vec<Record> {
    elements
        .iter()
        .map(|element| {
            let mut record = Record::default();
            for (name, expression) in fields.iter() {
                record.insert(name, extract_field(element, expression));
            }
            record
        })
        .collect()
}
