// List Scraper Library
//
// Fetches a single list page with one of three fetcher strategies, extracts
// repeated items via CSS selectors with an optional similarity-based
// fallback, and exports the results as JSON or CSV.

pub mod fetch;
pub mod fields;
pub mod output;
pub mod page;
pub mod scrape;
pub mod similar;

// Re-export main types for convenience
pub use fetch::{FetchError, FetchOptions, FetcherKind, USER_AGENTS, get_random_user_agent};
pub use fields::{FieldMap, extract_field};
pub use output::{OutputFormat, save_output, to_csv, to_json};
pub use page::Page;
pub use scrape::{Record, ScrapeConfig, collect_items, extract_records, scrape_page};
pub use similar::{SIMILARITY_THRESHOLD, find_similar};
