use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use clap::ValueEnum;
use futures::StreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::page::Page;

/// User agent rotation for the plain HTTP fetcher.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

pub fn get_random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("challenge page did not clear within {0}s")]
    ChallengeTimeout(u64),
}

/// The closed set of fetch strategies.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Plain HTTP GET.
    #[default]
    Basic,
    /// Headless browser; waits for the page to settle after navigation.
    Dynamic,
    /// Headless browser with anti-automation flags and humanized pacing.
    Stealth,
}

/// Per-invocation fetch configuration. Adaptive mode lives here rather than
/// in any process-wide state, so repeated invocations stay independent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub headless: bool,
    pub disable_resources: bool,
    pub adaptive: bool,
    pub solve_cloudflare: bool,
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            disable_resources: false,
            adaptive: false,
            solve_cloudflare: false,
            timeout_secs: 30,
        }
    }
}

/// Fetch one page with the selected strategy.
pub async fn fetch(kind: FetcherKind, url: &str, options: &FetchOptions) -> Result<Page, FetchError> {
    match kind {
        FetcherKind::Basic => fetch_basic(url, options).await,
        FetcherKind::Dynamic | FetcherKind::Stealth => fetch_browser(kind, url, options).await,
    }
}

async fn fetch_basic(url: &str, options: &FetchOptions) -> Result<Page, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs))
        .cookie_store(true)
        .build()?;

    let response = client
        .get(url)
        .header("User-Agent", get_random_user_agent())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.5")
        .send()
        .await?;

    // Error statuses are reported by the caller, not treated as failures.
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(Page::new(url, Some(status), body))
}

async fn fetch_browser(
    kind: FetcherKind,
    url: &str,
    options: &FetchOptions,
) -> Result<Page, FetchError> {
    // Challenge solving needs room for the interstitial to clear.
    let timeout_secs = if kind == FetcherKind::Stealth && options.solve_cloudflare {
        60
    } else {
        options.timeout_secs
    };

    let mut builder = BrowserConfig::builder()
        .window_size(1280, 1024)
        .request_timeout(Duration::from_secs(timeout_secs))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-dev-shm-usage");

    if kind == FetcherKind::Stealth {
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--exclude-switches=enable-automation")
            .arg("--disable-infobars")
            .arg(format!("--user-agent={}", get_random_user_agent()));
    }

    if options.disable_resources {
        builder = builder
            .arg("--blink-settings=imagesEnabled=false")
            .arg("--disable-remote-fonts");
    }

    if options.headless {
        builder = builder.arg("--headless").arg("--disable-gpu");
    } else {
        builder = builder.with_head();
    }

    let config = builder.build().map_err(FetchError::Browser)?;
    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| FetchError::Browser(format!("failed to launch browser: {e}")))?;

    let events = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                log::debug!("browser handler event error: {e}");
            }
        }
    });

    let body = navigate(&browser, kind, url, options, timeout_secs).await;

    if let Err(e) = browser.close().await {
        log::debug!("browser close failed: {e}");
    }
    let _ = browser.wait().await;
    events.abort();

    Ok(Page::new(url, None, body?))
}

async fn navigate(
    browser: &Browser,
    kind: FetcherKind,
    url: &str,
    options: &FetchOptions,
    timeout_secs: u64,
) -> Result<String, FetchError> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| FetchError::Browser(format!("failed to open {url}: {e}")))?;

    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        page.wait_for_navigation(),
    )
    .await
    {
        Ok(Err(e)) => return Err(FetchError::Browser(format!("navigation failed: {e}"))),
        Ok(Ok(_)) => {}
        Err(_) => log::debug!("navigation wait timed out for {url}, using current DOM"),
    }

    if kind == FetcherKind::Dynamic {
        // Give late XHR-driven DOM work a moment to land.
        tokio::time::sleep(Duration::from_millis(1_000)).await;
    }

    if kind == FetcherKind::Stealth {
        let pause = {
            let mut rng = rand::rng();
            rng.random_range(400..=1400)
        };
        tokio::time::sleep(Duration::from_millis(pause)).await;
        let _ = page.evaluate("window.scrollBy(0, 600)").await;

        if options.solve_cloudflare {
            let deadline = Instant::now() + Duration::from_secs(timeout_secs);
            loop {
                let body = page
                    .content()
                    .await
                    .map_err(|e| FetchError::Browser(format!("failed to read page: {e}")))?;
                if !is_challenge_page(&body) {
                    return Ok(body);
                }
                if Instant::now() >= deadline {
                    return Err(FetchError::ChallengeTimeout(timeout_secs));
                }
                log::debug!("challenge page still up, waiting");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    page.content()
        .await
        .map_err(|e| FetchError::Browser(format!("failed to read page: {e}")))
}

/// Markers of an unsolved Cloudflare interstitial.
fn is_challenge_page(body: &str) -> bool {
    body.contains("Just a moment")
        || body.contains("Checking your browser")
        || body.contains("cf-browser-verification")
        || body.contains("challenge-platform")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent() {
        let agent = get_random_user_agent();
        assert!(!agent.is_empty());
        assert!(USER_AGENTS.contains(&agent));
    }

    #[test]
    fn test_fetch_options_default() {
        let options = FetchOptions::default();
        assert!(options.headless);
        assert!(!options.adaptive);
        assert!(!options.solve_cloudflare);
        assert_eq!(options.timeout_secs, 30);
    }

    #[test]
    fn test_fetcher_kind_default_is_basic() {
        assert_eq!(FetcherKind::default(), FetcherKind::Basic);
    }

    #[test]
    fn test_fetcher_kind_from_json() {
        let kind: FetcherKind = serde_json::from_str(r#""stealth""#).unwrap();
        assert_eq!(kind, FetcherKind::Stealth);
    }

    #[test]
    fn test_challenge_page_detection() {
        assert!(is_challenge_page("<title>Just a moment...</title>"));
        assert!(is_challenge_page("<div id=\"cf-browser-verification\"></div>"));
        assert!(!is_challenge_page("<html><body>Products</body></html>"));
    }
}
