// src/services/quotes.rs

//! Quotation page fetcher.
//!
//! Loads listing pages over HTTP (or through a Browserless-style rendering
//! service when one is configured) and extracts quotation records with the
//! configured CSS selectors.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, QuoteSelectors, RendererConfig, ScrapedQuote, ScraperConfig};
use crate::services::fetcher::{FetchedPage, PageFetcher, PageSnapshot};
use crate::services::fingerprint::fingerprint;
use crate::utils::http::{create_client, service_endpoint};
use crate::utils::resolve_url;

/// Typographic quote marks wrapped around quotation text on the page.
const QUOTE_MARKS: &[char] = &['“', '”', '"'];

/// Result of running the selectors over one document.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Number of quote blocks matched, including unreadable ones
    pub quote_blocks: usize,
    pub page: FetchedPage,
}

/// Compiled selectors for the quotation listing.
#[derive(Debug, Clone)]
pub struct QuoteExtractor {
    quote: Selector,
    text: Selector,
    author: Selector,
    author_link: Selector,
    tag: Selector,
    next: Selector,
}

impl QuoteExtractor {
    pub fn new(selectors: &QuoteSelectors) -> Result<Self> {
        Ok(Self {
            quote: parse_selector(&selectors.quote)?,
            text: parse_selector(&selectors.text)?,
            author: parse_selector(&selectors.author)?,
            author_link: parse_selector(&selectors.author_link)?,
            tag: parse_selector(&selectors.tag)?,
            next: parse_selector(&selectors.next)?,
        })
    }

    /// Extract every quote block and the next-page link from `html`.
    pub fn extract(&self, html: &str, page_url: &Url) -> Extraction {
        let document = Html::parse_document(html);

        let mut quote_blocks = 0;
        let mut records = Vec::new();
        for block in document.select(&self.quote) {
            quote_blocks += 1;
            records.push(self.parse_quote(&block, page_url));
        }

        let next_url = document
            .select(&self.next)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_url(page_url, href));

        Extraction {
            quote_blocks,
            page: FetchedPage::new(records, next_url),
        }
    }

    fn parse_quote(&self, block: &ElementRef, page_url: &Url) -> Result<ScrapedQuote> {
        let text = block
            .select(&self.text)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::extraction("quote block without text"))?;

        let author = block
            .select(&self.author)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::extraction(format!("quote without author: {text}")))?;

        let author_url = block
            .select(&self.author_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_url(page_url, href));

        let tags = block
            .select(&self.tag)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(ScrapedQuote {
            quote_id: fingerprint(&text, &author),
            text,
            author,
            author_url,
            tags,
        })
    }
}

/// Trim whitespace and the surrounding quote marks.
fn clean_text(raw: &str) -> String {
    raw.trim().trim_matches(QUOTE_MARKS).trim().to_string()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Last body received by the session.
#[derive(Debug, Clone)]
struct LastResponse {
    url: String,
    body: String,
}

/// `PageFetcher` backed by an HTTP session.
pub struct HttpQuoteFetcher {
    scraper: ScraperConfig,
    renderer: RendererConfig,
    extractor: QuoteExtractor,
    client: Option<Client>,
    last: Option<LastResponse>,
}

impl HttpQuoteFetcher {
    /// Create a fetcher; the HTTP session is only built on first use.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            scraper: config.scraper.clone(),
            renderer: config.renderer.clone(),
            extractor: QuoteExtractor::new(&config.selectors)?,
            client: None,
            last: None,
        })
    }

    /// Whether a session is currently held.
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn session(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        log::debug!("Opening HTTP session (timeout {}s)", self.scraper.timeout_secs);
        let client = create_client(&self.scraper)?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Fetch raw markup, rendered if a rendering service is configured.
    async fn load(&mut self, url: &str) -> Result<String> {
        let client = self.session()?;

        let request = match &self.renderer.endpoint {
            Some(base) => {
                let endpoint = service_endpoint(base, "content", self.renderer.token.as_deref())?;
                client
                    .post(endpoint)
                    .json(&serde_json::json!({ "url": url }))
            }
            None => client.get(url),
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::navigation(url, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::navigation(url, e))?;

        self.last = Some(LastResponse {
            url: url.to_string(),
            body: body.clone(),
        });

        if !status.is_success() {
            return Err(AppError::navigation(url, format!("HTTP status {status}")));
        }
        Ok(body)
    }

    async fn screenshot(&mut self, url: &str) -> Option<Vec<u8>> {
        let base = self.renderer.endpoint.clone()?;
        let client = self.session().ok()?;
        let endpoint =
            service_endpoint(&base, "screenshot", self.renderer.token.as_deref()).ok()?;

        let body = serde_json::json!({
            "url": url,
            "options": { "fullPage": true, "type": "png" },
        });
        let result = async {
            let response = client.post(endpoint).json(&body).send().await?;
            response.error_for_status()?.bytes().await
        }
        .await;

        match result {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                log::warn!("Screenshot of {} failed: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpQuoteFetcher {
    async fn fetch_page(&mut self, url: &str) -> Result<FetchedPage> {
        // a next link that will not parse is a page that cannot be reached
        let page_url = Url::parse(url).map_err(|e| AppError::navigation(url, e))?;
        let body = self.load(url).await?;

        let extraction = self.extractor.extract(&body, &page_url);
        if extraction.quote_blocks == 0 {
            return Err(AppError::navigation(url, "no quote blocks rendered"));
        }
        Ok(extraction.page)
    }

    async fn partial_page(&mut self, url: &str) -> Option<FetchedPage> {
        let last = self.last.as_ref().filter(|last| last.url == url)?;
        let page_url = Url::parse(url).ok()?;
        Some(self.extractor.extract(&last.body, &page_url).page)
    }

    async fn snapshot(&mut self, url: &str) -> PageSnapshot {
        let markup = self
            .last
            .as_ref()
            .filter(|last| last.url == url)
            .map(|last| last.body.clone());
        let image = self.screenshot(url).await;
        PageSnapshot { markup, image }
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            log::debug!("HTTP session closed");
        }
        self.last = None;
    }
}
