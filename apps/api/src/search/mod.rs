//! Best-effort deep search: link discovery, page fetch, and structured
//! vacancy extraction.
//!
//! Both fan-out stages (fetch, extract) launch one task per item and await
//! all of them before moving on; a failed item contributes nothing instead of
//! aborting the batch. No retry, no ordering guarantee across items.

use async_trait::async_trait;
use futures_util::future::join_all;
use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{call_json, prompts, ChatModel};
use crate::models::vacancy::{Vacancy, VacancyResponse};

/// Candidate links requested from the link-search collaborator per query.
pub const LINK_COUNT: usize = 3;

/// Per-link fetch budget; a slow page is dropped, not retried.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search returned status {0}")]
    Status(u16),
}

/// External link-search collaborator: finds candidate pages for a query and
/// fetches raw page bodies.
#[async_trait]
pub trait LinkSearch: Send + Sync {
    async fn links(&self, query: &str, size: usize) -> Result<Vec<String>, SearchError>;
    async fn page(&self, url: &str) -> Result<String, SearchError>;
}

/// DuckDuckGo HTML endpoint. Result anchors carry redirector links with the
/// real target doubly percent-encoded in the `uddg` parameter.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(15))
                .user_agent("Mozilla/5.0 (compatible; DeepSearchBot/1.0)")
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }
}

#[async_trait]
impl LinkSearch for DuckDuckGoSearch {
    async fn links(&self, query: &str, size: usize) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(parse_result_links(&body, size))
    }

    async fn page(&self, url: &str) -> Result<String, SearchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

fn parse_result_links(body: &str, size: usize) -> Vec<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("a.result__a").expect("static selector");
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .take(size)
        .collect()
}

/// Extracts the real target URL from a redirector-style link
/// (`...uddg=<doubly-encoded-url>&...`). Best-effort: when the parameter is
/// absent or decoding fails, the original string is returned unchanged.
pub fn decode_redirect_link(link: &str) -> String {
    let Some(encoded) = link.split("uddg=").nth(1) else {
        return link.to_string();
    };
    let encoded = encoded.split('&').next().unwrap_or(encoded);

    let first = match percent_decode_str(encoded).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(e) => {
            warn!("error decoding link {link}: {e}");
            return link.to_string();
        }
    };
    match percent_decode_str(&first).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(e) => {
            warn!("error decoding link {link}: {e}");
            link.to_string()
        }
    }
}

/// Strips markup down to whitespace-normalized body text.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse("body").expect("static selector");
    let text: Vec<String> = match document.select(&selector).next() {
        Some(body) => body.text().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect(),
        None => document
            .root_element()
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    };
    text.join(" ")
}

fn clean_query(query: &str) -> String {
    query
        .trim()
        .trim_end_matches('.')
        .trim_matches('"')
        .to_string()
}

/// Two-phase fan-out retriever over the link-search collaborator and the
/// structured-extraction model.
pub struct DeepSearch {
    model: Arc<dyn ChatModel>,
    search: Arc<dyn LinkSearch>,
    fetch_timeout: Duration,
}

impl DeepSearch {
    pub fn new(model: Arc<dyn ChatModel>, search: Arc<dyn LinkSearch>) -> Self {
        Self {
            model,
            search,
            fetch_timeout: FETCH_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Converts a free-text query into extracted vacancies. Only the initial
    /// link search can fail the call; every per-item failure downstream is
    /// converted to absence.
    pub async fn deep_search(&self, query: &str) -> Result<Vec<Vacancy>, SearchError> {
        let query = clean_query(query);
        info!("deep search started for query: {query}");

        let links = self.search.links(&query, LINK_COUNT).await?;
        info!("deep search links: {links:?}");

        // Stage one: fetch all pages concurrently, dropping failures.
        let pages: Vec<(String, String)> = join_all(
            links
                .iter()
                .map(|link| decode_redirect_link(link))
                .map(|link| async move {
                    debug!("start parsing: {link}");
                    match tokio::time::timeout(self.fetch_timeout, self.search.page(&link)).await {
                        Ok(Ok(html)) => Some((link, html_to_text(&html))),
                        Ok(Err(e)) => {
                            warn!("failure link {link}: {e}");
                            None
                        }
                        Err(_) => {
                            warn!("fetch timed out: {link}");
                            None
                        }
                    }
                }),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        // Stage two: extract vacancies from every surviving page concurrently.
        let vacancies: Vec<Vacancy> = join_all(pages.into_iter().map(|(link, page)| async move {
            debug!("start extraction: {link}");
            match call_json::<Vec<VacancyResponse>>(
                self.model.as_ref(),
                prompts::VACANCY_EXTRACT_SYSTEM,
                &page,
            )
            .await
            {
                Ok(responses) => responses
                    .into_iter()
                    .map(|r| Vacancy::from_response(r, &link))
                    .collect(),
                Err(e) => {
                    warn!("extraction failed for {link}: {e}");
                    Vec::new()
                }
            }
        }))
        .await
        .into_iter()
        .flatten()
        .collect();

        info!("deep search produced {} vacancies", vacancies.len());
        Ok(vacancies)
    }
}
