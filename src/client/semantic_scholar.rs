use super::{HttpClientConfig, RateLimiter};
use crate::config::SearchConfig;
use crate::discovery::DateWindow;
use crate::resilience::{
    retry_with_policy, CircuitBreaker, CircuitBreakerConfig, RetryConfig, RetryPolicy,
};
use crate::{Error, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Fields requested for every paper
pub const API_FIELDS: &str =
    "title,authors,url,year,publicationDate,externalIds,abstract,isOpenAccess,openAccessPdf";

const SERVICE: &str = "semantic_scholar";

/// One entry of the search response `data` array
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPaper {
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub year: Option<i32>,
    pub authors: Option<Vec<Author>>,
    pub publication_date: Option<String>,
    pub external_ids: Option<ExternalIds>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub is_open_access: Option<bool>,
    pub open_access_pdf: Option<OpenAccessPdf>,
}

impl RawPaper {
    /// Non-empty DOI, if the API returned one
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.external_ids
            .as_ref()
            .and_then(|ids| ids.doi.as_deref())
            .map(str::trim)
            .filter(|doi| !doi.is_empty())
    }

    /// Non-empty open access PDF link, if any
    #[must_use]
    pub fn open_access_url(&self) -> Option<&str> {
        self.open_access_pdf
            .as_ref()
            .and_then(|pdf| pdf.url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub author_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAccessPdf {
    pub url: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    data: Vec<RawPaper>,
}

/// Parameters of one paper search
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub fields_of_study: Vec<String>,
    pub limit: u32,
    pub offset: u32,
    /// Coarse year filter, the API has no day granularity
    pub year: String,
}

impl SearchRequest {
    #[must_use]
    pub fn new(term: &str, fields_of_study: &[String], window: &DateWindow, limit: u32) -> Self {
        Self {
            query: term.to_string(),
            fields_of_study: fields_of_study.to_vec(),
            limit,
            offset: 0,
            year: window.year_filter(),
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query.clone()),
            ("limit", self.limit.to_string()),
            ("fields", API_FIELDS.to_string()),
            ("fieldsOfStudy", self.fields_of_study.join(",")),
            ("offset", self.offset.to_string()),
            ("year", self.year.clone()),
        ]
    }
}

/// Semantic Scholar paper search client
pub struct SearchClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Mutex<RateLimiter>,
    retry_policy: RetryPolicy,
    circuit_breaker: CircuitBreaker,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl SearchClient {
    pub fn new(config: &SearchConfig, api_key: Option<String>) -> Result<Self> {
        let http_client =
            HttpClientConfig::with_timeout(Duration::from_secs(config.timeout_secs)).build()?;

        info!("Initialized search client for {}", config.base_url);

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key,
            rate_limiter: Mutex::new(RateLimiter::new(config.requests_per_second)),
            retry_policy: RetryPolicy::rate_limit_only(RetryConfig::from(&config.retry)),
            circuit_breaker: CircuitBreaker::new(
                SERVICE,
                CircuitBreakerConfig::from(&config.circuit_breaker),
            ),
        })
    }

    /// Run one search, retrying the same request while the API rate limits us.
    ///
    /// Results are returned in API order and are not date filtered.
    #[instrument(skip(self), fields(query = %request.query))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<RawPaper>> {
        let start_time = Instant::now();

        let papers = retry_with_policy(
            || self.circuit_breaker.call(|| self.send_once(request)),
            &self.retry_policy,
            "semantic_scholar_search",
        )
        .await?;

        info!(
            "Search for '{}' returned {} papers in {:?}",
            request.query,
            papers.len(),
            start_time.elapsed()
        );
        Ok(papers)
    }

    async fn send_once(&self, request: &SearchRequest) -> Result<Vec<RawPaper>> {
        self.rate_limiter.lock().await.acquire().await;

        let mut builder = self
            .http_client
            .get(&self.base_url)
            .query(&request.query_pairs());
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!("Search response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            return Err(match retry_after {
                Some(retry_after) => Error::RateLimitExceeded { retry_after },
                None => Error::Api {
                    service: SERVICE.to_string(),
                    status: status.as_u16(),
                    message: "too many requests".to_string(),
                },
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body: SearchResponse = response.json().await?;
        debug!(
            "Search page holds {} of {:?} total results",
            body.data.len(),
            body.total
        );
        Ok(body.data)
    }
}
