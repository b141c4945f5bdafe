pub mod rate_limiter;
pub mod semantic_scholar;

pub use rate_limiter::RateLimiter;
pub use semantic_scholar::{ExternalIds, OpenAccessPdf, RawPaper, SearchClient, SearchRequest};

use crate::Result;
use std::time::Duration;

/// HTTP client configuration shared by the remote collaborators
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: concat!("beholder/", env!("CARGO_PKG_VERSION"), " (Literature Review Bot)")
                .to_string(),
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest` client from this configuration
    pub fn build(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .gzip(true)
            .user_agent(&self.user_agent)
            .build()
            .map_err(crate::Error::Http)
    }
}

/// DOI (Digital Object Identifier) wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Doi(String);

impl Doi {
    /// Create a new DOI from a string, validating the format
    pub fn new(doi: &str) -> Result<Self> {
        let cleaned = doi
            .trim()
            .trim_start_matches("doi:")
            .trim_start_matches("https://doi.org/");

        if cleaned.is_empty() {
            return Err(crate::Error::InvalidInput {
                field: "doi".to_string(),
                reason: "DOI cannot be empty".to_string(),
            });
        }

        if !cleaned.contains('/') {
            return Err(crate::Error::InvalidInput {
                field: "doi".to_string(),
                reason: "DOI must contain a '/' character".to_string(),
            });
        }

        Ok(Self(cleaned.to_string()))
    }

    /// Get the DOI string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Landing page URL behind the given resolver prefix
    #[must_use]
    pub fn resolver_url(&self, resolver: &str) -> String {
        format!("{}{}", resolver, self.0)
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Doi {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_cleanup() {
        let doi = Doi::new("  https://doi.org/10.1145/3597503.3639187 ").unwrap();
        assert_eq!(doi.as_str(), "10.1145/3597503.3639187");
        assert_eq!(
            doi.resolver_url("https://doi.org/"),
            "https://doi.org/10.1145/3597503.3639187"
        );
    }

    #[test]
    fn test_doi_rejects_garbage() {
        assert!(Doi::new("").is_err());
        assert!(Doi::new("doi:").is_err());
        assert!("no-slash-here".parse::<Doi>().is_err());
    }
}
