use super::{sanitize_title, DateWindow};
use crate::client::{Doi, RawPaper};
use chrono::NaiveDate;
use tracing::debug;

/// What content can be obtained for a paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The API advertises an open access link, the DOI is kept as a fallback
    PdfLink { url: String, doi: Option<Doi> },
    /// No link, but the DOI landing page can be rendered
    DoiOnly(Doi),
}

/// A paper that passed the date and availability filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperCandidate {
    /// Filesystem-safe title, used as the file stem
    pub title: String,
    pub availability: Availability,
    pub abstract_text: Option<String>,
    pub publication_date: NaiveDate,
}

impl PaperCandidate {
    #[must_use]
    pub fn pdf_url(&self) -> Option<&str> {
        match &self.availability {
            Availability::PdfLink { url, .. } => Some(url),
            Availability::DoiOnly(_) => None,
        }
    }

    #[must_use]
    pub const fn doi(&self) -> Option<&Doi> {
        match &self.availability {
            Availability::PdfLink { doi, .. } => doi.as_ref(),
            Availability::DoiOnly(doi) => Some(doi),
        }
    }
}

/// Narrows raw search results to acquisition-eligible candidates
#[derive(Debug, Clone)]
pub struct DateAndAvailabilityFilter {
    window: DateWindow,
}

impl DateAndAvailabilityFilter {
    #[must_use]
    pub const fn new(window: DateWindow) -> Self {
        Self { window }
    }

    #[must_use]
    pub const fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Keep the eligible results, in their original order
    #[must_use]
    pub fn apply(&self, papers: &[RawPaper]) -> Vec<PaperCandidate> {
        papers.iter().filter_map(|paper| self.classify(paper)).collect()
    }

    /// Classify a single raw result, `None` when it is not eligible
    #[must_use]
    pub fn classify(&self, paper: &RawPaper) -> Option<PaperCandidate> {
        let publication_date = paper
            .publication_date
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())?;

        if !self.window.contains(publication_date) {
            return None;
        }

        let doi = paper.doi().and_then(|raw| match Doi::new(raw) {
            Ok(doi) => Some(doi),
            Err(e) => {
                debug!("Ignoring malformed DOI '{}': {}", raw, e);
                None
            }
        });

        let availability = match (paper.open_access_url(), doi) {
            (Some(url), doi) => Availability::PdfLink {
                url: url.to_string(),
                doi,
            },
            (None, Some(doi)) => Availability::DoiOnly(doi),
            (None, None) => {
                debug!(
                    "Dropping '{}': neither a PDF link nor a DOI",
                    paper.title.as_deref().unwrap_or_default()
                );
                return None;
            }
        };

        let title = paper.title.as_deref().and_then(sanitize_title)?;
        let abstract_text = paper
            .abstract_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        Some(PaperCandidate {
            title,
            availability,
            abstract_text,
            publication_date,
        })
    }
}
