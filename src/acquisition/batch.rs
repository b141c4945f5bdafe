use super::{AcquisitionOutcome, TieredAcquisitionEngine};
use crate::client::{SearchClient, SearchRequest};
use crate::discovery::{DateAndAvailabilityFilter, DateWindow};
use crate::Result;
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

/// Titles containing this are preprint/abstract cards, not papers
const ABSTRACT_CARD_MARKER: &str = "Abstract";

/// Tally of one acquisition run.
///
/// `candidates_considered` is the coarse progress figure: every candidate
/// that survived the date and availability filter, including the ones later
/// skipped as abstract cards. Successful acquisitions are counted separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionReport {
    pub candidates_considered: usize,
    pub skipped_abstract_cards: usize,
    pub pdf_direct: usize,
    pub pdf_converted: usize,
    pub abstract_only: usize,
    pub failed: usize,
}

impl AcquisitionReport {
    pub fn record(&mut self, outcome: &AcquisitionOutcome) {
        match outcome {
            AcquisitionOutcome::PdfDirect { .. } => self.pdf_direct += 1,
            AcquisitionOutcome::PdfConverted { .. } => self.pdf_converted += 1,
            AcquisitionOutcome::AbstractOnly { .. } => self.abstract_only += 1,
            AcquisitionOutcome::Failed => self.failed += 1,
        }
    }

    /// Candidates for which a file was written
    #[must_use]
    pub const fn acquired(&self) -> usize {
        self.pdf_direct + self.pdf_converted + self.abstract_only
    }
}

/// Drives search, filtering and acquisition over every watch term
#[derive(Debug)]
pub struct AcquisitionBatch<'a> {
    search: &'a SearchClient,
    engine: &'a TieredAcquisitionEngine,
    filter: DateAndAvailabilityFilter,
    fields_of_study: Vec<String>,
    limit: u32,
}

impl<'a> AcquisitionBatch<'a> {
    #[must_use]
    pub fn new(
        search: &'a SearchClient,
        engine: &'a TieredAcquisitionEngine,
        window: DateWindow,
        fields_of_study: Vec<String>,
        limit: u32,
    ) -> Self {
        Self {
            search,
            engine,
            filter: DateAndAvailabilityFilter::new(window),
            fields_of_study,
            limit,
        }
    }

    /// Search every term, then acquire every eligible candidate into `folder`.
    ///
    /// Terms and candidates are processed strictly one after the other; any
    /// unrecovered error aborts the batch.
    #[instrument(skip(self, watch_terms), fields(terms = watch_terms.len()))]
    pub async fn acquire_all(&self, watch_terms: &[String], folder: &Path) -> Result<AcquisitionReport> {
        tokio::fs::create_dir_all(folder).await?;
        let mut report = AcquisitionReport::default();

        for (index, term) in watch_terms.iter().enumerate() {
            info!("[{}/{}] Searching for '{}'", index + 1, watch_terms.len(), term);

            let request =
                SearchRequest::new(term, &self.fields_of_study, self.filter.window(), self.limit);
            let raw_papers = self.search.search(&request).await?;
            let candidates = self.filter.apply(&raw_papers);
            report.candidates_considered += candidates.len();

            info!(
                "'{}': {} of {} results are eligible",
                term,
                candidates.len(),
                raw_papers.len()
            );

            for candidate in &candidates {
                if candidate.title.contains(ABSTRACT_CARD_MARKER) {
                    report.skipped_abstract_cards += 1;
                    continue;
                }

                let stem = folder.join(&candidate.title);
                let outcome = self.engine.acquire(candidate, &stem).await?;
                report.record(&outcome);
            }
        }

        info!(
            "Acquisition finished: {} considered, {} acquired ({} direct, {} converted, {} abstract only), {} failed",
            report.candidates_considered,
            report.acquired(),
            report.pdf_direct,
            report.pdf_converted,
            report.abstract_only,
            report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_report_keeps_counts_apart() {
        let mut report = AcquisitionReport {
            candidates_considered: 5,
            ..Default::default()
        };
        report.record(&AcquisitionOutcome::PdfDirect {
            path: PathBuf::from("a.pdf"),
        });
        report.record(&AcquisitionOutcome::AbstractOnly {
            path: PathBuf::from("b.txt"),
        });
        report.record(&AcquisitionOutcome::Failed);

        assert_eq!(report.acquired(), 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.candidates_considered, 5);
    }
}
