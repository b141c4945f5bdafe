use super::PdfRenderer;
use crate::client::HttpClientConfig;
use crate::config::AcquisitionConfig;
use crate::discovery::PaperCandidate;
use crate::{Error, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// First line of every abstract-only paper file
pub const ABSTRACT_MARKER: &str = "ABSTRACT ONLY:";

/// Page that was rendered into the PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSource {
    Url,
    Doi,
}

/// Which tier produced the paper content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    PdfDirect { path: PathBuf },
    PdfConverted { source: ConversionSource, path: PathBuf },
    AbstractOnly { path: PathBuf },
    Failed,
}

impl AcquisitionOutcome {
    /// File written for this outcome, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PdfDirect { path }
            | Self::PdfConverted { path, .. }
            | Self::AbstractOnly { path } => Some(path),
            Self::Failed => None,
        }
    }
}

/// `<stem>.<extension>` without touching dots already in the stem
fn with_suffix(stem: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Materializes paper content on disk through a strict chain of fallbacks:
/// direct PDF download, rendered link, rendered DOI page, abstract text.
pub struct TieredAcquisitionEngine {
    http_client: Client,
    renderer: Arc<dyn PdfRenderer>,
    doi_resolver: String,
}

impl std::fmt::Debug for TieredAcquisitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredAcquisitionEngine")
            .field("renderer", &self.renderer.name())
            .field("doi_resolver", &self.doi_resolver)
            .finish_non_exhaustive()
    }
}

impl TieredAcquisitionEngine {
    pub fn new(config: &AcquisitionConfig, renderer: Arc<dyn PdfRenderer>) -> Result<Self> {
        let http_client =
            HttpClientConfig::with_timeout(Duration::from_secs(config.download_timeout_secs))
                .build()?;

        Ok(Self {
            http_client,
            renderer,
            doi_resolver: config.doi_resolver.clone(),
        })
    }

    /// Acquire one candidate, writing `<destination_stem>.pdf` or `.txt`.
    ///
    /// Only a failed direct download propagates an error; rendering failures
    /// fall through to the next tier.
    #[instrument(skip(self, candidate), fields(title = %candidate.title))]
    pub async fn acquire(
        &self,
        candidate: &PaperCandidate,
        destination_stem: &Path,
    ) -> Result<AcquisitionOutcome> {
        let pdf_path = with_suffix(destination_stem, "pdf");

        if let Some(url) = candidate.pdf_url() {
            if url.contains(".pdf") {
                info!("Downloading PDF for: {}", candidate.title);
                self.download(url, &pdf_path).await?;
                return Ok(AcquisitionOutcome::PdfDirect { path: pdf_path });
            }

            if self.try_render(url, &pdf_path).await {
                return Ok(AcquisitionOutcome::PdfConverted {
                    source: ConversionSource::Url,
                    path: pdf_path,
                });
            }
        }

        if let Some(doi) = candidate.doi() {
            let landing_page = doi.resolver_url(&self.doi_resolver);
            if self.try_render(&landing_page, &pdf_path).await {
                return Ok(AcquisitionOutcome::PdfConverted {
                    source: ConversionSource::Doi,
                    path: pdf_path,
                });
            }
        }

        if let Some(abstract_text) = &candidate.abstract_text {
            info!("Abstract only for: {}", candidate.title);
            let txt_path = with_suffix(destination_stem, "txt");
            tokio::fs::write(&txt_path, format!("{ABSTRACT_MARKER}\n{abstract_text}")).await?;
            return Ok(AcquisitionOutcome::AbstractOnly { path: txt_path });
        }

        warn!("No content could be acquired for: {}", candidate.title);
        Ok(AcquisitionOutcome::Failed)
    }

    /// Stream the body to disk verbatim. Content type is never checked.
    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Api {
                service: "pdf_download".to_string(),
                status: status.as_u16(),
                message: url.to_string(),
            });
        }

        let mut file = File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!("Wrote {} bytes to {}", written, path.display());
        Ok(())
    }

    /// Render `url` into `path`, deleting any partial output on failure
    async fn try_render(&self, url: &str, path: &Path) -> bool {
        info!("Rendering {} with {}", url, self.renderer.name());

        match self.renderer.render(url, path).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{} failed for {}: {}. Deleting file...", self.renderer.name(), url, e);
                if let Err(remove_error) = tokio::fs::remove_file(path).await {
                    if remove_error.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            "Could not remove partial file {}: {}",
                            path.display(),
                            remove_error
                        );
                    }
                }
                false
            }
        }
    }
}
