use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Converts an arbitrary web page into a PDF file
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Render `url` into `output`. A failed render may leave a partial file
    /// behind; callers are responsible for cleaning it up.
    async fn render(&self, url: &str, output: &Path) -> Result<()>;
}

/// Renders pages by shelling out to `wkhtmltopdf`
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    binary: PathBuf,
    timeout: Duration,
}

impl WkhtmltopdfRenderer {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PdfRenderer for WkhtmltopdfRenderer {
    fn name(&self) -> &str {
        "wkhtmltopdf"
    }

    async fn render(&self, url: &str, output: &Path) -> Result<()> {
        debug!("Rendering {} to {}", url, output.display());

        let child = Command::new(&self.binary)
            .arg("--quiet")
            .arg(url)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| Error::Render {
                url: url.to_string(),
                reason: format!("timed out after {:?}", self.timeout),
            })?
            .map_err(|e| Error::Render {
                url: url.to_string(),
                reason: format!("failed to run {}: {e}", self.binary.display()),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render {
                url: url.to_string(),
                reason: format!("{} ({})", result.status, stderr.trim()),
            });
        }

        Ok(())
    }
}
