use crate::Result;
use std::path::Path;
use tracing::{debug, warn};

/// One acquired paper, ready to hand to the script generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperDocument {
    Pdf { name: String, bytes: Vec<u8> },
    /// `"<name>:\n<file contents>"`
    Abstract { name: String, text: String },
}

/// Everything collected from a papers folder
#[derive(Debug, Clone, Default)]
pub struct PaperContents {
    pub documents: Vec<PaperDocument>,
}

impl PaperContents {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// `(name, bytes)` of every PDF, in folder order
    pub fn pdfs(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.documents.iter().filter_map(|doc| match doc {
            PaperDocument::Pdf { name, bytes } => Some((name.as_str(), bytes.as_slice())),
            PaperDocument::Abstract { .. } => None,
        })
    }

    #[must_use]
    pub fn pdf_bytes(&self) -> usize {
        self.pdfs().map(|(_, bytes)| bytes.len()).sum()
    }

    pub fn abstracts(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().filter_map(|doc| match doc {
            PaperDocument::Abstract { text, .. } => Some(text.as_str()),
            PaperDocument::Pdf { .. } => None,
        })
    }
}

/// Read every `.pdf` and `.txt` file of `folder`.
///
/// Subdirectories are ignored and any other file is logged and skipped.
/// Documents are sorted by name so runs are reproducible.
pub async fn collect_paper_contents(folder: &Path) -> Result<PaperContents> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut documents = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }

        let path = entry.path();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("pdf") => {
                let bytes = tokio::fs::read(&path).await?;
                debug!("Collected PDF {} ({} bytes)", path.display(), bytes.len());
                documents.push(PaperDocument::Pdf { name, bytes });
            }
            Some("txt") => {
                let contents = tokio::fs::read_to_string(&path).await?;
                debug!("Collected abstract {}", path.display());
                let text = format!("{name}:\n{contents}");
                documents.push(PaperDocument::Abstract { name, text });
            }
            _ => warn!("Unsupported file:\n{}\nSkipping...", path.display()),
        }
    }

    documents.sort_by(|a, b| document_name(a).cmp(document_name(b)));
    Ok(PaperContents { documents })
}

fn document_name(document: &PaperDocument) -> &str {
    match document {
        PaperDocument::Pdf { name, .. } | PaperDocument::Abstract { name, .. } => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collects_supported_files_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b paper.pdf"), b"%PDF-1.4 fake").unwrap();
        std::fs::write(dir.path().join("a paper.txt"), "ABSTRACT ONLY:\nWe study.").unwrap();
        std::fs::write(dir.path().join("notes.docx"), b"??").unwrap();
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let contents = collect_paper_contents(dir.path()).await.unwrap();

        assert_eq!(contents.documents.len(), 2);
        assert_eq!(
            contents.abstracts().collect::<Vec<_>>(),
            vec!["a paper:\nABSTRACT ONLY:\nWe study."]
        );
        assert_eq!(
            contents.pdfs().next().map(|(_, bytes)| bytes),
            Some(&b"%PDF-1.4 fake"[..])
        );
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_paper_contents(&dir.path().join("missing")).await.is_err());
    }
}
