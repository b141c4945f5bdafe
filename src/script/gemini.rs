use super::{parse_script, script_schema, PaperContents, PaperDocument, Turn};
use crate::client::HttpClientConfig;
use crate::config::ScriptConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const PDF_MIME: &str = "application/pdf";

/// How often, and how long, to wait for an uploaded file to become usable
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(2);
const FILE_POLL_ATTEMPTS: u32 = 30;

/// Turns collected paper contents into a dialogue script
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, contents: &PaperContents, system_instruction: &str)
        -> Result<Vec<Turn>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// A file stored by the Gemini Files API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    /// `files/<id>`
    name: String,
    uri: String,
    #[serde(default)]
    state: Option<String>,
}

impl RemoteFile {
    fn is_processing(&self) -> bool {
        self.state.as_deref() == Some("PROCESSING")
    }

    fn has_failed(&self) -> bool {
        self.state.as_deref() == Some("FAILED")
    }
}

/// Gemini `generateContent` client in JSON response mode
pub struct GeminiScriptGenerator {
    http_client: Client,
    config: ScriptConfig,
    api_key: String,
}

impl std::fmt::Debug for GeminiScriptGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiScriptGenerator")
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl GeminiScriptGenerator {
    pub fn new(config: ScriptConfig, api_key: String) -> Result<Self> {
        let http_client =
            HttpClientConfig::with_timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            http_client,
            config,
            api_key,
        })
    }

    fn api_base(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base(), self.config.model)
    }

    /// `https://host/v1beta` becomes `https://host/upload/v1beta/files`
    fn upload_endpoint(&self) -> Result<String> {
        let mut url = url::Url::parse(self.api_base()).map_err(|e| Error::InvalidInput {
            field: "script.api_url".to_string(),
            reason: e.to_string(),
        })?;
        let path = format!("/upload{}/files", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url.to_string())
    }

    /// Inline base64 while the PDFs fit in one request, uploaded files otherwise
    async fn pdf_parts(&self, contents: &PaperContents) -> Result<Vec<Value>> {
        let total = contents.pdf_bytes();

        if total <= self.config.inline_pdf_limit_bytes {
            debug!("Sending {} PDF bytes inline", total);
            let engine = base64::engine::general_purpose::STANDARD;
            return Ok(contents
                .pdfs()
                .map(|(_, bytes)| {
                    json!({ "inlineData": { "mimeType": PDF_MIME, "data": engine.encode(bytes) } })
                })
                .collect());
        }

        info!(
            "PDFs total {} bytes, uploading them through the Files API",
            total
        );
        let mut parts = Vec::new();
        for (name, bytes) in contents.pdfs() {
            let file = self.upload_pdf(name, bytes).await?;
            parts.push(json!({ "fileData": { "mimeType": PDF_MIME, "fileUri": file.uri } }));
        }
        Ok(parts)
    }

    /// Resumable upload in a single chunk: open the session, then send and finalize
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn upload_pdf(&self, name: &str, bytes: &[u8]) -> Result<RemoteFile> {
        let start = self
            .http_client
            .post(self.upload_endpoint()?)
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(&json!({ "file": { "display_name": name } }))
            .send()
            .await?;
        let start = ensure_success(start, "gemini files").await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Parse {
                context: "gemini files".to_string(),
                message: "upload session has no x-goog-upload-url header".to_string(),
            })?;

        let uploaded = self
            .http_client
            .post(session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes.to_vec())
            .send()
            .await?;
        let file = ensure_success(uploaded, "gemini files")
            .await?
            .json::<UploadResponse>()
            .await?
            .file;

        debug!("Uploaded {} as {}", name, file.name);
        self.wait_until_active(file).await
    }

    async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile> {
        let mut attempts = 0;
        while file.is_processing() {
            if attempts >= FILE_POLL_ATTEMPTS {
                return Err(Error::Script(format!(
                    "uploaded file {} is still processing",
                    file.name
                )));
            }
            attempts += 1;
            sleep(FILE_POLL_INTERVAL).await;

            let response = self
                .http_client
                .get(format!("{}/{}", self.api_base(), file.name))
                .query(&[("key", self.api_key.as_str())])
                .send()
                .await?;
            file = ensure_success(response, "gemini files").await?.json().await?;
        }

        if file.has_failed() {
            return Err(Error::Script(format!("processing of {} failed", file.name)));
        }
        Ok(file)
    }

    /// PDF parts first, then every abstract as its own text part
    fn request_body(
        &self,
        pdf_parts: Vec<Value>,
        contents: &PaperContents,
        system_instruction: &str,
    ) -> Value {
        let parts: Vec<Value> = pdf_parts
            .into_iter()
            .chain(contents.abstracts().map(|text| json!({ "text": text })))
            .collect();

        json!({
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseJsonSchema": script_schema(),
                "maxOutputTokens": self.config.max_output_tokens,
                "temperature": self.config.temperature,
            }
        })
    }
}

async fn ensure_success(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    warn!("{} returned {}", service, status);
    Err(Error::Api {
        service: service.to_string(),
        status: status.as_u16(),
        message: message.chars().take(500).collect(),
    })
}

#[async_trait]
impl ScriptGenerator for GeminiScriptGenerator {
    #[instrument(skip_all, fields(model = %self.config.model, documents = contents.documents.len()))]
    async fn generate(
        &self,
        contents: &PaperContents,
        system_instruction: &str,
    ) -> Result<Vec<Turn>> {
        if contents.is_empty() {
            return Err(Error::InvalidInput {
                field: "papers".to_string(),
                reason: "no paper content to generate a script from".to_string(),
            });
        }

        let pdf_count = contents
            .documents
            .iter()
            .filter(|doc| matches!(doc, PaperDocument::Pdf { .. }))
            .count();
        info!(
            "Generating script from {} PDFs and {} abstracts",
            pdf_count,
            contents.documents.len() - pdf_count
        );

        let pdf_parts = self.pdf_parts(contents).await?;
        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(pdf_parts, contents, system_instruction))
            .send()
            .await?;

        let body: GenerateResponse = ensure_success(response, "gemini").await?.json().await?;
        let candidate = body.candidates.into_iter().next().ok_or_else(|| {
            Error::Script(format!(
                "no candidates returned (prompt feedback: {})",
                body.prompt_feedback.unwrap_or(Value::Null)
            ))
        })?;

        debug!("Script finish reason: {:?}", candidate.finish_reason);

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let turns = parse_script(&text)?;
        info!("Script generated with {} turns", turns.len());
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(config: ScriptConfig) -> GeminiScriptGenerator {
        GeminiScriptGenerator::new(config, "key".to_string()).unwrap()
    }

    fn contents() -> PaperContents {
        PaperContents {
            documents: vec![
                PaperDocument::Pdf {
                    name: "p".to_string(),
                    bytes: b"%PDF".to_vec(),
                },
                PaperDocument::Abstract {
                    name: "a".to_string(),
                    text: "a:\nABSTRACT ONLY:\nhello".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_small_pdfs_go_inline() {
        let generator = generator(ScriptConfig::default());
        let contents = contents();

        let pdf_parts = generator.pdf_parts(&contents).await.unwrap();
        let body = generator.request_body(pdf_parts, &contents, "Be a podcast host");
        let parts = &body["contents"][0]["parts"];

        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "JVBERg==");
        assert_eq!(parts[1]["text"], "a:\nABSTRACT ONLY:\nhello");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Be a podcast host"
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 300_000);
    }

    #[test]
    fn test_endpoints() {
        let generator = generator(ScriptConfig::default());
        assert_eq!(
            generator.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert_eq!(
            generator.upload_endpoint().unwrap(),
            "https://generativelanguage.googleapis.com/upload/v1beta/files"
        );
    }

    #[test]
    fn test_file_states() {
        let file = |state: Option<&str>| RemoteFile {
            name: "files/x".to_string(),
            uri: "https://files/x".to_string(),
            state: state.map(str::to_string),
        };
        assert!(file(Some("PROCESSING")).is_processing());
        assert!(!file(Some("ACTIVE")).is_processing());
        assert!(!file(None).is_processing());
        assert!(file(Some("FAILED")).has_failed());
    }
}
