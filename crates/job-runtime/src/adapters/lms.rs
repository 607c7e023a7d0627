//! LMS SIS import client.
//!
//! ```text
//! POST api/v1/accounts/<account>/sis_imports
//!      {"import_type": "instructure_csv", "override_sis_stickiness": bool,
//!       "checksum": "<artifact digest>", "files": [{"name", "contents"}]}
//!   -> {"id": 42, "workflow_state": "created"}
//!
//! GET  api/v1/accounts/<account>/sis_imports/<id>
//!   -> {"workflow_state", "progress", "processing_warnings": [[file, message]],
//!       "processing_errors": [[file, message]]}
//! ```

use rp_06_import_monitor::{LmsError, LmsImportApi, RemoteImport, RemoteStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::ArtifactRef;

use super::http::{HttpClient, HttpError};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImportFile {
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Serialize)]
struct ImportRequest<'a> {
    import_type: &'static str,
    override_sis_stickiness: bool,
    checksum: &'a str,
    files: Vec<ImportFile>,
}

#[derive(Debug, Deserialize)]
struct ImportDocument {
    id: Value,
    #[serde(default)]
    workflow_state: String,
    #[serde(default)]
    progress: Option<u32>,
    #[serde(default)]
    processing_warnings: Option<Vec<Vec<String>>>,
    #[serde(default)]
    processing_errors: Option<Vec<Vec<String>>>,
}

impl ImportDocument {
    fn remote_id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn into_status(self) -> RemoteStatus {
        RemoteStatus {
            workflow_state: self.workflow_state,
            progress: self.progress.unwrap_or(0).min(100) as u8,
            warnings: messages(self.processing_warnings),
            errors: messages(self.processing_errors),
        }
    }
}

/// `[[file, message]]` pairs as `file: message` lines.
fn messages(pairs: Option<Vec<Vec<String>>>) -> Vec<String> {
    pairs
        .unwrap_or_default()
        .into_iter()
        .map(|pair| pair.join(": "))
        .collect()
}

fn lms_error(e: HttpError) -> LmsError {
    match e {
        HttpError::Status { status, body, .. } => LmsError::Status {
            status: status.as_u16(),
            message: body,
        },
        other => LmsError::Transport(other.to_string()),
    }
}

/// Read the artifact's files from disk, in artifact order.
pub async fn artifact_files(artifact: &ArtifactRef) -> std::io::Result<Vec<ImportFile>> {
    let mut files = Vec::with_capacity(artifact.files.len());
    for name in &artifact.files {
        let contents = tokio::fs::read_to_string(artifact.path.join(name)).await?;
        files.push(ImportFile {
            name: name.clone(),
            contents,
        });
    }
    Ok(files)
}

pub struct HttpLms {
    http: HttpClient,
    account: String,
}

impl HttpLms {
    pub fn new(http: HttpClient, account: impl Into<String>) -> Self {
        Self {
            http,
            account: account.into(),
        }
    }

    fn imports_path(&self) -> String {
        format!("api/v1/accounts/{}/sis_imports", self.account)
    }
}

#[async_trait::async_trait]
impl LmsImportApi for HttpLms {
    async fn submit(
        &self,
        artifact: &ArtifactRef,
        override_sis_stickiness: bool,
    ) -> Result<RemoteImport, LmsError> {
        let files = artifact_files(artifact).await.map_err(|e| {
            LmsError::Transport(format!("cannot read artifact {}: {e}", artifact.path.display()))
        })?;
        let body = ImportRequest {
            import_type: "instructure_csv",
            override_sis_stickiness,
            checksum: &artifact.digest,
            files,
        };

        let (url, request) = self.http.post(&self.imports_path());
        let response = HttpClient::send(&url, request.json(&body))
            .await
            .map_err(lms_error)?;
        let doc: ImportDocument = response
            .json()
            .await
            .map_err(|e| LmsError::Transport(format!("unexpected response from {url}: {e}")))?;
        Ok(RemoteImport {
            id: doc.remote_id(),
            workflow_state: doc.workflow_state,
        })
    }

    async fn status(&self, remote_id: &str) -> Result<RemoteStatus, LmsError> {
        self.http
            .get_json::<ImportDocument>(&format!("{}/{remote_id}", self.imports_path()))
            .await
            .map(ImportDocument::into_status)
            .map_err(lms_error)
    }
}
