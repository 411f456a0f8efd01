use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GitHubConfig;
use crate::remote::{commit_message, ContentKind, RemoteError, RemoteFile, RemoteStore};

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";

/// Remote store backed by the GitHub contents API of one repository branch.
pub struct GitHubStore {
    contents_url: String,
    branch: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(alias = "version")]
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubStore {
    pub fn new(cfg: &GitHubConfig, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            contents_url: contents_url(cfg),
            branch: cfg.branch.clone(),
            token: cfg.token.clone(),
            client,
        })
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/{}", self.contents_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.file_url(path))
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.token)
            .header(USER_AGENT, "penguin-predictor")
            .header(ACCEPT, accept)
    }

    /// Files above the contents API inline limit come back with
    /// `encoding: "none"` and must be fetched raw.
    async fn read_raw(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let resp = self.get(path, RAW_MEDIA_TYPE).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RemoteStore for GitHubStore {
    async fn read_current(&self, path: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let resp = self.get(path, JSON_MEDIA_TYPE).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(path, "remote file absent");
            return Ok(None);
        }
        let body: ContentsResponse = check_status(resp).await?.json().await?;

        let content = match body.encoding.as_deref() {
            Some("none") => self.read_raw(path).await?,
            _ => decode_content(&body.content)?,
        };

        Ok(Some(RemoteFile {
            path: path.to_string(),
            version: body.sha,
            content,
        }))
    }

    async fn write_conditional(
        &self,
        path: &str,
        content: &[u8],
        kind: ContentKind,
        version: Option<&str>,
    ) -> Result<(), RemoteError> {
        let body = PutContents {
            message: commit_message(path, version),
            content: STANDARD.encode(content),
            branch: &self.branch,
            sha: version,
        };
        debug!(
            path,
            ?kind,
            bytes = content.len(),
            create = version.is_none(),
            "writing remote file"
        );

        let resp = self
            .client
            .put(self.file_url(path))
            .bearer_auth(&self.token)
            .header(USER_AGENT, "penguin-predictor")
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(&body)
            .send()
            .await?;

        match resp.status() {
            // 409: sha no longer matches; 422: sha missing for an existing file.
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(RemoteError::Conflict { path: path.to_string() })
            }
            _ => check_status(resp).await.map(|_| ()),
        }
    }
}

fn contents_url(cfg: &GitHubConfig) -> String {
    format!(
        "{}/repos/{}/{}/contents",
        cfg.api_url.trim_end_matches('/'),
        cfg.username,
        cfg.repo
    )
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

/// The contents API wraps base64 at 60 columns.
fn decode_content(content: &str) -> Result<Vec<u8>, RemoteError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Payload(format!("invalid base64 content: {e}")))
}
