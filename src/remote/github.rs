//! GitHub backend for the remote repository contract, over the REST v3 API.

use super::{ProposalId, RemoteFile, RemoteRepository};
use crate::config::RegistryConfig;
use crate::error::RemoteError;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GITHUB_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const GITHUB_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

fn map_http_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Request(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        RemoteError::Request(format!("Connection error: {}", error))
    } else {
        RemoteError::Request(format!("HTTP error: {}", error))
    }
}

/// Turn a non-success response into the matching [`RemoteError`].
async fn check_status(
    operation: &'static str,
    response: Response,
    expected: &[StatusCode],
) -> Result<Response, RemoteError> {
    let status = response.status();
    if expected.contains(&status) {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Unauthorized(format!("{}: {}", operation, body))
        }
        StatusCode::NOT_FOUND => RemoteError::NotFound(format!("{}: {}", operation, body)),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Conflict(format!("{}: {}", operation, body))
        }
        _ => RemoteError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
            body,
        },
    })
}

async fn decode<T: for<'de> Deserialize<'de>>(
    operation: &'static str,
    response: Response,
) -> Result<T, RemoteError> {
    response
        .json()
        .await
        .map_err(|e| RemoteError::Decode(format!("{}: {}", operation, e)))
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct UpdateContentsRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Deserialize)]
struct PullRequest {
    number: ProposalId,
}

/// Registry repository hosted on GitHub (or GitHub Enterprise via `api_url`)
pub struct GitHubRepository {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubRepository {
    pub fn new(owner: String, repo: String, token: String) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("status-collector/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(GITHUB_HTTP_CONNECT_TIMEOUT)
            .timeout(GITHUB_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            owner,
            repo,
            token,
        })
    }

    /// Point the client at another API root (GitHub Enterprise, tests)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self, RemoteError> {
        Ok(Self::new(
            config.owner.clone(),
            config.repo.clone(),
            config.token.clone(),
        )?
        .with_api_url(config.api_url.clone()))
    }

    /// `{api_url}/repos/{owner}/{repo}/{segments..}` with every segment percent-encoded.
    fn repo_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            RemoteError::Request(format!("Invalid API URL {}: {}", self.api_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Request(format!("Invalid API URL {}", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// `contents/<path>`, keeping the file path's directory separators.
fn contents_segments(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once("contents").chain(path.split('/').filter(|s| !s.is_empty()))
}

#[async_trait]
impl RemoteRepository for GitHubRepository {
    async fn fetch_file(&self, path: &str, git_ref: &str) -> Result<RemoteFile, RemoteError> {
        const OP: &str = "fetch file";
        let url = self.repo_url(contents_segments(path))?;
        debug!(path, git_ref, "Fetching file");

        let response = self
            .request(Method::GET, url)
            .query(&[("ref", git_ref)])
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(OP, response, &[StatusCode::OK]).await?;
        let contents: ContentsResponse = decode(OP, response).await?;

        if let Some(encoding) = contents.encoding.as_deref() {
            if encoding != "base64" {
                return Err(RemoteError::Decode(format!(
                    "{}: unsupported encoding '{}'",
                    OP, encoding
                )));
            }
        }

        // GitHub wraps base64 content at 60 columns.
        let packed: String = contents
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let content = BASE64
            .decode(packed)
            .map_err(|e| RemoteError::Decode(format!("{}: decode base64: {}", OP, e)))?;

        Ok(RemoteFile {
            content,
            version: contents.sha,
        })
    }

    async fn resolve_ref(&self, branch: &str) -> Result<String, RemoteError> {
        const OP: &str = "get ref";
        let url = self.repo_url(
            ["git", "ref", "heads"]
                .into_iter()
                .chain(branch.split('/')),
        )?;

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(OP, response, &[StatusCode::OK]).await?;
        let reference: RefResponse = decode(OP, response).await?;
        Ok(reference.object.sha)
    }

    async fn create_branch(&self, from_commit: &str, branch: &str) -> Result<(), RemoteError> {
        const OP: &str = "create branch";
        let url = self.repo_url(["git", "refs"])?;
        let body = CreateRefRequest {
            git_ref: format!("refs/heads/{}", branch),
            sha: from_commit,
        };

        let response = self
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(OP, response, &[StatusCode::CREATED]).await?;
        Ok(())
    }

    async fn update_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
        content: &[u8],
        expected_version: &str,
    ) -> Result<(), RemoteError> {
        const OP: &str = "update file";
        let url = self.repo_url(contents_segments(path))?;
        let body = UpdateContentsRequest {
            message,
            content: BASE64.encode(content),
            sha: expected_version,
            branch,
        };

        let response = self
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(OP, response, &[StatusCode::OK, StatusCode::CREATED]).await?;
        Ok(())
    }

    async fn create_change_proposal(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<ProposalId, RemoteError> {
        const OP: &str = "create PR";
        let url = self.repo_url(["pulls"])?;
        let request = CreatePullRequest {
            title,
            body,
            head,
            base,
        };

        let response = self
            .request(Method::POST, url)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(OP, response, &[StatusCode::CREATED]).await?;
        let pull: PullRequest = decode(OP, response).await?;
        Ok(pull.number)
    }

    async fn list_open_proposals(&self, head: &str) -> Result<Vec<ProposalId>, RemoteError> {
        const OP: &str = "list open PRs";
        let url = self.repo_url(["pulls"])?;
        let head_filter = format!("{}:{}", self.owner, head);

        let response = self
            .request(Method::GET, url)
            .query(&[("state", "open"), ("head", head_filter.as_str())])
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(OP, response, &[StatusCode::OK]).await?;
        let pulls: Vec<PullRequest> = decode(OP, response).await?;
        Ok(pulls.into_iter().map(|pull| pull.number).collect())
    }

    fn backend_name(&self) -> &str {
        "github"
    }
}
