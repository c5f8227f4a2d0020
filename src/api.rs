// API client module: a small blocking HTTP client for an OpenAI-compatible
// service (files, fine-tuning jobs, chat completions) plus the wire types
// the UI needs. The UI only talks to the `FineTuningService` trait so the
// flows can be exercised without a network.

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;

/// Purpose tag attached to every uploaded training file.
pub const FINE_TUNE_PURPOSE: &str = "fine-tune";

/// A file stored on the remote service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub id: String,
    #[serde(default)]
    pub filename: String,
}

/// Status of a fine-tuning job. Unknown values are kept verbatim in
/// `Other` so a new server-side status never breaks listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    ValidatingFiles,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::ValidatingFiles => "validating_files",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "validating_files" => JobStatus::ValidatingFiles,
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fine-tuning job as returned by the service. Timestamps are epoch
/// seconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FineTuningJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub fine_tuned_model: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub finished_at: Option<i64>,
    #[serde(default)]
    pub trained_tokens: Option<u64>,
}

impl FineTuningJob {
    pub fn is_succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Only the jobs whose status is `succeeded`, in their original order.
pub fn succeeded_jobs(jobs: Vec<FineTuningJob>) -> Vec<FineTuningJob> {
    jobs.into_iter().filter(FineTuningJob::is_succeeded).collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged chat message, used both on the wire and in training
/// records.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Serialize, Debug)]
struct CreateJobRequest<'a> {
    training_file: &'a str,
    model: &'a str,
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    n: u32,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The remote operations the CLI needs.
pub trait FineTuningService {
    fn list_files(&self) -> Result<Vec<RemoteFile>>;

    /// Upload the file at `path` with the given purpose tag.
    fn upload_file(&self, path: &Path, purpose: &str) -> Result<RemoteFile>;

    /// List fine-tuning jobs; `None` leaves the page size to the server.
    fn list_jobs(&self, limit: Option<u32>) -> Result<Vec<FineTuningJob>>;

    fn create_job(&self, training_file: &str, model: &str) -> Result<FineTuningJob>;

    /// Request `n` completions for the whole conversation and return the
    /// text of each choice in order.
    fn chat_completion(&self, model: &str, messages: &[ChatMessage], n: u32)
        -> Result<Vec<String>>;
}

/// Blocking client holding a reqwest client preconfigured with the bearer
/// token, and the base URL of the service.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from an explicitly constructed `Config`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .default_headers(auth_headers(&config.api_key)?)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Authorization header carrying the API key. The value is marked
/// sensitive so it never shows up in debug output.
fn auth_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut val = HeaderValue::from_str(&format!("Bearer {}", api_key))
        .context("API key contains characters not allowed in a header")?;
    val.set_sensitive(true);
    headers.insert(AUTHORIZATION, val);
    Ok(headers)
}

/// Turn a non-2xx response into an error carrying status and body.
fn ensure_success(res: Response, op: &str) -> Result<Response> {
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_else(|_| "".into());
        anyhow::bail!("{} failed: {} - {}", op, status, txt);
    }
    Ok(res)
}

impl FineTuningService for ApiClient {
    fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let url = self.url("/files");
        debug!(%url, "listing files");
        let res = self
            .client
            .get(&url)
            .send()
            .context("Failed to send list files request")?;
        let list: ListResponse<RemoteFile> = ensure_success(res, "List files")?
            .json()
            .context("Parsing file list json")?;
        Ok(list.data)
    }

    fn upload_file(&self, path: &Path, purpose: &str) -> Result<RemoteFile> {
        let url = self.url("/files");
        debug!(%url, path = %path.display(), purpose, "uploading file");
        let form = multipart::Form::new()
            .text("purpose", purpose.to_string())
            .file("file", path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let res = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .context("Failed to send upload request")?;
        let file: RemoteFile = ensure_success(res, "Upload")?
            .json()
            .context("Parsing upload response json")?;
        info!(file_id = %file.id, "file uploaded");
        Ok(file)
    }

    fn list_jobs(&self, limit: Option<u32>) -> Result<Vec<FineTuningJob>> {
        let url = self.url("/fine_tuning/jobs");
        debug!(%url, ?limit, "listing fine-tuning jobs");
        let mut req = self.client.get(&url);
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        let res = req.send().context("Failed to send list jobs request")?;
        let list: ListResponse<FineTuningJob> = ensure_success(res, "List jobs")?
            .json()
            .context("Parsing job list json")?;
        Ok(list.data)
    }

    fn create_job(&self, training_file: &str, model: &str) -> Result<FineTuningJob> {
        let url = self.url("/fine_tuning/jobs");
        debug!(%url, training_file, model, "creating fine-tuning job");
        let res = self
            .client
            .post(&url)
            .json(&CreateJobRequest {
                training_file,
                model,
            })
            .send()
            .context("Failed to send create job request")?;
        let job: FineTuningJob = ensure_success(res, "Create job")?
            .json()
            .context("Parsing created job json")?;
        info!(job_id = %job.id, "fine-tuning job created");
        Ok(job)
    }

    fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        n: u32,
    ) -> Result<Vec<String>> {
        let url = self.url("/chat/completions");
        debug!(%url, model, messages = messages.len(), "requesting chat completion");
        let res = self
            .client
            .post(&url)
            .json(&ChatCompletionRequest { model, messages, n })
            .send()
            .context("Failed to send chat completion request")?;
        let completion: ChatCompletionResponse = ensure_success(res, "Chat completion")?
            .json()
            .context("Parsing chat completion json")?;
        Ok(completion
            .choices
            .into_iter()
            .map(|c| c.message.content.unwrap_or_default())
            .collect())
    }
}
