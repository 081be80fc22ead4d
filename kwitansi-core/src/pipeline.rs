//! High-level pipeline: authenticate → fetch → read → render → package → publish.
//!
//! This module is the single request/response entry point of the crate. One
//! call processes one spreadsheet into one downloadable artifact:
//!   - Rejects callers without a verified identity before touching any file
//!   - Rejects requests without a usable `filePath`
//!   - Downloads the spreadsheet into a batch-scoped work area
//!   - Reads rows, renders one receipt per row, zips when there is more than one
//!   - Uploads the artifact and returns a 15-minute retrieval URL
//!
//! # Major Types
//! - [`PipelineContext`]: long-lived collaborators, built once by the caller and
//!   passed in explicitly
//! - [`ProcessRequest`] / [`ProcessResponse`]: the wire shapes (`filePath`,
//!   `downloadUrl`)
//!
//! # Error Handling
//! Stages run strictly in order and the first failure aborts the batch. Internal
//! failures are logged here with their stage and surfaced as
//! [`ServiceError`] with code `internal`; only authentication and argument
//! failures keep their own codes.
//!
//! # Resources
//! The work area is a [`tempfile::TempDir`]; it is removed on every exit path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::batch::run_batch;
use crate::contract::{CallerIdentity, ObjectStore, ReceiptRenderer};
use crate::error::{PipelineError, ServiceError};
use crate::publish::{publish, DEFAULT_LINK_TTL};
use crate::reader::load_receipts;

const MISSING_FILE_PATH: &str = "The function must be called with one argument \"filePath\".";
const INPUT_DIR: &str = "input";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(default)]
    pub file_path: Option<String>,
}

impl ProcessRequest {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub download_url: String,
}

/// Collaborators shared across invocations.
pub struct PipelineContext<S, R> {
    pub store: S,
    pub renderer: R,
    /// Lifetime of issued retrieval URLs.
    pub link_ttl: Duration,
    /// Parent directory for batch work areas; the system temp dir when `None`.
    pub work_root: Option<PathBuf>,
}

impl<S, R> PipelineContext<S, R>
where
    S: ObjectStore,
    R: ReceiptRenderer,
{
    pub fn new(store: S, renderer: R) -> Self {
        Self {
            store,
            renderer,
            link_ttl: DEFAULT_LINK_TTL,
            work_root: None,
        }
    }

    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }
}

/// Process one spreadsheet for one caller.
pub async fn process_spreadsheet<S, R>(
    ctx: &PipelineContext<S, R>,
    caller: Option<&CallerIdentity>,
    request: &ProcessRequest,
) -> Result<ProcessResponse, ServiceError>
where
    S: ObjectStore,
    R: ReceiptRenderer,
{
    info!(file_path = ?request.file_path, "Starting receipt batch");
    match run_stages(ctx, caller, request).await {
        Ok(response) => {
            info!("Receipt batch complete");
            Ok(response)
        }
        Err(e) => {
            match &e {
                PipelineError::Unauthenticated | PipelineError::InvalidArgument(_) => {
                    warn!(stage = e.stage(), error = %e, "Rejected request")
                }
                _ => error!(stage = e.stage(), error = ?e, "Error processing file"),
            }
            Err(ServiceError::from(e))
        }
    }
}

async fn run_stages<S, R>(
    ctx: &PipelineContext<S, R>,
    caller: Option<&CallerIdentity>,
    request: &ProcessRequest,
) -> Result<ProcessResponse, PipelineError>
where
    S: ObjectStore,
    R: ReceiptRenderer,
{
    let caller = authenticate(caller)?;
    let object = validate_request(request)?;

    let work_area = create_work_area(ctx.work_root.as_deref())?;
    let work_path = work_area.path().to_path_buf();
    info!(work_area = %work_path.display(), "Created batch work area");

    let outcome = run_in_work_area(ctx, caller, object, &work_path).await;

    if let Err(e) = work_area.close() {
        warn!(work_area = %work_path.display(), error = %e, "Failed to remove batch work area");
    }
    outcome
}

async fn run_in_work_area<S, R>(
    ctx: &PipelineContext<S, R>,
    caller: &CallerIdentity,
    object: &str,
    work_dir: &Path,
) -> Result<ProcessResponse, PipelineError>
where
    S: ObjectStore,
    R: ReceiptRenderer,
{
    let spreadsheet = fetch_spreadsheet(&ctx.store, object, work_dir).await?;
    let records = load_receipts(spreadsheet).await?;
    let artifact = run_batch(records, &ctx.renderer, work_dir).await?;
    let download_url = publish(&ctx.store, &artifact, caller, Utc::now(), ctx.link_ttl).await?;
    Ok(ProcessResponse { download_url })
}

fn authenticate(caller: Option<&CallerIdentity>) -> Result<&CallerIdentity, PipelineError> {
    match caller {
        Some(identity) if !identity.uid.trim().is_empty() => Ok(identity),
        _ => Err(PipelineError::Unauthenticated),
    }
}

/// The object reference must be present, name a file, and stay inside the store.
fn validate_request(request: &ProcessRequest) -> Result<&str, PipelineError> {
    let file_path = match request.file_path.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return Err(PipelineError::InvalidArgument(MISSING_FILE_PATH.to_string())),
    };
    let path = Path::new(file_path);
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    if escapes || file_path.ends_with('/') || path.file_name().is_none() {
        return Err(PipelineError::InvalidArgument(format!(
            "filePath {file_path:?} does not name a file"
        )));
    }
    Ok(file_path)
}

fn create_work_area(root: Option<&Path>) -> Result<tempfile::TempDir, PipelineError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("kwitansi-");
    let created = match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    };
    created.map_err(|source| PipelineError::WorkArea {
        path: root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
        source,
    })
}

async fn fetch_spreadsheet<S>(
    store: &S,
    object: &str,
    work_dir: &Path,
) -> Result<PathBuf, PipelineError>
where
    S: ObjectStore,
{
    let dest = work_dir.join(INPUT_DIR);
    let local = store.download(object, &dest).await.map_err(|e| {
        error!(object, error = %e, "Failed to download spreadsheet");
        PipelineError::Fetch {
            object: object.to_string(),
            reason: e.to_string(),
        }
    })?;
    info!(object, local = %local.display(), "Downloaded spreadsheet");
    Ok(local)
}
