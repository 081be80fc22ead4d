//! # contract: interfaces to the pipeline's external collaborators
//!
//! The pipeline talks to two things it does not own:
//! - an object store, which holds the uploaded spreadsheet and receives the
//!   finished artifact ([`ObjectStore`])
//! - a document engine, which turns one record into one PDF ([`ReceiptRenderer`])
//!
//! Both traits are async and annotated for `mockall`, so tests can swap in
//! deterministic fakes (`MockObjectStore`, `MockReceiptRenderer`).
//!
//! Store implementations convert every upstream failure into a boxed
//! [`StoreError`]; the pipeline maps those into its own taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::RenderError;
use crate::record::ReceiptRecord;

/// Error type returned by object store implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Verified identity of the caller. Only the uid is used, for output naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub uid: String,
}

impl CallerIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

/// Handle to an object after upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Object name inside the store, e.g. `results/uid-1700000000000-kwitansi.zip`.
    pub name: String,
    pub content_type: String,
    /// Store-assigned id of this particular upload.
    pub generation: String,
}

/// Object storage used to fetch inputs and publish results.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy `object` into `dest_dir` and return the local path of the copy.
    async fn download(&self, object: &str, dest_dir: &Path) -> Result<PathBuf, StoreError>;

    /// Upload the file at `local` under `destination` with the given content type.
    async fn upload(
        &self,
        local: &Path,
        destination: &str,
        content_type: &str,
    ) -> Result<StoredObject, StoreError>;

    /// Issue a read-only URL for `object` that stops working after `ttl`.
    async fn signed_read_url(
        &self,
        object: &StoredObject,
        ttl: Duration,
    ) -> Result<String, StoreError>;
}

/// Document engine: exactly one PDF per record.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    async fn render(&self, record: &ReceiptRecord) -> Result<Vec<u8>, RenderError>;
}
