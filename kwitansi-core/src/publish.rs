//! Result publishing: upload the batch artifact and issue a time-boxed link.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::batch::{sanitize_file_component, BatchArtifact};
use crate::contract::{CallerIdentity, ObjectStore};
use crate::error::PublishError;

/// Retrieval links stay valid for 15 minutes.
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(15 * 60);

/// `results/{uid}-{millis}-kwitansi.{pdf|zip}`
///
/// The uid is reduced to `[A-Za-z0-9._-]` so it always stays one path segment.
pub fn destination_name(
    caller: &CallerIdentity,
    published_at: DateTime<Utc>,
    artifact: &BatchArtifact,
) -> String {
    format!(
        "results/{}-{}-kwitansi.{}",
        sanitize_file_component(&caller.uid),
        published_at.timestamp_millis(),
        artifact.extension()
    )
}

/// Upload `artifact` and return a read-only URL valid for `ttl`. No retries.
pub async fn publish<S>(
    store: &S,
    artifact: &BatchArtifact,
    caller: &CallerIdentity,
    published_at: DateTime<Utc>,
    ttl: Duration,
) -> Result<String, PublishError>
where
    S: ObjectStore + ?Sized,
{
    let destination = destination_name(caller, published_at, artifact);
    let content_type = artifact.content_type();
    info!(
        destination = %destination,
        content_type,
        local = %artifact.path().display(),
        "Uploading batch result"
    );

    let stored = store
        .upload(artifact.path(), &destination, content_type)
        .await
        .map_err(|e| {
            error!(destination = %destination, error = %e, "Upload failed");
            PublishError::Upload {
                destination: destination.clone(),
                reason: e.to_string(),
            }
        })?;
    match serde_json::to_string(&stored) {
        Ok(json) => debug!(stored = %json, "Upload acknowledged"),
        Err(e) => debug!(error = ?e, "Failed to serialize stored object for logging"),
    }

    let url = store.signed_read_url(&stored, ttl).await.map_err(|e| {
        error!(destination = %destination, error = %e, "Issuing retrieval URL failed");
        PublishError::SignedUrl {
            destination: destination.clone(),
            reason: e.to_string(),
        }
    })?;
    info!(destination = %destination, ttl_secs = ttl.as_secs(), "Issued retrieval URL");
    Ok(url)
}
