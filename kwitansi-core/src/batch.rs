//! Batch orchestration: render every record in order, persist each PDF into
//! the batch work area, then decide between a single document and an archive.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, error, info};

use crate::archive::ArchivePackager;
use crate::contract::ReceiptRenderer;
use crate::error::PipelineError;
use crate::record::ReceiptRecord;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";
pub const DOCUMENTS_DIR: &str = "documents";
pub const ARCHIVE_NAME: &str = "kwitansi.zip";

/// The one artifact a batch produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchArtifact {
    Single(PathBuf),
    Archive { path: PathBuf, entries: Vec<String> },
}

impl BatchArtifact {
    pub fn path(&self) -> &Path {
        match self {
            BatchArtifact::Single(path) => path,
            BatchArtifact::Archive { path, .. } => path,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            BatchArtifact::Single(_) => PDF_CONTENT_TYPE,
            BatchArtifact::Archive { .. } => ZIP_CONTENT_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            BatchArtifact::Single(_) => "pdf",
            BatchArtifact::Archive { .. } => "zip",
        }
    }
}

/// Render `records` in order into `work_dir` and return the batch artifact.
///
/// Zero documents is an error. One document is returned as-is; more are
/// zipped into `work_dir/kwitansi.zip`. The first render failure aborts the
/// batch.
pub async fn run_batch<I, R>(
    records: I,
    renderer: &R,
    work_dir: &Path,
) -> Result<BatchArtifact, PipelineError>
where
    I: IntoIterator<Item = ReceiptRecord>,
    R: ReceiptRenderer + ?Sized,
{
    let documents_dir = work_dir.join(DOCUMENTS_DIR);
    tokio::fs::create_dir_all(&documents_dir)
        .await
        .map_err(|source| PipelineError::WorkArea {
            path: documents_dir.clone(),
            source,
        })?;

    let mut taken = HashSet::new();
    let mut documents: Vec<PathBuf> = Vec::new();

    for record in records {
        debug!(row = record.row, receipt = %record.identifier(), "Rendering receipt");
        let bytes = renderer.render(&record).await.map_err(|e| {
            error!(row = record.row, error = %e, "Rendering failed, aborting batch");
            PipelineError::Render(e)
        })?;

        let name = document_name(&record, &mut taken);
        let path = documents_dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| PipelineError::WorkArea {
                path: path.clone(),
                source,
            })?;
        debug!(row = record.row, file = %name, size = bytes.len(), "Saved receipt");
        documents.push(path);
    }

    info!(documents = documents.len(), "Rendered all rows");
    match documents.len() {
        0 => {
            error!("Spreadsheet produced no documents");
            Err(PipelineError::EmptyBatch)
        }
        1 => Ok(BatchArtifact::Single(documents.remove(0))),
        _ => {
            let entries = documents
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            let target = work_dir.join(ARCHIVE_NAME);
            let path = ArchivePackager::default()
                .start(documents, target)
                .completed()
                .await?;
            Ok(BatchArtifact::Archive { path, entries })
        }
    }
}

/// `kwitansi-{receipt_number}.pdf`, or `kwitansi-{row}.pdf` without a number.
///
/// Receipt numbers are reduced to `[A-Za-z0-9._-]`. A name already used in
/// this batch gets the row number appended, so every row keeps its own file.
pub fn document_name(record: &ReceiptRecord, taken: &mut HashSet<String>) -> String {
    let stem = match &record.receipt_number {
        Some(number) => format!("kwitansi-{}", sanitize_file_component(number)),
        None => format!("kwitansi-{}", record.row),
    };
    let mut name = format!("{stem}.pdf");
    let mut suffix = record.row.to_string();
    while taken.contains(&name) {
        name = format!("{stem}-{suffix}.pdf");
        suffix.push('_');
    }
    taken.insert(name.clone());
    name
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub(crate) fn sanitize_file_component(text: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));
    re.replace_all(text, "_").into_owned()
}
