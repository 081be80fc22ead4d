mod common;

use kwitansi_core::contract::{
    CallerIdentity, MockObjectStore, MockReceiptRenderer, StoreError, StoredObject,
};
use kwitansi_core::error::{ErrorCode, RenderError};
use kwitansi_core::pipeline::{process_spreadsheet, PipelineContext, ProcessRequest};
use kwitansi_core::record::ReceiptRecord;
use kwitansi_core::render::PdfReceiptRenderer;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

use common::{row, write_workbook, Row};

/// Everything one test needs: a spreadsheet fixture, a work root to watch for
/// leftovers, and a place the fake store copies uploads to.
struct Fixture {
    _dir: TempDir,
    spreadsheet: PathBuf,
    work_root: PathBuf,
    uploads: PathBuf,
}

impl Fixture {
    fn new(rows: &[Row<'_>]) -> Self {
        let dir = tempdir().unwrap();
        let spreadsheet = dir.path().join("source.xlsx");
        write_workbook(&spreadsheet, rows);
        let work_root = dir.path().join("work");
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&work_root).unwrap();
        std::fs::create_dir_all(&uploads).unwrap();
        Self {
            _dir: dir,
            spreadsheet,
            work_root,
            uploads,
        }
    }

    fn work_root_is_empty(&self) -> bool {
        std::fs::read_dir(&self.work_root).unwrap().next().is_none()
    }
}

#[derive(Debug, Clone)]
struct Upload {
    destination: String,
    content_type: String,
    copy: PathBuf,
}

/// A store that serves the fixture spreadsheet for every download.
fn serving(fixture: &Fixture) -> MockObjectStore {
    let mut store = MockObjectStore::new();
    let spreadsheet = fixture.spreadsheet.clone();
    store
        .expect_download()
        .returning(move |object: &str, dest: &Path| {
            assert_eq!(object, "uploads/user-1/kwitansi.xlsx");
            std::fs::create_dir_all(dest)?;
            let local = dest.join("kwitansi.xlsx");
            std::fs::copy(&spreadsheet, &local)?;
            Ok(local)
        });
    store
}

/// Accept uploads, keeping a copy of each outside the batch work area.
fn record_uploads(store: &mut MockObjectStore, fixture: &Fixture, uploads: Arc<Mutex<Vec<Upload>>>) {
    let upload_dir = fixture.uploads.clone();
    store.expect_upload().returning(
        move |local: &Path, destination: &str, content_type: &str| -> Result<StoredObject, StoreError> {
            let copy = upload_dir.join(local.file_name().unwrap());
            std::fs::copy(local, &copy)?;
            uploads.lock().unwrap().push(Upload {
                destination: destination.to_string(),
                content_type: content_type.to_string(),
                copy,
            });
            Ok(StoredObject {
                name: destination.to_string(),
                content_type: content_type.to_string(),
                generation: "gen-1".to_string(),
            })
        },
    );

    store
        .expect_signed_read_url()
        .returning(|object: &StoredObject, ttl: Duration| {
            Ok(format!(
                "https://storage.test/{}?ttl={}",
                object.name,
                ttl.as_secs()
            ))
        });
}

fn fake_store(fixture: &Fixture, uploads: Arc<Mutex<Vec<Upload>>>) -> MockObjectStore {
    let mut store = serving(fixture);
    record_uploads(&mut store, fixture, uploads);
    store
}

fn request() -> ProcessRequest {
    ProcessRequest::new("uploads/user-1/kwitansi.xlsx")
}

fn caller() -> CallerIdentity {
    CallerIdentity::new("user-1")
}

#[tokio::test]
async fn single_row_publishes_a_pdf() {
    let fixture = Fixture::new(&[row("KW-001", "Budi", 1_000_000.0)]);
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let ctx = PipelineContext::new(fake_store(&fixture, uploads.clone()), PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root);

    let response = process_spreadsheet(&ctx, Some(&caller()), &request())
        .await
        .expect("batch should succeed");

    let uploads = uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert!(upload.destination.starts_with("results/user-1-"));
    assert!(upload.destination.ends_with("-kwitansi.pdf"));
    assert_eq!(upload.content_type, "application/pdf");
    assert!(std::fs::read(&upload.copy).unwrap().starts_with(b"%PDF"));

    assert_eq!(
        response.download_url,
        format!("https://storage.test/{}?ttl=900", upload.destination)
    );
    assert!(fixture.work_root_is_empty(), "work area must be removed");
}

#[tokio::test]
async fn many_rows_publish_one_zip_with_an_entry_per_row() {
    let fixture = Fixture::new(&[
        row("KW-001", "Budi", 1_000_000.0),
        Row {
            recipient: "Tanpa Nomor",
            ..Row::default()
        },
        row("KW-003", "Sari", 50_000.0),
    ]);
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let ctx = PipelineContext::new(fake_store(&fixture, uploads.clone()), PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root)
        .with_link_ttl(Duration::from_secs(60));

    let response = process_spreadsheet(&ctx, Some(&caller()), &request())
        .await
        .expect("batch should succeed");
    assert!(response.download_url.ends_with("?ttl=60"));

    let uploads = uploads.lock().unwrap();
    let upload = &uploads[0];
    assert!(upload.destination.ends_with("-kwitansi.zip"));
    assert_eq!(upload.content_type, "application/zip");

    let mut archive = zip::ZipArchive::new(File::open(&upload.copy).unwrap()).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["kwitansi-3.pdf", "kwitansi-KW-001.pdf", "kwitansi-KW-003.pdf"]
    );
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn header_only_sheet_is_an_internal_error() {
    let fixture = Fixture::new(&[]);
    let mut store = serving(&fixture);
    store.expect_upload().never();
    let ctx = PipelineContext::new(store, PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root);

    let err = process_spreadsheet(&ctx, Some(&caller()), &request())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Internal);
    assert_eq!(err.message, "Tidak ada data yang bisa diproses di file Excel.");
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn missing_identity_fails_before_any_io() {
    let fixture = Fixture::new(&[row("KW-001", "Budi", 1.0)]);
    let mut store = MockObjectStore::new();
    store.expect_download().never();
    store.expect_upload().never();
    let ctx = PipelineContext::new(store, PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root);

    let err = process_spreadsheet(&ctx, None, &request()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);

    let blank = CallerIdentity::new("  ");
    let err = process_spreadsheet(&ctx, Some(&blank), &request()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);

    assert!(fixture.work_root_is_empty(), "no work area may be created");
}

#[tokio::test]
async fn missing_or_malformed_file_path_is_invalid_argument() {
    let fixture = Fixture::new(&[row("KW-001", "Budi", 1.0)]);
    let mut store = MockObjectStore::new();
    store.expect_download().never();
    let ctx = PipelineContext::new(store, PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root);

    for req in [
        ProcessRequest::default(),
        ProcessRequest::new("   "),
        ProcessRequest::new("uploads/"),
        ProcessRequest::new("../secrets.xlsx"),
    ] {
        let err = process_spreadsheet(&ctx, Some(&caller()), &req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument, "request {req:?}");
    }
    let err = process_spreadsheet(&ctx, Some(&caller()), &ProcessRequest::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.message,
        "The function must be called with one argument \"filePath\"."
    );
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn render_failure_publishes_nothing_and_cleans_up() {
    let fixture = Fixture::new(&[
        row("KW-001", "Budi", 1.0),
        row("KW-002", "Sari", 2.0),
        row("KW-003", "Agus", 3.0),
    ]);
    let mut store = serving(&fixture);
    store.expect_upload().never();
    store.expect_signed_read_url().never();

    let mut renderer = MockReceiptRenderer::new();
    renderer.expect_render().returning(|r: &ReceiptRecord| {
        if r.receipt_number.as_deref() == Some("KW-002") {
            Err(RenderError::Timeout { row: r.row, secs: 30 })
        } else {
            Ok(b"%PDF-1.7".to_vec())
        }
    });
    let ctx = PipelineContext::new(store, renderer).with_work_root(&fixture.work_root);

    let err = process_spreadsheet(&ctx, Some(&caller()), &request())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Internal);
    assert!(err.message.contains("row 3"), "message: {}", err.message);
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn upload_failure_is_internal_and_cleans_up() {
    let fixture = Fixture::new(&[row("KW-001", "Budi", 1.0)]);
    let mut store = serving(&fixture);
    store
        .expect_upload()
        .times(1)
        .returning(|_: &Path, _: &str, _: &str| Err("bucket unavailable".into()));
    store.expect_signed_read_url().never();
    let ctx = PipelineContext::new(store, PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root);

    let err = process_spreadsheet(&ctx, Some(&caller()), &request())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Internal);
    assert!(err.message.contains("bucket unavailable"));
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn download_failure_is_internal() {
    let fixture = Fixture::new(&[row("KW-001", "Budi", 1.0)]);
    let mut store = MockObjectStore::new();
    store
        .expect_download()
        .returning(|object: &str, _: &Path| Err(format!("No such object: {object}").into()));
    let ctx = PipelineContext::new(store, PdfReceiptRenderer::default())
        .with_work_root(&fixture.work_root);

    let err = process_spreadsheet(&ctx, Some(&caller()), &request())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Internal);
    assert!(err.message.contains("No such object"));
    assert!(fixture.work_root_is_empty());
}
