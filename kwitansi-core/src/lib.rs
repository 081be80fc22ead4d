#![doc = "kwitansi-core: core pipeline library for kwitansi."]

//! Turns the rows of a spreadsheet into individually rendered receipt PDFs,
//! bundles them, and publishes the result through an object store.
//!
//! Stages, in data-flow order:
//! [`reader`] → [`render`] (via [`layout`] and [`format`]) → [`batch`] →
//! [`archive`] (more than one document only) → [`publish`].
//! [`pipeline::process_spreadsheet`] composes them behind one authenticated
//! request/response call.
//!
//! # Usage
//! Depend on this crate for all pipeline, rendering and contract code; the CLI
//! crate only adds configuration and a concrete object store.

pub mod archive;
pub mod batch;
pub mod contract;
pub mod error;
pub mod format;
pub mod layout;
pub mod pipeline;
pub mod publish;
pub mod reader;
pub mod record;
pub mod render;

pub use contract::{CallerIdentity, ObjectStore, ReceiptRenderer, StoredObject};
pub use error::{ErrorCode, PipelineError, ServiceError};
pub use pipeline::{process_spreadsheet, PipelineContext, ProcessRequest, ProcessResponse};
pub use record::ReceiptRecord;
