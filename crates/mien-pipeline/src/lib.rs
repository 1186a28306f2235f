//! mien-pipeline — the stateful layer around `mien-core`.
//!
//! Owns the enrollment session and the in-memory gallery on one dedicated
//! worker thread, mirrors the gallery to disk through a serialized writer
//! thread, and hands the UI collaborator per-frame annotations plus
//! enrollment lifecycle events.

pub mod config;
pub mod pipeline;
pub mod session;
pub mod store;

pub use config::Config;
pub use pipeline::{
    spawn_pipeline, FaceAnnotation, IdentitySummary, PipelineError, PipelineEvent, PipelineHandle,
};
pub use session::{Cancelled, EnrollmentSession, Offer, SessionError};
pub use store::{GalleryStore, StoreError};
