//! Per-frame pipeline worker and its async handle.
//!
//! Frames are processed one at a time by a dedicated worker thread that
//! owns the gallery and the enrollment session, so neither needs a lock.
//! Gallery mutations are mirrored to a second, serialized writer thread:
//! disk writes never stall frame delivery, and no two writes to the same
//! store overlap.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use mien_core::{landmark_descriptor, BestSampleMatcher, DetectedFace, FaceBox, Identity, Matcher};

use crate::config::Config;
use crate::session::{Cancelled, EnrollmentSession, Offer, SessionError};
use crate::store::{GalleryStore, StoreError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("enrollment error: {0}")]
    Session(#[from] SessionError),
    #[error("gallery store error: {0}")]
    Store(#[from] StoreError),
    #[error("pipeline worker exited")]
    ChannelClosed,
}

/// One labeled face box for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceAnnotation {
    pub bbox: FaceBox,
    pub label: Option<String>,
}

/// Metadata about one enrolled identity (no descriptor data).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentitySummary {
    pub name: String,
    pub samples: usize,
}

/// Enrollment lifecycle notifications for UI prompts.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    EnrollmentStarted {
        name: String,
    },
    EnrollmentProgress {
        collected: usize,
        quota: usize,
    },
    EnrollmentCommitted {
        name: String,
        samples: usize,
    },
    EnrollmentCancelled {
        name: String,
        collected: usize,
    },
    /// A background gallery write failed. The in-memory gallery is
    /// intact; the subscriber should warn the user or retry.
    PersistFailed {
        message: String,
    },
}

/// Messages sent from handles to the worker thread.
enum PipelineRequest {
    Frame {
        faces: Vec<DetectedFace>,
        reply: oneshot::Sender<Vec<FaceAnnotation>>,
    },
    StartEnrollment {
        name: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    CancelEnrollment {
        reply: oneshot::Sender<Option<Cancelled>>,
    },
    Identities {
        reply: oneshot::Sender<Vec<IdentitySummary>>,
    },
    Clear {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Commands for the writer thread. Saves, clears, and flush barriers
/// share one queue so they stay ordered relative to each other.
enum WriteCommand {
    Save(Vec<Identity>),
    Clear {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Clone-safe handle to the pipeline worker.
#[derive(Clone, Debug)]
pub struct PipelineHandle {
    tx: mpsc::Sender<PipelineRequest>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PipelineHandle {
    /// Process one frame's detected faces, returning one annotation per
    /// face in input order.
    pub async fn process_frame(
        &self,
        faces: Vec<DetectedFace>,
    ) -> Result<Vec<FaceAnnotation>, PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PipelineRequest::Frame {
                faces,
                reply: reply_tx,
            })
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PipelineError::ChannelClosed)
    }

    /// Begin enrolling a new identity under `name`.
    pub async fn start_enrollment(&self, name: impl Into<String>) -> Result<(), PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PipelineRequest::StartEnrollment {
                name: name.into(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PipelineError::ChannelClosed)??;
        Ok(())
    }

    /// Abandon the in-progress enrollment, if any. Safe to call at any
    /// time; returns what was discarded.
    pub async fn cancel_enrollment(&self) -> Result<Option<Cancelled>, PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PipelineRequest::CancelEnrollment { reply: reply_tx })
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PipelineError::ChannelClosed)
    }

    /// List enrolled identities (name and sample count), in gallery order.
    pub async fn identities(&self) -> Result<Vec<IdentitySummary>, PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PipelineRequest::Identities { reply: reply_tx })
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PipelineError::ChannelClosed)
    }

    /// Drop every enrolled identity, in memory and on disk.
    pub async fn clear(&self) -> Result<(), PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PipelineRequest::Clear { reply: reply_tx })
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PipelineError::ChannelClosed)??;
        Ok(())
    }

    /// Wait until every gallery write scheduled so far has completed.
    ///
    /// Useful before process exit; write *failures* are reported through
    /// [`PipelineEvent::PersistFailed`], not here.
    pub async fn flush(&self) -> Result<(), PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PipelineRequest::Flush { reply: reply_tx })
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PipelineError::ChannelClosed)
    }

    /// Subscribe to enrollment lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }
}

/// Spawn the pipeline on a dedicated worker thread.
///
/// Opens the gallery store and loads the persisted gallery up front
/// (fail-fast: corrupt data is surfaced here, and the caller decides
/// between an explicit clear and aborting), then starts the writer and
/// worker threads.
pub fn spawn_pipeline(config: Config) -> Result<PipelineHandle, PipelineError> {
    let store = GalleryStore::open(&config.gallery_path)?;
    let gallery = store.load_all()?;
    tracing::info!(
        identities = gallery.len(),
        path = %config.gallery_path.display(),
        threshold = config.match_threshold,
        "gallery loaded"
    );

    let (tx, mut rx) = mpsc::channel::<PipelineRequest>(4);
    let (write_tx, mut write_rx) = mpsc::unbounded_channel::<WriteCommand>();
    let (events, _) = broadcast::channel(16);

    let writer_events = events.clone();
    std::thread::Builder::new()
        .name("mien-writer".into())
        .spawn(move || {
            tracing::debug!("writer thread started");
            while let Some(cmd) = write_rx.blocking_recv() {
                match cmd {
                    WriteCommand::Save(identities) => {
                        if let Err(e) = store.save_all(&identities) {
                            tracing::error!(error = %e, "gallery save failed");
                            let _ = writer_events.send(PipelineEvent::PersistFailed {
                                message: e.to_string(),
                            });
                        }
                    }
                    WriteCommand::Clear { reply } => {
                        let _ = reply.send(store.clear());
                    }
                    WriteCommand::Flush { reply } => {
                        let _ = reply.send(());
                    }
                }
            }
            tracing::debug!("writer thread exiting");
        })
        .expect("failed to spawn writer thread");

    let mut worker = Worker {
        gallery,
        session: EnrollmentSession::new(config.enroll_samples),
        threshold: config.match_threshold,
        write_tx,
        events: events.clone(),
    };

    std::thread::Builder::new()
        .name("mien-pipeline".into())
        .spawn(move || {
            tracing::info!("pipeline worker started");
            while let Some(req) = rx.blocking_recv() {
                worker.handle(req);
            }
            tracing::info!("pipeline worker exiting");
        })
        .expect("failed to spawn pipeline thread");

    Ok(PipelineHandle { tx, events })
}

/// Owns the gallery and the enrollment session; runs on the worker
/// thread, one request at a time.
struct Worker {
    gallery: Vec<Identity>,
    session: EnrollmentSession,
    threshold: f32,
    write_tx: mpsc::UnboundedSender<WriteCommand>,
    events: broadcast::Sender<PipelineEvent>,
}

impl Worker {
    fn handle(&mut self, req: PipelineRequest) {
        match req {
            PipelineRequest::Frame { faces, reply } => {
                let _ = reply.send(self.annotate_faces(faces));
            }
            PipelineRequest::StartEnrollment { name, reply } => {
                let result = self.session.start(&name);
                match &result {
                    Ok(()) => {
                        let name = name.trim().to_string();
                        tracing::info!(
                            name = %name,
                            quota = self.session.quota(),
                            "enrollment started"
                        );
                        let _ = self.events.send(PipelineEvent::EnrollmentStarted { name });
                    }
                    Err(e) => tracing::warn!(error = %e, "enrollment start rejected"),
                }
                let _ = reply.send(result);
            }
            PipelineRequest::CancelEnrollment { reply } => {
                let cancelled = self.session.cancel();
                if let Some(c) = &cancelled {
                    tracing::info!(name = %c.name, collected = c.collected, "enrollment cancelled");
                    let _ = self.events.send(PipelineEvent::EnrollmentCancelled {
                        name: c.name.clone(),
                        collected: c.collected,
                    });
                }
                let _ = reply.send(cancelled);
            }
            PipelineRequest::Identities { reply } => {
                let summaries = self
                    .gallery
                    .iter()
                    .map(|identity| IdentitySummary {
                        name: identity.name.clone(),
                        samples: identity.descriptors.len(),
                    })
                    .collect();
                let _ = reply.send(summaries);
            }
            PipelineRequest::Clear { reply } => {
                self.gallery.clear();
                // Route the delete through the writer queue so it stays
                // ordered against any pending saves.
                let (wr_tx, wr_rx) = oneshot::channel();
                let result = if self
                    .write_tx
                    .send(WriteCommand::Clear { reply: wr_tx })
                    .is_ok()
                {
                    wr_rx.blocking_recv().unwrap_or_else(|_| {
                        Err(StoreError::Io(std::io::Error::other("gallery writer exited")))
                    })
                } else {
                    Err(StoreError::Io(std::io::Error::other("gallery writer exited")))
                };
                // The in-memory gallery stays cleared even when the delete
                // failed; the caller is told so it can retry or warn.
                let _ = reply.send(result);
            }
            PipelineRequest::Flush { reply } => {
                let (wr_tx, wr_rx) = oneshot::channel();
                if self.write_tx.send(WriteCommand::Flush { reply: wr_tx }).is_ok() {
                    let _ = wr_rx.blocking_recv();
                }
                let _ = reply.send(());
            }
        }
    }

    /// Route one frame's faces: enrollment while a session is collecting,
    /// recognition otherwise. Faces are labeled independently, in input
    /// order; the one pipeline-wide session sees every usable face.
    fn annotate_faces(&mut self, faces: Vec<DetectedFace>) -> Vec<FaceAnnotation> {
        faces
            .into_iter()
            .map(|face| {
                let label = match landmark_descriptor(&face.bbox, &face.landmarks) {
                    None if self.session.is_active() => Some("face not aligned".to_string()),
                    None => None,
                    Some(descriptor) => Some(match self.session.offer(descriptor) {
                        Offer::Ignored(descriptor) => {
                            let result = BestSampleMatcher.compare(
                                &descriptor,
                                &self.gallery,
                                self.threshold,
                            );
                            match result.name {
                                Some(name) => format!("{name} ({:.2})", result.score),
                                None => format!("unknown ({:.2})", result.score),
                            }
                        }
                        Offer::Collected { count, quota } => {
                            let _ = self.events.send(PipelineEvent::EnrollmentProgress {
                                collected: count,
                                quota,
                            });
                            format!("collecting: {count}/{quota}")
                        }
                        Offer::Committed(identity) => {
                            let name = identity.name.clone();
                            let samples = identity.descriptors.len();
                            tracing::info!(name = %name, samples, "enrollment committed");

                            self.gallery.push(identity);
                            let _ = self.write_tx.send(WriteCommand::Save(self.gallery.clone()));
                            let _ = self
                                .events
                                .send(PipelineEvent::EnrollmentCommitted { name, samples });
                            format!("collecting: {samples}/{samples}")
                        }
                    }),
                };
                FaceAnnotation {
                    bbox: face.bbox,
                    label,
                }
            })
            .collect()
    }
}
