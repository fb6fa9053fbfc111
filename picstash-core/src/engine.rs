//! Gallery engine driving store operations off the UI thread
//!
//! Commands go in over an unbounded channel, results come back as
//! events; the UI polls `try_recv` each frame so it never blocks on the
//! store. Mutations that succeed are followed by a fresh `Images` event,
//! mirroring the refresh-after-change behavior of the gallery.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::protocol::NOT_FOUND_ERROR;
use crate::store::{ImageRecord, ImageStore, UploadFile};

pub enum GalleryCommand {
    Refresh,
    Upload(Vec<UploadFile>),
    Delete(String),
}

#[derive(Debug, Clone)]
pub enum GalleryEvent {
    /// Fresh image list from the store
    Images(Vec<ImageRecord>),
    /// A batch upload stored at least one file; per-file errors ride along
    UploadDone { errors: Vec<String> },
    /// Nothing in the batch was stored
    UploadFailed(String),
    Deleted(String),
    DeleteFailed(String),
    /// Store or transport failure outside upload/delete
    Error(String),
}

pub struct GalleryEngine {
    cmd_tx: mpsc::UnboundedSender<GalleryCommand>,
    event_rx: mpsc::UnboundedReceiver<GalleryEvent>,
    #[allow(dead_code)]
    processor_handle: JoinHandle<()>,
}

impl GalleryEngine {
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let processor_handle = tokio::spawn(async move {
            Self::processor_loop(store, cmd_rx, event_tx).await;
        });

        Self {
            cmd_tx,
            event_rx,
            processor_handle,
        }
    }

    async fn processor_loop(
        store: Arc<dyn ImageStore>,
        mut cmd_rx: mpsc::UnboundedReceiver<GalleryCommand>,
        event_tx: mpsc::UnboundedSender<GalleryEvent>,
    ) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                GalleryCommand::Refresh => {
                    Self::send_list(&store, &event_tx).await;
                }
                GalleryCommand::Upload(files) => match store.upload(files).await {
                    Ok(report) => {
                        if report.ok() {
                            let _ = event_tx.send(GalleryEvent::UploadDone {
                                errors: report.errors,
                            });
                            Self::send_list(&store, &event_tx).await;
                        } else {
                            let _ =
                                event_tx.send(GalleryEvent::UploadFailed(report.error_summary()));
                        }
                    }
                    Err(e) => {
                        let _ = event_tx.send(GalleryEvent::UploadFailed(e.to_string()));
                    }
                },
                GalleryCommand::Delete(filename) => match store.delete(&filename).await {
                    Ok(true) => {
                        let _ = event_tx.send(GalleryEvent::Deleted(filename));
                        Self::send_list(&store, &event_tx).await;
                    }
                    Ok(false) => {
                        let _ =
                            event_tx.send(GalleryEvent::DeleteFailed(NOT_FOUND_ERROR.to_string()));
                    }
                    Err(e) => {
                        let _ = event_tx.send(GalleryEvent::DeleteFailed(e.to_string()));
                    }
                },
            }
        }
    }

    async fn send_list(store: &Arc<dyn ImageStore>, event_tx: &mpsc::UnboundedSender<GalleryEvent>) {
        match store.list().await {
            Ok(images) => {
                let _ = event_tx.send(GalleryEvent::Images(images));
            }
            Err(e) => {
                let _ = event_tx.send(GalleryEvent::Error(e.to_string()));
            }
        }
    }

    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(GalleryCommand::Refresh);
    }

    pub fn upload(&self, files: Vec<UploadFile>) {
        let _ = self.cmd_tx.send(GalleryCommand::Upload(files));
    }

    pub fn delete(&self, filename: impl Into<String>) {
        let _ = self.cmd_tx.send(GalleryCommand::Delete(filename.into()));
    }

    pub fn try_recv(&mut self) -> Option<GalleryEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => Some(event),
            Err(_) => None,
        }
    }

    pub async fn next_event(&mut self) -> Option<GalleryEvent> {
        self.event_rx.recv().await
    }
}
