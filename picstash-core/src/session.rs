//! Client-side gallery session state
//!
//! One `GallerySession` exists per open gallery. It owns the image list,
//! the current selection and the single-shot insert callback; the UI and
//! the engine mutate it only through the methods here so every state
//! transition stays in one place.

use tracing::debug;

use crate::store::ImageRecord;

/// Callback handed to `GallerySession::open`, invoked at most once with
/// the embeddable snippet when the user confirms a selection.
pub type InsertCallback = Box<dyn FnOnce(String) + Send>;

/// Load state of the gallery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The initial list request is outstanding
    Loading,
    Ready,
    /// A batch upload is outstanding; further uploads are rejected
    Uploading,
}

pub struct GallerySession {
    images: Vec<ImageRecord>,
    selected: Option<String>,
    phase: Phase,
    on_insert: Option<InsertCallback>,
}

impl GallerySession {
    /// Open a new session. The caller issues the initial list request.
    pub fn open(on_insert: InsertCallback) -> Self {
        GallerySession {
            images: Vec::new(),
            selected: None,
            phase: Phase::Loading,
            on_insert: Some(on_insert),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// Replace the image list with a fresh one from the store.
    ///
    /// The selection is held by filename and re-resolved here; a record
    /// that vanished from the new list clears it.
    pub fn set_images(&mut self, images: Vec<ImageRecord>) {
        self.images = images;
        if self.phase == Phase::Loading {
            self.phase = Phase::Ready;
        }
        if let Some(selected) = &self.selected {
            if !self.images.iter().any(|i| &i.filename == selected) {
                debug!("selected image {} vanished from the store", selected);
                self.selected = None;
            }
        }
    }

    /// Select an image by filename, replacing any prior selection.
    /// Filenames not in the current list are ignored.
    pub fn select(&mut self, filename: &str) -> bool {
        if self.images.iter().any(|i| i.filename == filename) {
            self.selected = Some(filename.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&ImageRecord> {
        let selected = self.selected.as_deref()?;
        self.images.iter().find(|i| i.filename == selected)
    }

    /// Whether the confirm action is enabled
    pub fn can_insert(&self) -> bool {
        self.selected().is_some() && self.on_insert.is_some()
    }

    /// Enter the uploading state.
    ///
    /// Returns false (and changes nothing) while another upload is
    /// outstanding or the initial list never arrived.
    pub fn begin_upload(&mut self) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }
        self.phase = Phase::Uploading;
        true
    }

    /// Leave the uploading state, whatever the outcome was.
    pub fn finish_upload(&mut self) {
        if self.phase == Phase::Uploading {
            self.phase = Phase::Ready;
        }
    }

    /// Build the embed snippet for the current selection and fire the
    /// insert callback.
    ///
    /// Returns the snippet, or None without a selection. The callback is
    /// single-shot; the session is spent after this and should be closed
    /// by the caller.
    pub fn confirm_insert(&mut self) -> Option<String> {
        let snippet = embed_snippet(self.selected()?);
        let callback = self.on_insert.take()?;
        callback(snippet.clone());
        Some(snippet)
    }

    /// Discard all session state. Safe to call from any state; the insert
    /// callback is dropped unfired.
    pub fn close(&mut self) {
        self.images.clear();
        self.selected = None;
        self.on_insert = None;
    }
}

/// `<img>` markup for a stored image; the label is the filename with its
/// extension stripped.
pub fn embed_snippet(image: &ImageRecord) -> String {
    let label = image
        .filename
        .rsplit_once('.')
        .map(|(base, _)| base)
        .unwrap_or(&image.filename);
    format!(
        r#"<img src="{}" alt="{}" style="max-width: 100%; height: auto;" />"#,
        image.url, label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn record(filename: &str) -> ImageRecord {
        ImageRecord {
            filename: filename.to_string(),
            url: format!("/assets/images/{}", filename),
            size: 1,
            modified: 0,
        }
    }

    fn open_with_sink() -> (GallerySession, Arc<Mutex<Vec<String>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&sink);
        let session = GallerySession::open(Box::new(move |snippet| {
            captured.lock().unwrap().push(snippet);
        }));
        (session, sink)
    }

    #[test]
    fn test_open_starts_loading_and_first_list_makes_ready() {
        let (mut session, _) = open_with_sink();
        assert_eq!(session.phase(), Phase::Loading);

        session.set_images(vec![record("a.png")]);
        assert_eq!(session.phase(), Phase::Ready);
    }

    #[test]
    fn test_selection_replaced_not_stacked() {
        let (mut session, _) = open_with_sink();
        session.set_images(vec![record("a.png"), record("b.png")]);

        assert!(session.select("a.png"));
        assert!(session.select("b.png"));
        assert_eq!(session.selected().unwrap().filename, "b.png");

        assert!(!session.select("missing.png"));
        assert_eq!(session.selected().unwrap().filename, "b.png");
    }

    #[test]
    fn test_selection_cleared_when_record_vanishes() {
        let (mut session, _) = open_with_sink();
        session.set_images(vec![record("a.png"), record("b.png")]);
        session.select("a.png");
        assert!(session.can_insert());

        // The selected file was deleted; the refreshed list no longer
        // holds it
        session.set_images(vec![record("b.png")]);
        assert!(session.selected().is_none());
        assert!(!session.can_insert());
    }

    #[test]
    fn test_uploading_blocks_overlapping_uploads() {
        let (mut session, _) = open_with_sink();
        assert!(!session.begin_upload(), "cannot upload while loading");

        session.set_images(Vec::new());
        assert!(session.begin_upload());
        assert!(!session.begin_upload(), "second upload must be rejected");

        session.finish_upload();
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.begin_upload());
    }

    #[test]
    fn test_confirm_insert_builds_snippet_and_fires_once() {
        let (mut session, sink) = open_with_sink();
        session.set_images(vec![record("cat_123_abc.png")]);
        session.select("cat_123_abc.png");

        let snippet = session.confirm_insert().unwrap();
        assert_eq!(
            snippet,
            r#"<img src="/assets/images/cat_123_abc.png" alt="cat_123_abc" style="max-width: 100%; height: auto;" />"#
        );
        assert_eq!(sink.lock().unwrap().as_slice(), &[snippet.clone()]);

        // The callback is spent
        assert!(session.confirm_insert().is_none());
        assert_eq!(sink.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_confirm_insert_requires_selection() {
        let (mut session, sink) = open_with_sink();
        session.set_images(vec![record("a.png")]);

        assert!(session.confirm_insert().is_none());
        assert!(sink.lock().unwrap().is_empty());
        assert!(session.can_insert() == false);
    }

    #[test]
    fn test_close_drops_callback_unfired() {
        let (mut session, sink) = open_with_sink();
        session.set_images(vec![record("a.png")]);
        session.select("a.png");

        session.close();
        assert!(session.images().is_empty());
        assert!(session.confirm_insert().is_none());
        assert!(sink.lock().unwrap().is_empty());
    }
}
