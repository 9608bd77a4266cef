use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api_types::SessionView;
use crate::error::{GmvError, Result};
use crate::extraction::Extractor;
use crate::image::UploadedImage;
use crate::session::{Completion, ExtractionTicket, Session};

struct SessionEntry {
    session: Session,
    in_flight: Option<AbortHandle>,
    last_seen: Instant,
}

impl SessionEntry {
    fn new(session: Session, now: Instant) -> Self {
        Self {
            session,
            in_flight: None,
            last_seen: now,
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

/// In-memory sessions plus the extractor they share.
///
/// Each trigger spawns one task that issues a single request and reports back
/// through the session's ticket check. Replacing the image aborts that task.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    extractor: Arc<dyn Extractor>,
}

/// A request that has been issued. Dropping it detaches the task.
pub struct PendingExtraction {
    pub ticket: ExtractionTicket,
    pub view: SessionView,
    handle: JoinHandle<()>,
}

impl PendingExtraction {
    /// Wait for the request to resolve. `false` if the task was aborted.
    pub async fn finished(self) -> bool {
        match self.handle.await {
            Ok(()) => true,
            Err(e) if e.is_cancelled() => false,
            Err(e) => {
                error!(error = %e, "Extraction task panicked");
                false
            }
        }
    }
}

impl SessionRegistry {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            extractor,
        }
    }

    pub fn model(&self) -> &str {
        self.extractor.model()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn create(&self) -> SessionView {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let session = Session::new(id);
        let view = session.view(now);
        self.sessions
            .write()
            .await
            .insert(id, SessionEntry::new(session, now));
        info!(session_id = %id, "Session created");
        view
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView> {
        let mut sessions = self.sessions.write().await;
        let entry = touch(&mut sessions, id)?;
        Ok(entry.session.view(entry.last_seen))
    }

    /// Drop a session, aborting anything it still has in flight.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let mut entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(GmvError::SessionNotFound(id))?;
        entry.abort_in_flight();
        info!(session_id = %id, "Session removed");
        Ok(())
    }

    /// Drop every session not touched for `max_idle`. Returns how many went.
    ///
    /// Pages that vanish without sending `DELETE` are only reclaimed here.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.saturating_duration_since(entry.last_seen) < max_idle;
            if !keep {
                entry.abort_in_flight();
                debug!(session_id = %id, "Evicting idle session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Run [`evict_idle`](Self::evict_idle) every `every` until the handle is aborted.
    pub fn spawn_sweeper(&self, max_idle: Duration, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.evict_idle(max_idle).await;
            }
        })
    }

    pub async fn select_image(&self, id: Uuid, image: UploadedImage) -> Result<SessionView> {
        let mut sessions = self.sessions.write().await;
        let entry = touch(&mut sessions, id)?;

        let image_id = image.id;
        if let Some(superseded) = entry.session.select_image(image) {
            warn!(
                session_id = %id,
                seq = superseded.seq,
                "Image replaced while extraction in flight, aborting request"
            );
        }
        entry.abort_in_flight();

        debug!(session_id = %id, image_id = %image_id, "Image selected");
        Ok(entry.session.view(entry.last_seen))
    }

    /// Issue one extraction for the session's current image.
    ///
    /// Rejected with `NoImage` or `ExtractionInFlight` without touching the service.
    pub async fn trigger(&self, id: Uuid) -> Result<PendingExtraction> {
        let mut sessions = self.sessions.write().await;
        let entry = touch(&mut sessions, id)?;

        let ticket = entry.session.begin_extraction().map_err(|e| {
            debug!(session_id = %id, error = %e, "Extraction not started");
            e
        })?;
        let image = entry
            .session
            .image()
            .cloned()
            .ok_or(GmvError::NoImage)?;

        info!(
            session_id = %id,
            seq = ticket.seq,
            mime_type = %image.mime_type,
            model = %self.extractor.model(),
            "Starting extraction"
        );

        let sessions_handle = self.sessions.clone();
        let extractor = self.extractor.clone();
        // The write lock is held until the abort handle is stored, so the task
        // cannot report back before its entry knows about it.
        let handle = tokio::spawn(async move {
            let outcome = extractor.extract(&image).await;

            let mut sessions = sessions_handle.write().await;
            let Some(entry) = sessions.get_mut(&id) else {
                debug!(session_id = %id, "Session gone before extraction resolved");
                return;
            };

            let completion = match outcome {
                Ok(text) => {
                    info!(
                        session_id = %id,
                        seq = ticket.seq,
                        response_len = text.len(),
                        "Extraction succeeded"
                    );
                    entry.session.complete(ticket, text)
                }
                Err(e) => {
                    error!(session_id = %id, seq = ticket.seq, error = %e, "Extraction failed");
                    entry.session.fail(ticket)
                }
            };

            match completion {
                Completion::Applied => entry.in_flight = None,
                Completion::Stale => {
                    warn!(session_id = %id, seq = ticket.seq, "Discarded stale extraction response")
                }
            }
        });

        entry.in_flight = Some(handle.abort_handle());
        let view = entry.session.view(entry.last_seen);

        Ok(PendingExtraction {
            ticket,
            view,
            handle,
        })
    }

    /// Start the copy acknowledgment. `None` text outside `Success`.
    pub async fn copy(&self, id: Uuid) -> Result<(Option<String>, SessionView)> {
        let mut sessions = self.sessions.write().await;
        let entry = touch(&mut sessions, id)?;
        let now = entry.last_seen;
        let text = entry.session.mark_copied(now);
        Ok((text, entry.session.view(now)))
    }
}

/// Look up a session and mark it as seen now.
fn touch(sessions: &mut HashMap<Uuid, SessionEntry>, id: Uuid) -> Result<&mut SessionEntry> {
    let entry = sessions.get_mut(&id).ok_or(GmvError::SessionNotFound(id))?;
    entry.last_seen = Instant::now();
    Ok(entry)
}
