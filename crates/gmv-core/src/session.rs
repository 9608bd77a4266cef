use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::api_types::{ActionKind, ImageSummary, PrimaryAction, SessionView};
use crate::error::{GmvError, Result, EXTRACTION_FAILED_MESSAGE};
use crate::image::UploadedImage;

/// How long the "Copied" acknowledgment stays up after a copy.
pub const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

/// Identifies one extraction request and the image it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTicket {
    pub seq: u64,
    pub image_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    Idle,
    Processing { ticket: ExtractionTicket },
    Success { text: String },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Idle,
    Processing,
    Success,
    Error,
}

impl ExtractionStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            ExtractionStatus::Idle => StatusKind::Idle,
            ExtractionStatus::Processing { .. } => StatusKind::Processing,
            ExtractionStatus::Success { .. } => StatusKind::Success,
            ExtractionStatus::Error { .. } => StatusKind::Error,
        }
    }
}

/// Outcome of reporting a finished request back to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The image was replaced or a newer request superseded this one.
    Stale,
}

/// One user's workspace: the held image plus the four-state extraction status.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    image: Option<UploadedImage>,
    status: ExtractionStatus,
    next_seq: u64,
    copied_at: Option<Instant>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            image: None,
            status: ExtractionStatus::Idle,
            next_seq: 0,
            copied_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn status(&self) -> &ExtractionStatus {
        &self.status
    }

    /// Replace the held image. Allowed from any state; always lands in `Idle`.
    ///
    /// Returns the ticket of a request that was in flight, which is now stale.
    pub fn select_image(&mut self, image: UploadedImage) -> Option<ExtractionTicket> {
        let superseded = match self.status {
            ExtractionStatus::Processing { ticket } => Some(ticket),
            _ => None,
        };
        self.image = Some(image);
        self.status = ExtractionStatus::Idle;
        self.copied_at = None;
        superseded
    }

    /// Move to `Processing` and hand out the ticket for the request to issue.
    pub fn begin_extraction(&mut self) -> Result<ExtractionTicket> {
        if let ExtractionStatus::Processing { .. } = self.status {
            return Err(GmvError::ExtractionInFlight);
        }
        let image_id = self.image.as_ref().ok_or(GmvError::NoImage)?.id;

        self.next_seq += 1;
        let ticket = ExtractionTicket {
            seq: self.next_seq,
            image_id,
        };
        self.status = ExtractionStatus::Processing { ticket };
        self.copied_at = None;
        Ok(ticket)
    }

    /// True while `ticket` is the pending request for the image still held.
    pub fn is_current(&self, ticket: ExtractionTicket) -> bool {
        let image_matches = self
            .image
            .as_ref()
            .is_some_and(|image| image.id == ticket.image_id);
        image_matches
            && matches!(self.status, ExtractionStatus::Processing { ticket: pending } if pending == ticket)
    }

    /// Record the text as returned by the service. Stored verbatim.
    pub fn complete(&mut self, ticket: ExtractionTicket, text: String) -> Completion {
        if !self.is_current(ticket) {
            return Completion::Stale;
        }
        self.status = ExtractionStatus::Success { text };
        Completion::Applied
    }

    /// Record a failed request. The message is always the generic one.
    pub fn fail(&mut self, ticket: ExtractionTicket) -> Completion {
        if !self.is_current(ticket) {
            return Completion::Stale;
        }
        self.status = ExtractionStatus::Error {
            message: EXTRACTION_FAILED_MESSAGE.to_string(),
        };
        Completion::Applied
    }

    /// Start the copy acknowledgment and return the text to copy.
    /// Only meaningful in `Success`; elsewhere nothing happens.
    pub fn mark_copied(&mut self, now: Instant) -> Option<String> {
        match &self.status {
            ExtractionStatus::Success { text } => {
                self.copied_at = Some(now);
                Some(text.clone())
            }
            _ => None,
        }
    }

    pub fn copy_acknowledged(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_ACK_DURATION)
    }

    pub fn primary_action(&self) -> Option<PrimaryAction> {
        match self.status {
            ExtractionStatus::Idle => Some(PrimaryAction::new(
                ActionKind::Extract,
                self.image.is_some(),
            )),
            ExtractionStatus::Processing { .. } => None,
            ExtractionStatus::Success { .. } => {
                Some(PrimaryAction::new(ActionKind::Regenerate, true))
            }
            ExtractionStatus::Error { .. } => Some(PrimaryAction::new(ActionKind::TryAgain, true)),
        }
    }

    pub fn view(&self, now: Instant) -> SessionView {
        let (result, error) = match &self.status {
            ExtractionStatus::Success { text } => (Some(text.clone()), None),
            ExtractionStatus::Error { message } => (None, Some(message.clone())),
            _ => (None, None),
        };
        SessionView {
            session_id: self.id,
            status: self.status.kind(),
            primary_action: self.primary_action(),
            result,
            error,
            copied: self.copy_acknowledged(now),
            image: self.image.as_ref().map(ImageSummary::from),
            can_change_image: self.status.kind() != StatusKind::Processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn image() -> UploadedImage {
        UploadedImage::from_upload(Some("photo.png"), "image/png", PNG).unwrap()
    }

    fn session_with_image() -> Session {
        let mut session = Session::new(Uuid::new_v4());
        session.select_image(image());
        session
    }

    #[test]
    fn starts_idle_with_disabled_trigger() {
        let session = Session::new(Uuid::new_v4());
        assert_eq!(session.status(), &ExtractionStatus::Idle);
        let action = session.primary_action().unwrap();
        assert_eq!(action.kind, ActionKind::Extract);
        assert!(!action.enabled);
    }

    #[test]
    fn image_enables_trigger_but_stays_idle() {
        let session = session_with_image();
        assert_eq!(session.status(), &ExtractionStatus::Idle);
        assert!(session.primary_action().unwrap().enabled);
    }

    #[test]
    fn begin_without_image_is_rejected() {
        let mut session = Session::new(Uuid::new_v4());
        assert!(matches!(session.begin_extraction(), Err(GmvError::NoImage)));
        assert_eq!(session.status(), &ExtractionStatus::Idle);
    }

    #[test]
    fn second_begin_while_processing_is_rejected() {
        let mut session = session_with_image();
        let first = session.begin_extraction().unwrap();
        assert!(matches!(
            session.begin_extraction(),
            Err(GmvError::ExtractionInFlight)
        ));
        assert!(session.is_current(first));
        assert!(session.primary_action().is_none());
    }

    #[test]
    fn success_keeps_text_verbatim() {
        let mut session = session_with_image();
        let ticket = session.begin_extraction().unwrap();
        let text = "**Total:** $1,234 (+5.0% MoM, -2.1% YoY)\n\n  trailing  \n".to_string();
        assert_eq!(session.complete(ticket, text.clone()), Completion::Applied);
        assert_eq!(session.status(), &ExtractionStatus::Success { text });
        assert_eq!(session.primary_action().unwrap().kind, ActionKind::Regenerate);
    }

    #[test]
    fn failure_uses_generic_message() {
        let mut session = session_with_image();
        let ticket = session.begin_extraction().unwrap();
        assert_eq!(session.fail(ticket), Completion::Applied);
        let view = session.view(Instant::now());
        assert_eq!(view.status, StatusKind::Error);
        assert_eq!(view.error.as_deref(), Some(EXTRACTION_FAILED_MESSAGE));
        assert_eq!(view.primary_action.unwrap().label, "Try Again");
    }

    #[test]
    fn retry_from_error_and_success_issues_new_ticket() {
        let mut session = session_with_image();
        let first = session.begin_extraction().unwrap();
        session.fail(first);
        let second = session.begin_extraction().unwrap();
        assert_ne!(first, second);
        session.complete(second, "ok".into());
        let third = session.begin_extraction().unwrap();
        assert_eq!(third.seq, 3);
        assert_eq!(session.status().kind(), StatusKind::Processing);
    }

    #[test]
    fn new_image_resets_result_and_error() {
        let mut session = session_with_image();
        let ticket = session.begin_extraction().unwrap();
        session.complete(ticket, "summary".into());
        session.select_image(image());
        let view = session.view(Instant::now());
        assert_eq!(view.status, StatusKind::Idle);
        assert!(view.result.is_none());
        assert!(view.error.is_none());
    }

    #[test]
    fn response_for_replaced_image_is_discarded() {
        let mut session = session_with_image();
        let ticket = session.begin_extraction().unwrap();
        assert_eq!(session.select_image(image()), Some(ticket));
        assert_eq!(session.complete(ticket, "late".into()), Completion::Stale);
        assert_eq!(session.status(), &ExtractionStatus::Idle);
    }

    #[test]
    fn stale_ticket_cannot_overwrite_newer_request() {
        let mut session = session_with_image();
        let old = session.begin_extraction().unwrap();
        session.select_image(image());
        let current = session.begin_extraction().unwrap();
        assert_eq!(session.fail(old), Completion::Stale);
        assert!(session.is_current(current));
    }

    #[test]
    fn copy_ack_expires_after_two_seconds() {
        let mut session = session_with_image();
        let ticket = session.begin_extraction().unwrap();
        session.complete(ticket, "summary".into());

        let now = Instant::now();
        assert_eq!(session.mark_copied(now).as_deref(), Some("summary"));
        assert!(session.view(now + Duration::from_millis(1999)).copied);

        let later = session.view(now + COPY_ACK_DURATION);
        assert!(!later.copied);
        assert_eq!(later.status, StatusKind::Success);
        assert_eq!(later.result.as_deref(), Some("summary"));
    }

    #[test]
    fn copy_outside_success_does_nothing() {
        let mut session = session_with_image();
        let now = Instant::now();
        assert!(session.mark_copied(now).is_none());
        assert!(!session.copy_acknowledged(now));
    }

    #[test]
    fn image_cannot_be_changed_while_processing() {
        let mut session = session_with_image();
        session.begin_extraction().unwrap();
        assert!(!session.view(Instant::now()).can_change_image);
    }
}
