// Request pipeline behind every booking / inquiry style form:
// validate -> submit -> invalidate cached reads -> notify.
// Side effects run only after the server acknowledged the request.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ServerRecord};
use crate::cache::QueryCache;
use crate::forms::{FieldErrors, SubmissionForm};
use crate::notify::{NotificationKind, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Idle,
    Editing,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Open,
    Edit,
    Submit,
    ServerAccepted,
    ServerFailed,
    Close,
}

impl FormStatus {
    // None means the event is ignored in this state
    pub fn next(self, event: FormEvent) -> Option<FormStatus> {
        use FormEvent::*;
        use FormStatus::*;

        match (self, event) {
            (Idle | Succeeded, Open) => Some(Editing),
            (Editing | Failed, Edit) => Some(Editing),
            (Editing | Failed, Submit) => Some(Submitting),
            (Submitting, ServerAccepted) => Some(Succeeded),
            (Submitting, ServerFailed) => Some(Failed),
            // Closing does not cancel an in-flight request
            (Editing | Submitting | Succeeded | Failed, Close) => Some(Idle),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FormStatus::Succeeded | FormStatus::Failed)
    }

    pub fn is_open(self) -> bool {
        matches!(
            self,
            FormStatus::Editing | FormStatus::Submitting | FormStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted(ServerRecord),
    // Local validation failed, nothing was sent
    Rejected(FieldErrors),
    Failed(ApiError),
    // Re-entrant submit, or the form is not open
    Ignored,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

struct FormState<F> {
    status: FormStatus,
    draft: Option<F>,
    // Bumped on every open so a late response cannot touch a newer form
    generation: u64,
    last_error: Option<String>,
}

impl<F> FormState<F> {
    fn apply(&mut self, event: FormEvent) -> bool {
        match self.status.next(event) {
            Some(next) => {
                self.status = next;
                true
            }
            None => false,
        }
    }
}

pub fn new_idempotency_key() -> String {
    format!("{:016x}", rand::random::<u64>())
}

// One form instance. At most one request is in flight per instance.
pub struct RequestPipeline<F: SubmissionForm> {
    api: Arc<dyn ApiClient>,
    cache: Arc<dyn QueryCache>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<FormState<F>>,
}

impl<F: SubmissionForm> RequestPipeline<F> {
    pub fn new(
        api: Arc<dyn ApiClient>,
        cache: Arc<dyn QueryCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            cache,
            notifier,
            state: Mutex::new(FormState {
                status: FormStatus::Idle,
                draft: None,
                generation: 0,
                last_error: None,
            }),
        }
    }

    pub fn status(&self) -> FormStatus {
        self.state.lock().status
    }

    pub fn draft(&self) -> Option<F> {
        self.state.lock().draft.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    // Starts a fresh draft. Returns false if the form is already open.
    pub fn open(&self, draft: F) -> bool {
        let mut state = self.state.lock();
        if !state.apply(FormEvent::Open) {
            return false;
        }
        state.draft = Some(draft);
        state.generation += 1;
        state.last_error = None;
        true
    }

    // Input is locked while a request is in flight
    pub fn edit(&self, change: impl FnOnce(&mut F)) -> bool {
        let mut state = self.state.lock();
        if state.status.next(FormEvent::Edit).is_none() {
            return false;
        }
        match state.draft.as_mut() {
            Some(draft) => change(draft),
            None => return false,
        }
        state.apply(FormEvent::Edit)
    }

    // Continuous validation of the current draft
    pub fn validation_errors(&self) -> Option<FieldErrors> {
        self.state
            .lock()
            .draft
            .as_ref()
            .and_then(|draft| draft.check().err())
    }

    // Drives the submit button's enabled state
    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        state.status.next(FormEvent::Submit).is_some()
            && state.draft.as_ref().map_or(false, |d| d.check().is_ok())
    }

    // Discards the draft. An in-flight request still settles and notifies.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.apply(FormEvent::Close) {
            state.draft = None;
            state.last_error = None;
        }
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let (draft, body, generation) = {
            let mut state = self.state.lock();

            if state.status.next(FormEvent::Submit).is_none() {
                debug!(status = ?state.status, "submit ignored");
                return SubmitOutcome::Ignored;
            }
            let draft = match state.draft.clone() {
                Some(draft) => draft,
                None => return SubmitOutcome::Ignored,
            };
            if let Err(errors) = draft.check() {
                debug!(resource = %F::RESOURCE, errors = errors.len(), "submit blocked by validation");
                return SubmitOutcome::Rejected(errors);
            }
            let body = match serde_json::to_value(&draft) {
                Ok(body) => body,
                Err(e) => {
                    drop(state);
                    let error = ApiError::Client(e.to_string());
                    self.report_failure(&draft, &error);
                    return SubmitOutcome::Failed(error);
                }
            };

            state.apply(FormEvent::Submit);
            (draft, body, state.generation)
        };

        let idempotency_key = new_idempotency_key();
        info!(resource = %F::RESOURCE, %idempotency_key, "submitting form");

        match self.api.create(F::RESOURCE, body, &idempotency_key).await {
            Ok(record) => {
                for kind in draft.invalidates() {
                    self.cache.invalidate(kind.cache_key());
                }
                let (title, description) = draft.success_message();
                self.notifier
                    .notify(NotificationKind::Success, &title, &description);
                info!(resource = %F::RESOURCE, id = ?record.id_string(), "submission accepted");

                let mut state = self.state.lock();
                if state.generation == generation && state.apply(FormEvent::ServerAccepted) {
                    state.draft = None;
                    state.last_error = None;
                }
                SubmitOutcome::Accepted(record)
            }
            Err(error) => {
                let message = self.report_failure(&draft, &error);

                // The draft is kept so the user can correct and retry
                let mut state = self.state.lock();
                if state.generation == generation && state.apply(FormEvent::ServerFailed) {
                    state.last_error = Some(message);
                }
                SubmitOutcome::Failed(error)
            }
        }
    }

    fn report_failure(&self, draft: &F, error: &ApiError) -> String {
        let message = error.user_message();
        warn!(resource = %F::RESOURCE, %error, "submission failed");
        self.notifier
            .notify(NotificationKind::Error, draft.failure_title(), &message);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_server::MockBackend;
    use crate::api::GENERIC_FAILURE_MESSAGE;
    use crate::cache::InMemoryQueryCache;
    use crate::catalog::ResourceKind;
    use crate::forms::{BookingRequest, BookingTarget, InquiryRequest};
    use crate::notify::RecordingNotifier;
    use bytes::Bytes;
    use std::time::Duration;
    use test_case::test_case;

    struct Harness {
        backend: Arc<MockBackend>,
        cache: Arc<InMemoryQueryCache>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                backend: Arc::new(MockBackend::new()),
                cache: Arc::new(InMemoryQueryCache::default()),
                notifier: Arc::new(RecordingNotifier::new()),
            }
        }

        fn pipeline<F: SubmissionForm>(&self) -> RequestPipeline<F> {
            RequestPipeline::new(
                self.backend.clone(),
                self.cache.clone(),
                self.notifier.clone(),
            )
        }
    }

    fn booking() -> BookingRequest {
        BookingRequest {
            first_name: "Asha".to_string(),
            last_name: "Verma".to_string(),
            email: "asha.verma@example.com".to_string(),
            travel_date: "2026-11-20".to_string(),
            group_size: 2,
            ..BookingRequest::for_item(BookingTarget::Tour, "golden-triangle")
        }
    }

    #[test_case(FormStatus::Idle, FormEvent::Open, Some(FormStatus::Editing))]
    #[test_case(FormStatus::Editing, FormEvent::Submit, Some(FormStatus::Submitting))]
    #[test_case(FormStatus::Submitting, FormEvent::Submit, None)]
    #[test_case(FormStatus::Submitting, FormEvent::Edit, None)]
    #[test_case(FormStatus::Submitting, FormEvent::ServerAccepted, Some(FormStatus::Succeeded))]
    #[test_case(FormStatus::Submitting, FormEvent::ServerFailed, Some(FormStatus::Failed))]
    #[test_case(FormStatus::Failed, FormEvent::Submit, Some(FormStatus::Submitting))]
    #[test_case(FormStatus::Failed, FormEvent::Edit, Some(FormStatus::Editing))]
    #[test_case(FormStatus::Succeeded, FormEvent::Submit, None)]
    #[test_case(FormStatus::Idle, FormEvent::Submit, None)]
    #[test_case(FormStatus::Editing, FormEvent::Open, None)]
    #[test_case(FormStatus::Submitting, FormEvent::Close, Some(FormStatus::Idle))]
    #[test_case(FormStatus::Idle, FormEvent::ServerAccepted, None)]
    fn test_transitions(from: FormStatus, event: FormEvent, expected: Option<FormStatus>) {
        assert_eq!(from.next(event), expected);
    }

    #[tokio::test]
    async fn test_successful_booking() {
        let harness = Harness::new();
        harness.cache.store("bookings", Bytes::from_static(b"[]"), None);
        harness.cache.store("tours", Bytes::from_static(b"[]"), None);
        harness.cache.store("hotels", Bytes::from_static(b"[]"), None);

        let pipeline = harness.pipeline::<BookingRequest>();
        assert!(pipeline.open(booking()));
        assert_eq!(pipeline.status(), FormStatus::Editing);
        assert!(pipeline.can_submit());

        let outcome = pipeline.submit().await;
        assert!(outcome.is_accepted(), "got {:?}", outcome);
        assert_eq!(pipeline.status(), FormStatus::Succeeded);
        assert!(pipeline.draft().is_none());

        assert!(harness.cache.get("bookings").is_none());
        assert!(harness.cache.get("tours").is_none());
        assert!(harness.cache.get("hotels").is_some());

        let note = harness.notifier.last().unwrap();
        assert_eq!(note.kind, NotificationKind::Success);
        assert!(note.description.contains("within 24 hours"));

        let created = harness.backend.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, ResourceKind::Bookings);
        assert_eq!(created[0].1["email"], "asha.verma@example.com");
        assert_eq!(created[0].2.len(), 16);
    }

    #[tokio::test]
    async fn test_invalid_email_never_reaches_network() {
        let harness = Harness::new();
        let pipeline = harness.pipeline::<BookingRequest>();
        pipeline.open(BookingRequest {
            email: "not-an-email".to_string(),
            ..booking()
        });
        assert!(!pipeline.can_submit());

        match pipeline.submit().await {
            SubmitOutcome::Rejected(errors) => assert!(errors.has("email")),
            other => panic!("expected validation rejection, got {:?}", other),
        }
        assert_eq!(pipeline.status(), FormStatus::Editing);
        assert_eq!(harness.backend.create_count(), 0);
        assert!(harness.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_server_rejection_keeps_form_populated() {
        let harness = Harness::new();
        harness.cache.store("bookings", Bytes::from_static(b"[]"), None);
        harness.backend.reject_next(409, Some("Sold out"));

        let pipeline = harness.pipeline::<BookingRequest>();
        pipeline.open(booking());

        let outcome = pipeline.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.is_rejection()));
        assert_eq!(pipeline.status(), FormStatus::Failed);
        assert_eq!(pipeline.draft(), Some(booking()));
        assert_eq!(pipeline.last_error().as_deref(), Some("Sold out"));

        let note = harness.notifier.last().unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.title, "Booking failed");
        assert_eq!(note.description, "Sold out");

        // Nothing is invalidated without an acknowledgement
        assert!(harness.cache.get("bookings").is_some());
    }

    #[tokio::test]
    async fn test_double_submit_sends_one_request() {
        let harness = Harness::new();
        harness.backend.set_delay(50);

        let pipeline = harness.pipeline::<BookingRequest>();
        pipeline.open(booking());

        let (first, second) = futures::join!(pipeline.submit(), pipeline.submit());
        assert!(first.is_accepted());
        assert_eq!(second, SubmitOutcome::Ignored);
        assert_eq!(harness.backend.create_count(), 1);
        assert_eq!(harness.notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_then_retry() {
        let harness = Harness::new();
        harness.backend.set_network_down(true);

        let pipeline = harness.pipeline::<InquiryRequest>();
        pipeline.open(InquiryRequest {
            first_name: "Lena".to_string(),
            last_name: "Koch".to_string(),
            email: "lena@example.de".to_string(),
            message: "Do you run tours in monsoon season?".to_string(),
            ..InquiryRequest::default()
        });

        let outcome = pipeline.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ApiError::Network(_))));
        assert_eq!(
            harness.notifier.last().unwrap().description,
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(pipeline.status(), FormStatus::Failed);

        harness.backend.set_network_down(false);
        assert!(pipeline.edit(|draft| draft.phone = "+49 30 1234".to_string()));
        assert_eq!(pipeline.status(), FormStatus::Editing);

        let retry = pipeline.submit().await;
        assert!(retry.is_accepted());
        assert_eq!(harness.backend.create_count(), 2);
        assert_eq!(harness.backend.created()[0].1["phone"], "+49 30 1234");
    }

    #[tokio::test]
    async fn test_close_during_flight_still_notifies() {
        let harness = Harness::new();
        harness.backend.set_delay(50);
        harness.cache.store("bookings", Bytes::from_static(b"[]"), None);

        let pipeline = Arc::new(harness.pipeline::<BookingRequest>());
        pipeline.open(booking());

        let in_flight = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pipeline.status(), FormStatus::Submitting);
        pipeline.close();

        let outcome = in_flight.await.unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(pipeline.status(), FormStatus::Idle);
        assert!(pipeline.draft().is_none());
        assert!(harness.cache.get("bookings").is_none());
        assert_eq!(
            harness.notifier.last().unwrap().kind,
            NotificationKind::Success
        );
    }

    #[tokio::test]
    async fn test_reopened_form_is_not_touched_by_stale_response() {
        let harness = Harness::new();
        harness.backend.set_delay(50);
        harness.backend.reject_next(500, Some("Payment gateway down"));

        let pipeline = Arc::new(harness.pipeline::<BookingRequest>());
        pipeline.open(booking());

        let in_flight = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        pipeline.close();
        assert!(pipeline.open(BookingRequest::for_item(BookingTarget::Hotel, "lake-palace")));

        let outcome = in_flight.await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(pipeline.status(), FormStatus::Editing);
        assert!(pipeline.last_error().is_none());
        assert_eq!(
            harness.notifier.last().unwrap().description,
            "Payment gateway down"
        );
    }

    #[tokio::test]
    async fn test_submit_on_closed_form_is_ignored() {
        let harness = Harness::new();
        let pipeline = harness.pipeline::<BookingRequest>();
        assert_eq!(pipeline.submit().await, SubmitOutcome::Ignored);
        assert!(!pipeline.edit(|draft| draft.group_size = 3));
        assert_eq!(harness.backend.create_count(), 0);
    }

    #[test]
    fn test_idempotency_keys_are_hex() {
        let key = new_idempotency_key();
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, new_idempotency_key());
    }
}
