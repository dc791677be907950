//! Mock implementations for testing
//!
//! These mocks enable runtime testing without a real backend.

use crate::backend::{BackendError, ChatBackend, ChatReply, ChatRequest, HealthStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// Mock Backend
// ============================================================================

/// Mock backend that returns queued outcomes in order
pub struct MockBackend {
    responses: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ChatRequest>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(ChatReply::text(reply)));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: BackendError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> Result<ChatReply, BackendError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::network("No mock response queued")))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_outcome()
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "ok".to_string(),
        })
    }

    fn endpoint(&self) -> &str {
        "mock://chat"
    }
}

// ============================================================================
// Gated Mock Backend (holds each call until released)
// ============================================================================

/// Mock backend whose calls block until the test releases them
pub struct GatedBackend {
    inner: MockBackend,
    gate: Semaphore,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

#[allow(dead_code)]
impl GatedBackend {
    pub fn new() -> Self {
        Self {
            inner: MockBackend::new(),
            gate: Semaphore::new(0),
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.inner.queue_reply(reply);
    }

    pub fn queue_error(&self, error: BackendError) {
        self.inner.queue_error(error);
    }

    /// Let one pending (or future) call complete
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| BackendError::network("gate closed"))?;
        permit.forget();

        self.inner.next_outcome()
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.inner.health().await
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

// ============================================================================
// Panicking Mock Backend
// ============================================================================

/// Mock backend that panics inside every chat call
pub struct PanickingBackend;

#[async_trait]
impl ChatBackend for PanickingBackend {
    async fn chat(&self, _request: &ChatRequest) -> Result<ChatReply, BackendError> {
        panic!("backend exploded");
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Err(BackendError::unknown("unhealthy"))
    }

    fn endpoint(&self) -> &str {
        "mock://panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntryId;
    use crate::runtime::{self, ChatHandle, ChatSnapshot, SubmitError};
    use crate::state_machine::transition::{FAILURE_PREFIX, NO_CONTENT_MESSAGE};
    use crate::state_machine::{ChatContext, TransitionError};
    use crate::timeline::{EntryContent, TimelineEntry};
    use reqwest::StatusCode;
    use std::time::Duration;
    use tokio::sync::watch;

    const WAIT: Duration = Duration::from_secs(5);

    fn test_context(stagger: Duration) -> ChatContext {
        ChatContext::new("thread-under-test")
            .with_city(Some("Sydney".to_string()))
            .with_realtime(false)
            .with_stagger(stagger)
    }

    fn welcome() -> Vec<TimelineEntry> {
        vec![TimelineEntry::agent(EntryId::from("welcome"), "Welcome!")]
    }

    async fn wait_for(
        rx: &mut watch::Receiver<ChatSnapshot>,
        predicate: impl FnMut(&ChatSnapshot) -> bool,
    ) -> ChatSnapshot {
        tokio::time::timeout(WAIT, rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("runtime stopped")
            .clone()
    }

    fn contents(snapshot: &ChatSnapshot) -> Vec<EntryContent> {
        snapshot.entries.iter().map(|e| e.content.clone()).collect()
    }

    fn start_gated(stagger: Duration) -> (Arc<GatedBackend>, ChatHandle) {
        let backend = Arc::new(GatedBackend::new());
        let handle = runtime::spawn(test_context(stagger), Arc::clone(&backend), welcome());
        (backend, handle)
    }

    #[tokio::test]
    async fn test_mock_backend_queue() {
        let mock = MockBackend::new();
        mock.queue_reply("Hello");
        let request = test_context(Duration::ZERO).chat_request("hi");

        let reply = mock.chat(&request).await.unwrap();
        assert_eq!(reply.reply, "Hello");

        // Second call should fail (no more responses)
        assert!(mock.chat(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_end_to_end_reply() {
        let (backend, handle) = start_gated(Duration::from_millis(5));
        backend.queue_reply("Hi\n\nHow can I help?");

        handle.submit("hello").await.unwrap();
        let pending = handle.snapshot();
        assert!(pending.busy);
        assert_eq!(
            contents(&pending),
            vec![
                EntryContent::agent("Welcome!"),
                EntryContent::operator("hello"),
                EntryContent::Pending,
            ]
        );
        let placeholder_id = pending.entries[2].id.clone();

        backend.release();
        let mut rx = handle.subscribe();
        let done = wait_for(&mut rx, |s| !s.busy && s.entries.len() == 4).await;

        assert_eq!(
            contents(&done),
            vec![
                EntryContent::agent("Welcome!"),
                EntryContent::operator("hello"),
                EntryContent::agent("Hi"),
                EntryContent::agent("How can I help?"),
            ]
        );
        let carrying_placeholder_id: Vec<_> = done
            .entries
            .iter()
            .filter(|e| e.id == placeholder_id)
            .collect();
        assert_eq!(carrying_placeholder_id.len(), 1);
        assert_eq!(carrying_placeholder_id[0].content, EntryContent::agent("Hi"));
        assert_eq!(done.entries[1].id, pending.entries[1].id);
    }

    #[tokio::test]
    async fn test_request_carries_thread_and_settings() {
        let (backend, handle) = start_gated(Duration::ZERO);
        backend.queue_reply("ok");
        handle.submit("  what's the weather?  ").await.unwrap();
        backend.release();

        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| !s.busy).await;

        let requests = backend.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].thread_id, "thread-under-test");
        assert_eq!(requests[0].message, "what's the weather?");
        assert_eq!(requests[0].city.as_deref(), Some("Sydney"));
        assert!(!requests[0].realtime);
    }

    #[tokio::test]
    async fn test_end_to_end_failure() {
        let (backend, handle) = start_gated(Duration::ZERO);
        backend.queue_error(BackendError::status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail":"overloaded"}"#,
        ));

        handle.submit("x").await.unwrap();
        let operator_entry = handle.snapshot().entries[1].clone();
        backend.release();

        let mut rx = handle.subscribe();
        let done = wait_for(&mut rx, |s| !s.busy).await;

        assert_eq!(done.entries.len(), 3);
        assert_eq!(done.entries[1], operator_entry);
        assert_eq!(operator_entry.content, EntryContent::operator("x"));
        let body = done.entries[2].content.body().unwrap();
        assert!(body.starts_with(FAILURE_PREFIX));
        assert!(body.contains("500"));
        assert!(body.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_busy() {
        let (backend, handle) = start_gated(Duration::ZERO);
        backend.queue_reply("first answer");
        handle.submit("first").await.unwrap();

        let err = handle.submit("second").await.unwrap_err();
        assert_eq!(err, SubmitError::Rejected(TransitionError::Busy));

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.entries.len(), 3);
        assert!(snapshot
            .entries
            .iter()
            .all(|e| e.content != EntryContent::operator("second")));

        backend.release();
        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| !s.busy).await;
        assert_eq!(backend.recorded_requests().len(), 1);

        // Accepted again once idle
        backend.queue_reply("second answer");
        handle.submit("second").await.unwrap();
        backend.release();
        let done = wait_for(&mut rx, |s| !s.busy && s.entries.len() == 5).await;
        assert_eq!(done.entries[4].content, EntryContent::agent("second answer"));
    }

    #[tokio::test]
    async fn test_blank_submission_rejected() {
        let (backend, handle) = start_gated(Duration::ZERO);
        let err = handle.submit("   ").await.unwrap_err();
        assert_eq!(err, SubmitError::Rejected(TransitionError::EmptyMessage));
        assert_eq!(handle.snapshot().entries.len(), 1);
        assert!(backend.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_resolves_to_fallback() {
        let (backend, handle) = start_gated(Duration::ZERO);
        backend.queue_reply("   ");
        handle.submit("anything?").await.unwrap();
        backend.release();

        let mut rx = handle.subscribe();
        let done = wait_for(&mut rx, |s| !s.busy).await;
        assert_eq!(done.entries.len(), 3);
        assert_eq!(done.entries[2].content, EntryContent::agent(NO_CONTENT_MESSAGE));
    }

    #[tokio::test]
    async fn test_follow_ups_arrive_staggered_and_in_order() {
        let (backend, handle) = start_gated(Duration::from_millis(200));
        backend.queue_reply("one\n\ntwo\n\n\nthree");
        handle.submit("count").await.unwrap();
        backend.release();

        let mut rx = handle.subscribe();
        let resolved = wait_for(&mut rx, |s| !s.busy).await;
        assert_eq!(resolved.entries.len(), 3);
        assert_eq!(resolved.entries[2].content, EntryContent::agent("one"));

        let second = wait_for(&mut rx, |s| s.entries.len() >= 4).await;
        assert_eq!(second.entries.len(), 4);
        assert_eq!(second.entries[3].content, EntryContent::agent("two"));

        let third = wait_for(&mut rx, |s| s.entries.len() >= 5).await;
        assert_eq!(third.entries[4].content, EntryContent::agent("three"));
    }

    #[tokio::test]
    async fn test_new_submission_flushes_undelivered_follow_ups() {
        let (backend, handle) = start_gated(Duration::from_secs(60));
        backend.queue_reply("A\n\nB\n\nC");
        handle.submit("first").await.unwrap();
        backend.release();

        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| !s.busy).await;
        assert_eq!(handle.snapshot().entries.len(), 3);

        backend.queue_reply("done");
        handle.submit("next").await.unwrap();
        assert_eq!(
            contents(&handle.snapshot()),
            vec![
                EntryContent::agent("Welcome!"),
                EntryContent::operator("first"),
                EntryContent::agent("A"),
                EntryContent::agent("B"),
                EntryContent::agent("C"),
                EntryContent::operator("next"),
                EntryContent::Pending,
            ]
        );
        backend.release();
        wait_for(&mut rx, |s| !s.busy).await;
    }

    #[tokio::test]
    async fn test_reset_discards_undelivered_follow_ups() {
        let stagger = Duration::from_millis(50);
        let (backend, handle) = start_gated(stagger);
        backend.queue_reply("A\n\nB\n\nC");
        handle.submit("first").await.unwrap();
        backend.release();

        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| !s.busy).await;
        handle.reset(vec![]).await.unwrap();
        assert!(handle.snapshot().entries.is_empty());

        tokio::time::sleep(stagger * 6).await;
        assert!(handle.snapshot().entries.is_empty());
    }

    #[tokio::test]
    async fn test_reset_while_awaiting_reply() {
        let (backend, handle) = start_gated(Duration::ZERO);
        backend.queue_reply("late answer");
        handle.submit("question").await.unwrap();

        handle.reset(vec![]).await.unwrap();
        let after_reset = handle.snapshot();
        assert!(after_reset.entries.is_empty());
        assert!(after_reset.busy);
        assert_eq!(after_reset.thread_id, "thread-under-test");

        backend.release();
        let mut rx = handle.subscribe();
        let done = wait_for(&mut rx, |s| !s.busy).await;

        // The reply had nowhere to go
        assert!(done.entries.is_empty());
        assert_eq!(done.thread_id, "thread-under-test");
    }

    #[tokio::test]
    async fn test_reset_reseeds_timeline() {
        let (backend, handle) = start_gated(Duration::ZERO);
        backend.queue_reply("answer");
        handle.submit("question").await.unwrap();
        backend.release();

        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| !s.busy).await;

        handle.reset(welcome()).await.unwrap();
        assert_eq!(contents(&handle.snapshot()), vec![EntryContent::agent("Welcome!")]);
    }

    #[tokio::test]
    async fn test_panicking_backend_resolves_placeholder() {
        let handle = runtime::spawn(test_context(Duration::ZERO), PanickingBackend, welcome());
        handle.submit("boom").await.unwrap();

        let mut rx = handle.subscribe();
        let done = wait_for(&mut rx, |s| !s.busy).await;
        assert_eq!(done.entries.len(), 3);
        assert_eq!(done.entries[1].content, EntryContent::operator("boom"));
        assert!(done.entries[2]
            .content
            .body()
            .unwrap()
            .starts_with(FAILURE_PREFIX));
    }

    #[tokio::test]
    async fn test_runtime_stops_when_handles_dropped() {
        let (_backend, handle) = start_gated(Duration::ZERO);
        let mut rx = handle.subscribe();
        drop(handle);
        // The watch sender is dropped together with the runtime
        tokio::time::timeout(WAIT, async {
            while rx.changed().await.is_ok() {}
        })
        .await
        .expect("runtime did not stop");
    }
}
