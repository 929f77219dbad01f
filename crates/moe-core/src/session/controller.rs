//! Conversation orchestration.
//!
//! The controller owns the message log for the lifetime of one session; no
//! other component mutates it. All state transitions happen through the
//! operations here, so the log invariants are enforced at a single choke
//! point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::log::MessageLog;
use super::message::{Message, VoteDirection};
use crate::backend::{AskRequest, QaBackend};
use crate::context::SessionContext;
use crate::error::MoeError;

/// Result of a [`ConversationController::submit_query`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The query was issued and has settled (successfully or not).
    Submitted,
    /// Input was empty after trimming; nothing was appended or sent.
    EmptyInput,
    /// Another query is still in flight; nothing was appended or sent.
    Busy,
}

/// Result of a [`ConversationController::submit_vote`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was applied locally and acknowledged by the backend.
    Recorded,
    /// The vote was applied locally but the backend call failed. The local
    /// state is kept and may now disagree with the server.
    LocalOnly,
    /// No message carries the given answer id; no backend call was made.
    UnknownAnswer,
}

/// Orchestrates a turn-based conversation against a [`QaBackend`].
///
/// Enforces single-flight request discipline: at most one ask request is
/// outstanding per controller instance at any time. The state machine is
/// `Idle -> Pending -> Idle` with no cancelled state; a fired cancellation
/// token settles the pending call without appending a bot entry.
pub struct ConversationController<B: QaBackend> {
    backend: Arc<B>,
    context: SessionContext,
    log: Arc<RwLock<MessageLog>>,
    in_flight: Arc<AtomicBool>,
}

impl<B: QaBackend> ConversationController<B> {
    /// Creates a controller with an empty conversation.
    pub fn new(backend: Arc<B>, context: SessionContext) -> Self {
        Self {
            backend,
            context,
            log: Arc::new(RwLock::new(MessageLog::new())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The session context this controller was built with.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Whether a query is currently outstanding.
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshot of the conversation in append order.
    pub async fn messages(&self) -> Vec<Message> {
        self.log.read().await.entries().to_vec()
    }

    /// Submits a user query and appends the outcome to the conversation.
    ///
    /// Appends the user entry optimistically, issues the ask request, and
    /// appends exactly one bot entry per settled call: the answer on
    /// success, an upgrade prompt on quota exhaustion, or an error bubble
    /// for any other failure. A cancelled call appends nothing. The
    /// single-flight guard is released on every path.
    pub async fn submit_query(&self, text: &str) -> SubmitOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::EmptyInput;
        }

        let Some(_guard) = FlightGuard::try_acquire(&self.in_flight) else {
            debug!("query rejected: another request is in flight");
            return SubmitOutcome::Busy;
        };

        {
            let mut log = self.log.write().await;
            log.append_with(|id| Message::user(id, trimmed));
        }

        let request = AskRequest::from_context(&self.context, trimmed);
        let result = self.backend.ask(request, self.context.cancel_token()).await;

        let model_label = self.context.capabilities().model_label;
        let mut log = self.log.write().await;
        match result {
            Ok(answer) => {
                log.append_with(|id| Message::from_answer(id, answer));
            }
            Err(MoeError::Cancelled) => {
                debug!("ask cancelled before completion; no reply appended");
            }
            Err(MoeError::QuotaExceeded { message }) => {
                debug!(reason = %message, "daily quota reached");
                log.append_with(|id| Message::upgrade_prompt(id, trimmed, model_label));
            }
            Err(err) => {
                warn!(error = %err, "ask request failed");
                log.append_with(|id| Message::failure(id, err.user_message(), model_label));
            }
        }

        SubmitOutcome::Submitted
    }

    /// Records a helpfulness vote for the answer with `answer_id`.
    ///
    /// The local vote is applied before the backend call and is kept
    /// regardless of its outcome; a failed call is logged and reported as
    /// [`VoteOutcome::LocalOnly`], never rolled back and never rendered in
    /// the conversation. A second vote on the same answer overwrites the
    /// first.
    pub async fn submit_vote(&self, answer_id: &str, direction: VoteDirection) -> VoteOutcome {
        let updated = self.log.write().await.set_vote(answer_id, direction);
        if !updated {
            debug!(answer_id, "vote ignored: unknown answer id");
            return VoteOutcome::UnknownAnswer;
        }

        match self
            .backend
            .vote(answer_id, direction, self.context.cancel_token())
            .await
        {
            Ok(()) => VoteOutcome::Recorded,
            Err(err) => {
                warn!(answer_id, error = %err, "vote submission failed; keeping local vote");
                VoteOutcome::LocalOnly
            }
        }
    }
}

/// RAII handle for the single-flight flag.
struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AskAnswer;
    use crate::error::Result;
    use crate::plan::PlanTier;
    use crate::session::Sender;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use tokio_util::sync::CancellationToken;

    fn answer(id: &str) -> AskAnswer {
        AskAnswer {
            answer: "Open the nesting editor and enable part grouping.".to_string(),
            model_used: "gpt-4o-mini".to_string(),
            tokens: Some(42),
            answer_id: id.to_string(),
            is_cache_hit: false,
            sources: Vec::new(),
        }
    }

    /// Mock backend that replays queued ask results.
    struct MockQaBackend {
        ask_results: Mutex<VecDeque<Result<AskAnswer>>>,
        ask_calls: AtomicUsize,
        vote_calls: Mutex<Vec<(String, VoteDirection)>>,
        vote_results: Mutex<VecDeque<Result<()>>>,
    }

    impl MockQaBackend {
        fn new() -> Self {
            Self {
                ask_results: Mutex::new(VecDeque::new()),
                ask_calls: AtomicUsize::new(0),
                vote_calls: Mutex::new(Vec::new()),
                vote_results: Mutex::new(VecDeque::new()),
            }
        }

        fn queue_ask(&self, result: Result<AskAnswer>) {
            self.ask_results.lock().unwrap().push_back(result);
        }

        fn queue_vote(&self, result: Result<()>) {
            self.vote_results.lock().unwrap().push_back(result);
        }

        fn ask_count(&self) -> usize {
            self.ask_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QaBackend for MockQaBackend {
        async fn ask(
            &self,
            _request: AskRequest,
            _cancel: CancellationToken,
        ) -> Result<AskAnswer> {
            self.ask_calls.fetch_add(1, Ordering::SeqCst);
            self.ask_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected ask call")
        }

        async fn vote(
            &self,
            answer_id: &str,
            direction: VoteDirection,
            _cancel: CancellationToken,
        ) -> Result<()> {
            self.vote_calls
                .lock()
                .unwrap()
                .push((answer_id.to_string(), direction));
            self.vote_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    /// Mock backend that parks in `ask` until released, for concurrency tests.
    struct BlockingQaBackend {
        entered: Notify,
        release: Notify,
    }

    impl BlockingQaBackend {
        fn new() -> Self {
            Self {
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl QaBackend for BlockingQaBackend {
        async fn ask(&self, _request: AskRequest, cancel: CancellationToken) -> Result<AskAnswer> {
            self.entered.notify_one();
            tokio::select! {
                _ = cancel.cancelled() => Err(MoeError::Cancelled),
                _ = self.release.notified() => Ok(answer("blocked")),
            }
        }

        async fn vote(
            &self,
            _answer_id: &str,
            _direction: VoteDirection,
            _cancel: CancellationToken,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn controller(backend: Arc<MockQaBackend>) -> ConversationController<MockQaBackend> {
        ConversationController::new(backend, SessionContext::new(PlanTier::Free))
    }

    #[tokio::test]
    async fn empty_input_appends_nothing() {
        let backend = Arc::new(MockQaBackend::new());
        let controller = controller(backend.clone());

        assert_eq!(controller.submit_query("   ").await, SubmitOutcome::EmptyInput);
        assert_eq!(controller.submit_query("").await, SubmitOutcome::EmptyInput);

        assert!(controller.messages().await.is_empty());
        assert_eq!(backend.ask_count(), 0);
    }

    #[tokio::test]
    async fn successful_query_appends_user_and_bot_entries() {
        let backend = Arc::new(MockQaBackend::new());
        backend.queue_ask(Ok(answer("a1")));
        let controller = controller(backend.clone());

        let outcome = controller.submit_query("How do I nest parts?").await;
        assert_eq!(outcome, SubmitOutcome::Submitted);

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "How do I nest parts?");
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(messages[1].answer_id.as_deref(), Some("a1"));
        assert_eq!(messages[1].model_used.as_deref(), Some("gpt-4o-mini"));
        assert!(!messages[1].is_cache_hit);
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn quota_failure_appends_upgrade_prompt() {
        let backend = Arc::new(MockQaBackend::new());
        backend.queue_ask(Err(MoeError::quota_exceeded("limit reached")));
        let controller = controller(backend.clone());

        // The sixth query of the day on a free plan
        let outcome = controller.submit_query("How do I nest parts?").await;
        assert_eq!(outcome, SubmitOutcome::Submitted);

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        let prompt = &messages[1];
        assert!(prompt.upgrade_required);
        assert!(!prompt.error);
        assert!(prompt.text.contains("How do I nest parts?"));
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn generic_failure_appends_error_bubble() {
        let backend = Arc::new(MockQaBackend::new());
        backend.queue_ask(Err(MoeError::request("upstream unavailable")));
        let controller = controller(backend.clone());

        controller.submit_query("hello").await;

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        let bubble = &messages[1];
        assert!(bubble.error);
        assert!(!bubble.upgrade_required);
        assert_eq!(bubble.text, "upstream unavailable");
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn session_stays_usable_after_failures() {
        let backend = Arc::new(MockQaBackend::new());
        backend.queue_ask(Err(MoeError::request("boom")));
        backend.queue_ask(Ok(answer("a2")));
        let controller = controller(backend.clone());

        controller.submit_query("first").await;
        controller.submit_query("second").await;

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 4);
        let ids: Vec<u64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(messages[3].answer_id.as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_busy() {
        let backend = Arc::new(BlockingQaBackend::new());
        let controller = Arc::new(ConversationController::new(
            backend.clone(),
            SessionContext::new(PlanTier::Free),
        ));

        let first = controller.clone();
        let handle = tokio::spawn(async move { first.submit_query("first").await });

        backend.entered.notified().await;
        assert!(controller.is_pending());
        assert_eq!(controller.submit_query("second").await, SubmitOutcome::Busy);

        // Only the first user entry exists; the rejected call appended nothing
        assert_eq!(controller.messages().await.len(), 1);

        backend.release.notify_one();
        assert_eq!(handle.await.unwrap(), SubmitOutcome::Submitted);
        assert!(!controller.is_pending());
        assert_eq!(controller.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_query_appends_no_reply_and_releases_guard() {
        let backend = Arc::new(BlockingQaBackend::new());
        let context = SessionContext::new(PlanTier::Free);
        let controller = Arc::new(ConversationController::new(backend.clone(), context.clone()));

        let submitting = controller.clone();
        let handle = tokio::spawn(async move { submitting.submit_query("teardown race").await });

        backend.entered.notified().await;
        context.shutdown();

        assert_eq!(handle.await.unwrap(), SubmitOutcome::Submitted);
        let messages = controller.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::User);
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn vote_is_optimistic_and_last_write_wins() {
        let backend = Arc::new(MockQaBackend::new());
        backend.queue_ask(Ok(answer("a1")));
        let controller = controller(backend.clone());
        controller.submit_query("question").await;

        assert_eq!(
            controller.submit_vote("a1", VoteDirection::Up).await,
            VoteOutcome::Recorded
        );
        assert_eq!(
            controller.submit_vote("a1", VoteDirection::Down).await,
            VoteOutcome::Recorded
        );

        let messages = controller.messages().await;
        assert_eq!(messages[1].user_vote, Some(VoteDirection::Down));
        assert_eq!(backend.vote_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_vote_keeps_local_state() {
        let backend = Arc::new(MockQaBackend::new());
        backend.queue_ask(Ok(answer("a1")));
        backend.queue_vote(Err(MoeError::request("vote endpoint down")));
        let controller = controller(backend.clone());
        controller.submit_query("question").await;

        assert_eq!(
            controller.submit_vote("a1", VoteDirection::Up).await,
            VoteOutcome::LocalOnly
        );

        // The optimistic vote is retained even though the backend call failed
        let messages = controller.messages().await;
        assert_eq!(messages[1].user_vote, Some(VoteDirection::Up));
    }

    #[tokio::test]
    async fn vote_on_unknown_answer_skips_backend() {
        let backend = Arc::new(MockQaBackend::new());
        let controller = controller(backend.clone());

        assert_eq!(
            controller.submit_vote("missing", VoteDirection::Up).await,
            VoteOutcome::UnknownAnswer
        );
        assert!(backend.vote_calls.lock().unwrap().is_empty());
    }
}
