//! Conversation session: an ordered, append-only transcript of turns with at
//! most one chat request in flight.
//!
//! Every user turn is answered by exactly one model turn. When the gateway
//! fails, the answer is a synthetic apology turn rather than an error, so the
//! transcript never ends with a dangling request.

use crate::gateway::{AiGateway, ChatRequest, GatewayError, HistoryEntry};
use crate::profile::UserProfile;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub use crate::gateway::Role;

/// Shown in place of the model's reply when a chat request fails.
pub const CHAT_APOLOGY: &str = "عذراً، حدث خطأ أثناء الاتصال بالخادم. يرجى المحاولة مرة أخرى.";

/// One message in the transcript. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// True for system-generated text (greeting, apology) rather than model output.
    pub synthetic: bool,
}

impl Turn {
    fn new(role: Role, text: impl Into<String>, synthetic: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
            synthetic,
        }
    }

    /// Project to the `{role, text}` pair sent as history.
    #[must_use]
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            text: self.text.clone(),
        }
    }
}

/// Welcome text seeded by [`ConversationSession::with_greeting`].
#[must_use]
pub fn greeting_for(profile: &UserProfile) -> String {
    format!(
        "مرحباً بك يا {}! 🤖. أنا هنا لمساعدتك في فهم بيئة {} بشكل أفضل.",
        profile.name, profile.city
    )
}

/// Result of [`ConversationSession::request_reply`].
#[derive(Debug)]
pub enum ReplyOutcome {
    /// The model answered; the turn was appended.
    Replied(Turn),
    /// The gateway failed; an apology turn was appended instead.
    Apologized { turn: Turn, error: GatewayError },
    /// Another request is in flight; nothing changed.
    Busy,
    /// The transcript has no unanswered user turn; nothing changed.
    NothingPending,
}

impl ReplyOutcome {
    /// The appended turn, if any.
    #[must_use]
    pub fn turn(&self) -> Option<&Turn> {
        match self {
            Self::Replied(turn) | Self::Apologized { turn, .. } => Some(turn),
            Self::Busy | Self::NothingPending => None,
        }
    }
}

/// Clears the busy flag on every exit path, including cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Transcript plus the single pending-request slot for one chat context.
pub struct ConversationSession<G: AiGateway + ?Sized> {
    gateway: Arc<G>,
    profile: Option<UserProfile>,
    turns: Mutex<Vec<Turn>>,
    busy: AtomicBool,
}

impl<G: AiGateway + ?Sized> ConversationSession<G> {
    /// An empty session.
    pub fn new(gateway: Arc<G>, profile: Option<UserProfile>) -> Self {
        Self {
            gateway,
            profile,
            turns: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// A session seeded with a synthetic model greeting for `profile`.
    pub fn with_greeting(gateway: Arc<G>, profile: UserProfile) -> Self {
        let greeting = Turn::new(Role::Model, greeting_for(&profile), true);
        let session = Self::new(gateway, Some(profile));
        session.lock_turns().push(greeting);
        session
    }

    fn lock_turns(&self) -> MutexGuard<'_, Vec<Turn>> {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the transcript in arrival order.
    #[must_use]
    pub fn transcript(&self) -> Vec<Turn> {
        self.lock_turns().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_turns().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_turns().is_empty()
    }

    /// Whether a reply request is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Append a user turn.
    ///
    /// Returns `None` without changing the transcript when `text` is blank,
    /// a request is in flight, or the previous user turn is still unanswered.
    pub fn append_user_message(&self, text: &str) -> Option<Turn> {
        if text.trim().is_empty() {
            debug!("ignoring blank user message");
            return None;
        }
        if self.is_busy() {
            debug!("ignoring user message while a reply is in flight");
            return None;
        }
        let mut turns = self.lock_turns();
        if turns.last().is_some_and(|t| t.role == Role::User) {
            debug!("ignoring user message while the previous one is unanswered");
            return None;
        }
        let turn = Turn::new(Role::User, text, false);
        turns.push(turn.clone());
        Some(turn)
    }

    /// Answer the trailing user turn.
    ///
    /// History sent to the gateway is every turn before the trailing user
    /// turn. Failures are absorbed into an apology turn.
    pub async fn request_reply(&self) -> ReplyOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("reply already in flight");
            return ReplyOutcome::Busy;
        }
        let _in_flight = InFlight(&self.busy);

        let request = {
            let turns = self.lock_turns();
            let Some((last, earlier)) = turns.split_last() else {
                return ReplyOutcome::NothingPending;
            };
            if last.role != Role::User {
                return ReplyOutcome::NothingPending;
            }
            ChatRequest {
                history: earlier.iter().map(Turn::to_history_entry).collect(),
                message: last.text.clone(),
                profile: self.profile.clone(),
            }
        };

        let result = match self.gateway.chat_turn(request).await {
            Ok(text) if text.trim().is_empty() => Err(GatewayError::EmptyResponse(
                "model returned blank text".to_owned(),
            )),
            other => other,
        };

        let outcome = match result {
            Ok(text) => {
                let turn = Turn::new(Role::Model, text, false);
                info!("chat reply received ({} chars)", turn.text.chars().count());
                ReplyOutcome::Replied(turn)
            }
            Err(error) => {
                warn!("chat request failed, appending apology: {error}");
                ReplyOutcome::Apologized {
                    turn: Turn::new(Role::Model, CHAT_APOLOGY, true),
                    error,
                }
            }
        };
        if let Some(turn) = outcome.turn() {
            self.lock_turns().push(turn.clone());
        }
        outcome
    }

    /// Append `text` and request its reply.
    ///
    /// Returns `None` when the message was rejected by the append guard.
    pub async fn send(&self, text: &str) -> Option<ReplyOutcome> {
        self.append_user_message(text)?;
        Some(self.request_reply().await)
    }
}
