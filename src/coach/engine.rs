//! Negotiation engine
//!
//! Drives one request/response cycle of the coaching protocol: append the
//! user's turn, ask the generation service for a structured proposal, then
//! append the coach's turn and restart the task timer. Every failure becomes
//! a fixed fallback turn; nothing is retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::coach::conversation::{ConversationLog, Turn};
use crate::coach::timer::CountdownTimer;
use crate::credentials::{CredentialKind, Credentials};
use crate::prompts::PromptTemplate;
use crate::providers::{GenerationError, GenerationService, ProposedTask, TaskRequest};

/// Reply when no generation key is configured
pub const MISSING_KEY_MESSAGE: &str =
    "i need an api key before i can coach you. add one with /key <your key>.";

/// Reply when the service could not be reached or returned an error
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "sorry, i couldn't reach the coach service. check your connection and send that again.";

/// Reply when the service rejected the key
pub const AUTH_FAILURE_MESSAGE: &str =
    "that api key was rejected, so i've forgotten it. add a valid one with /key <your key>.";

/// Reply when the service answered in the wrong shape
pub const SCHEMA_FAILURE_MESSAGE: &str =
    "sorry, i got a garbled answer from the coach service. send that again.";

/// Closed-form answers to a task proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickReply {
    Yes,
    No,
}

impl QuickReply {
    /// The literal text submitted for this reply
    pub fn text(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

/// Why a round ended with a fallback turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No generation key configured; nothing was sent
    MissingCredential,
    /// Network failure or non-2xx response
    Transport,
    /// The key was rejected; it has been cleared
    Authorization,
    /// The response did not match the structured output contract
    SchemaViolation,
}

impl FailureKind {
    /// Fixed assistant message shown for this failure
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => MISSING_KEY_MESSAGE,
            Self::Transport => TRANSPORT_FAILURE_MESSAGE,
            Self::Authorization => AUTH_FAILURE_MESSAGE,
            Self::SchemaViolation => SCHEMA_FAILURE_MESSAGE,
        }
    }
}

impl From<&GenerationError> for FailureKind {
    fn from(error: &GenerationError) -> Self {
        match error {
            GenerationError::Transport(_) => Self::Transport,
            GenerationError::Unauthorized(_) => Self::Authorization,
            GenerationError::Schema(_) => Self::SchemaViolation,
        }
    }
}

/// Result of a call to [`NegotiationEngine::submit`]
///
/// `turn` is the log index of the assistant turn this submit appended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// Another submit is pending; nothing happened
    Busy,
    /// The coach proposed a task and the timer was restarted
    Proposed { task: ProposedTask, turn: usize },
    /// A fallback turn was appended
    Failed { kind: FailureKind, turn: usize },
}

impl SubmitOutcome {
    /// Index of the assistant turn appended by this submit
    pub fn turn(&self) -> Option<usize> {
        match self {
            Self::Proposed { turn, .. } | Self::Failed { turn, .. } => Some(*turn),
            Self::Ignored | Self::Busy => None,
        }
    }

    /// Failure kind, when the round ended with a fallback turn
    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Everything one coaching session owns
///
/// Constructed once per shell lifetime and shared by reference; there is no
/// global state.
pub struct Session {
    credentials: Credentials,
    log: Mutex<ConversationLog>,
    timer: CountdownTimer,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            log: Mutex::new(ConversationLog::new()),
            timer: CountdownTimer::new(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    /// Copy of the conversation so far
    pub fn conversation(&self) -> ConversationLog {
        self.with_log(|log| log.clone())
    }

    /// Runs `f` against the conversation without copying it
    pub fn with_log<R>(&self, f: impl FnOnce(&ConversationLog) -> R) -> R {
        match self.log.lock() {
            Ok(log) => f(&*log),
            Err(poisoned) => f(&*poisoned.into_inner()),
        }
    }

    /// Toggles reflection visibility of the latest proposal
    ///
    /// Returns the turn index and its new visibility.
    pub fn toggle_latest_reflection(&self) -> Option<(usize, bool)> {
        let mut log = self.log.lock().ok()?;
        let index = log.last_reflection_index()?;
        log.toggle_reflection(index).map(|visible| (index, visible))
    }

    fn append(&self, turn: Turn) -> usize {
        match self.log.lock() {
            Ok(mut log) => log.push(turn),
            Err(poisoned) => poisoned.into_inner().push(turn),
        }
    }
}

/// Formats a task duration for display
///
/// Whole minutes and above are shown in minutes; shorter tasks in whole
/// seconds.
///
/// # Examples
///
/// ```
/// use moti::coach::render_duration;
///
/// assert_eq!(render_duration(2.0), "2 minutes");
/// assert_eq!(render_duration(1.5), "1.5 minutes");
/// assert_eq!(render_duration(0.5), "30 seconds");
/// ```
pub fn render_duration(minutes: f64) -> String {
    if minutes >= 1.0 {
        format!("{} minutes", minutes)
    } else {
        format!("{} seconds", (minutes * 60.0).round() as i64)
    }
}

/// Visible assistant content for a proposal
pub fn compose_content(task: &ProposedTask) -> String {
    format!("{}\n\n⏱️ {}", task.task, render_duration(task.time_minutes))
}

/// Hidden reflection text for a proposal
pub fn compose_reflection(task: &ProposedTask) -> String {
    format!(
        "**reflection**\n{}\n\n**hope**\n{}",
        task.reflection, task.hope
    )
}

/// Releases the in-flight flag when a submit finishes, however it finishes
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turns user input into coach proposals
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use moti::coach::{NegotiationEngine, Session};
/// use moti::config::ProviderConfig;
/// use moti::credentials::{CredentialKind, Credentials, MemoryStore};
/// use moti::prompts::PromptTemplate;
/// use moti::providers::create_provider;
///
/// # async fn example() -> moti::error::Result<()> {
/// let store = Arc::new(MemoryStore::with_key(CredentialKind::Generation, "sk-..."));
/// let session = Arc::new(Session::new(Credentials::load(store)));
/// let engine = NegotiationEngine::new(
///     session,
///     create_provider(&ProviderConfig::default())?,
///     PromptTemplate::default(),
/// );
/// let outcome = engine.submit("start my essay").await;
/// # Ok(())
/// # }
/// ```
pub struct NegotiationEngine {
    session: Arc<Session>,
    service: Arc<dyn GenerationService>,
    template: PromptTemplate,
    in_flight: AtomicBool,
}

impl NegotiationEngine {
    pub fn new(
        session: Arc<Session>,
        service: Arc<dyn GenerationService>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            session,
            service,
            template,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Whether a submit is currently awaiting the service
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one coaching round for `user_text`
    ///
    /// The user turn is appended before the service is contacted, so it is
    /// always visible ahead of the reply or fallback.
    pub async fn submit(&self, user_text: &str) -> SubmitOutcome {
        if user_text.trim().is_empty() {
            tracing::debug!("Ignoring blank submit");
            return SubmitOutcome::Ignored;
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Submit rejected: a request is already pending");
            return SubmitOutcome::Busy;
        };

        self.session.append(Turn::user(user_text));

        let Some(api_key) = self.session.credentials.get(CredentialKind::Generation) else {
            tracing::info!("No generation API key configured");
            return self.fail(FailureKind::MissingCredential);
        };

        let request = TaskRequest {
            api_key,
            instructions: self.template.text().to_string(),
            transcript: self.session.with_log(ConversationLog::transcript),
        };

        tracing::info!(
            "Requesting task proposal from {} ({} turns)",
            self.service.model(),
            self.session.with_log(ConversationLog::len)
        );

        match self.service.propose_task(&request).await {
            Ok(task) => self.accept(task),
            Err(error) => {
                tracing::error!("Task proposal failed: {}", error);
                let kind = FailureKind::from(&error);
                if kind == FailureKind::Authorization {
                    // Only the key this request carried; /key may have replaced it meanwhile
                    if let Err(e) = self
                        .session
                        .credentials
                        .clear_if(CredentialKind::Generation, &request.api_key)
                    {
                        tracing::warn!("Failed to remove rejected key from store: {}", e);
                    }
                }
                self.fail(kind)
            }
        }
    }

    /// Submits a closed-form `yes` / `no` answer
    pub async fn reply(&self, reply: QuickReply) -> SubmitOutcome {
        self.submit(reply.text()).await
    }

    fn accept(&self, task: ProposedTask) -> SubmitOutcome {
        if !self.template.within_policy(task.time_minutes) {
            tracing::warn!(
                "Proposed duration {} minutes is outside the coaching limits; accepting as-is",
                task.time_minutes
            );
        }

        let turn = self.session.append(Turn::assistant_with_reflection(
            compose_content(&task),
            compose_reflection(&task),
        ));
        self.session.timer.start(task.time_minutes);

        tracing::info!("Accepted task proposal: {} minutes", task.time_minutes);
        SubmitOutcome::Proposed { task, turn }
    }

    fn fail(&self, kind: FailureKind) -> SubmitOutcome {
        let turn = self.session.append(Turn::assistant(kind.fallback_message()));
        SubmitOutcome::Failed { kind, turn }
    }
}
