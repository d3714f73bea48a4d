use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use structure_agent_core::audit::{AuditContext, AuditSink, TracingAuditSink};
use structure_agent_core::config::ServerConfig;
use structure_agent_core::domain::requirements::StructureRequirements;
use structure_agent_core::errors::{ApplicationError, DomainError};
use structure_agent_core::flows::{
    DialogueEngine, DialogueError, DialoguePhase, DialogueState, TurnNotice,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::confirmation::KeywordConfirmationClassifier;
use crate::conversation::PatternSpecExtractor;

pub type StructureDialogue = DialogueEngine<KeywordConfirmationClassifier, PatternSpecExtractor>;

pub fn structure_dialogue() -> StructureDialogue {
    DialogueEngine::new(KeywordConfirmationClassifier::new(), PatternSpecExtractor::new())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnReply {
    pub session_id: String,
    pub utterance: String,
    pub done: bool,
    pub phase: DialoguePhase,
}

/// Bounds on the in-memory session store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { max_sessions: 10_000, idle_ttl: Duration::from_secs(1_800) }
    }
}

impl SessionLimits {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            max_sessions: server.max_sessions,
            idle_ttl: Duration::from_secs(server.session_idle_secs),
        }
    }
}

/// A finished dialogue keeps only a tombstone so late turns are still rejected.
#[derive(Clone, Debug)]
enum SessionSlot {
    Active(DialogueState),
    Completed,
}

impl SessionSlot {
    fn from_state(state: DialogueState) -> Self {
        if state.terminated() {
            Self::Completed
        } else {
            Self::Active(state)
        }
    }

    fn state(&self) -> DialogueState {
        match self {
            Self::Active(state) => state.clone(),
            Self::Completed => DialogueState {
                phase: DialoguePhase::Terminated,
                requirements: StructureRequirements::default(),
            },
        }
    }
}

struct SessionEntry {
    slot: SessionSlot,
    last_touched: Instant,
}

struct SessionStore {
    entries: HashMap<String, SessionEntry>,
    limits: SessionLimits,
}

impl SessionStore {
    fn new(limits: SessionLimits) -> Self {
        Self { entries: HashMap::new(), limits }
    }

    fn state(&self, session_id: &str) -> Option<DialogueState> {
        self.entries.get(session_id).map(|entry| entry.slot.state())
    }

    /// Stores the state and returns how many other sessions were dropped to
    /// make room for a new id.
    fn save(&mut self, session_id: &str, state: DialogueState) -> usize {
        let now = Instant::now();
        let evicted =
            if self.entries.contains_key(session_id) { 0 } else { self.make_room(now) };
        self.entries.insert(
            session_id.to_string(),
            SessionEntry { slot: SessionSlot::from_state(state), last_touched: now },
        );
        evicted
    }

    fn make_room(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let idle_ttl = self.limits.idle_ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_touched) < idle_ttl);

        while !self.entries.is_empty() && self.entries.len() >= self.limits.max_sessions {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(session_id, _)| session_id.clone());
            match oldest {
                Some(session_id) => {
                    self.entries.remove(&session_id);
                }
                None => break,
            }
        }

        before - self.entries.len()
    }
}

/// Owns every session's dialogue state and applies one turn at a time.
///
/// The store lock is held across load, step and save so two turns never
/// interleave on the same session. Idle sessions expire and the store is
/// capped; the least recently touched session goes first.
pub struct ConversationTurnHandler<S = TracingAuditSink> {
    engine: StructureDialogue,
    sessions: Mutex<SessionStore>,
    audit_sink: S,
}

impl Default for ConversationTurnHandler<TracingAuditSink> {
    fn default() -> Self {
        Self::new(TracingAuditSink)
    }
}

impl<S> ConversationTurnHandler<S>
where
    S: AuditSink,
{
    pub fn new(audit_sink: S) -> Self {
        Self::with_limits(audit_sink, SessionLimits::default())
    }

    pub fn with_limits(audit_sink: S, limits: SessionLimits) -> Self {
        Self {
            engine: structure_dialogue(),
            sessions: Mutex::new(SessionStore::new(limits)),
            audit_sink,
        }
    }

    pub fn audit_sink(&self) -> &S {
        &self.audit_sink
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().entries.len()
    }

    pub fn start_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let evicted = self.lock_sessions().save(&session_id, self.engine.initial_state());
        log_evictions(evicted);
        info!(
            event_name = "dialogue.session.started",
            correlation_id = "session",
            session_id = %session_id,
            "dialogue session started"
        );
        session_id
    }

    pub fn session_state(&self, session_id: &str) -> Option<DialogueState> {
        self.lock_sessions().state(session_id)
    }

    /// Applies one message; unknown session ids start a fresh dialogue.
    pub fn take_turn(
        &self,
        session_id: &str,
        message: &str,
        correlation_id: &str,
    ) -> Result<TurnReply, ApplicationError> {
        if session_id.trim().is_empty() {
            return Err(ApplicationError::InvalidRequest("session id must not be empty".to_string()));
        }

        let mut sessions = self.lock_sessions();
        let state = sessions.state(session_id).unwrap_or_else(|| self.engine.initial_state());
        let audit = AuditContext::new(
            Some(session_id.to_string()),
            None,
            correlation_id,
            "dialogue-engine",
        );

        let outcome = self
            .engine
            .step_with_audit(&state, message, &self.audit_sink, &audit)
            .map_err(DomainError::from)?;
        let utterance =
            outcome.utterance.text().map_err(DialogueError::from).map_err(DomainError::from)?;

        for notice in &outcome.notices {
            match notice {
                TurnNotice::AmbiguousClassification => warn!(
                    event_name = "dialogue.classification.ambiguous",
                    correlation_id,
                    session_id,
                    "message matched confirmation and denial; treated as denial"
                ),
                TurnNotice::MalformedSpecInput(field) => info!(
                    event_name = "dialogue.extraction.malformed",
                    correlation_id,
                    session_id,
                    field = field.key(),
                    "message specified an unusable value; field left unset"
                ),
            }
        }

        let evicted = sessions.save(session_id, outcome.state.clone());
        drop(sessions);
        log_evictions(evicted);

        info!(
            event_name = "dialogue.turn.applied",
            correlation_id,
            session_id,
            from = outcome.from.as_str(),
            to = outcome.state.phase.as_str(),
            utterance = outcome.utterance.kind(),
            "dialogue turn applied"
        );

        Ok(TurnReply {
            session_id: session_id.to_string(),
            utterance,
            done: outcome.done(),
            phase: outcome.state.phase,
        })
    }

    fn lock_sessions(&self) -> MutexGuard<'_, SessionStore> {
        match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn log_evictions(evicted: usize) {
    if evicted > 0 {
        debug!(
            event_name = "dialogue.session.evicted",
            correlation_id = "session-store",
            evicted,
            "idle or surplus dialogue sessions dropped"
        );
    }
}
