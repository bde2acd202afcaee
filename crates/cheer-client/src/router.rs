//! Reaction routing
//!
//! Receives cutoff-filtered topic events and hands them to typed observers.
//! Along the way it drops repeated item keys, keeps the running counters, and
//! keeps the most recent questions so they can be marked answered.

use cheer_core::{PaceLevel, PaceVote, Question, Reaction, RoomCode, TopicEvent, TopicKind};
use cheer_transport::EventLog;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::observer::{Observers, SubscriptionHandle};

/// Questions kept for answering (oldest evicted first)
pub const QUESTION_CAPACITY: usize = 50;

/// Item keys remembered per topic for de-duplication
pub const DEDUP_WINDOW: usize = 512;

/// Bounded set of recently dispatched keys
#[derive(Debug)]
struct RecentKeys {
    order: VecDeque<String>,
    keys: HashSet<String>,
}

impl RecentKeys {
    fn new() -> Self {
        Self {
            order: VecDeque::with_capacity(DEDUP_WINDOW),
            keys: HashSet::with_capacity(DEDUP_WINDOW),
        }
    }

    /// Record `key`; false if it was already present
    fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        if self.order.len() == DEDUP_WINDOW {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        self.order.push_back(key.to_string());
        self.keys.insert(key.to_string());
        true
    }
}

/// Votes per pace level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaceCounts {
    pub slow: u64,
    pub good: u64,
    pub fast: u64,
}

impl PaceCounts {
    pub fn get(&self, level: PaceLevel) -> u64 {
        match level {
            PaceLevel::Slow => self.slow,
            PaceLevel::Good => self.good,
            PaceLevel::Fast => self.fast,
        }
    }

    pub fn total(&self) -> u64 {
        self.slow + self.good + self.fast
    }

    fn bump(&mut self, level: PaceLevel) {
        match level {
            PaceLevel::Slow => self.slow += 1,
            PaceLevel::Good => self.good += 1,
            PaceLevel::Fast => self.fast += 1,
        }
    }
}

#[derive(Debug, Default)]
struct RouterState {
    room: Option<RoomCode>,
    reaction_count: u64,
    pace: PaceCounts,
    questions: VecDeque<Question>,
    seen: HashMap<TopicKind, RecentKeys>,
}

/// Dispatches topic events to typed handlers
pub struct ReactionRouter {
    log: Arc<dyn EventLog>,
    state: Mutex<RouterState>,
    reactions: Observers<Reaction>,
    pace: Observers<PaceVote>,
    questions: Observers<Question>,
}

impl ReactionRouter {
    /// Create a router that writes answered flags to `log`
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            state: Mutex::new(RouterState::default()),
            reactions: Observers::new(),
            pace: Observers::new(),
            questions: Observers::new(),
        }
    }

    /// Called for every new reaction
    pub fn on_reaction<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Reaction) + Send + Sync + 'static,
    {
        self.reactions.subscribe(callback)
    }

    /// Called for every new pace vote
    pub fn on_pace<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&PaceVote) + Send + Sync + 'static,
    {
        self.pace.subscribe(callback)
    }

    /// Called for every new question
    pub fn on_question<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Question) + Send + Sync + 'static,
    {
        self.questions.subscribe(callback)
    }

    /// Route one event stored under `key`
    ///
    /// Returns false when the event was a repeat and no handler ran.
    pub fn dispatch(&self, key: &str, event: TopicEvent) -> bool {
        {
            let mut state = self.state.lock();

            if let TopicEvent::Question(question) = &event {
                if let Some(known) = state.questions.iter_mut().find(|q| q.id == question.id) {
                    known.answered |= question.answered;
                    debug!("Merged repeat of question {}", question.id);
                    return false;
                }
            }

            let fresh = state
                .seen
                .entry(event.kind())
                .or_insert_with(RecentKeys::new)
                .insert(key);
            if !fresh {
                debug!("Dropping repeated {} item {}", event.kind(), key);
                return false;
            }

            match &event {
                TopicEvent::Reaction(_) => state.reaction_count += 1,
                TopicEvent::Pace(vote) => state.pace.bump(vote.level),
                TopicEvent::Question(question) => {
                    if state.questions.len() == QUESTION_CAPACITY {
                        state.questions.pop_front();
                    }
                    state.questions.push_back(question.clone());
                }
            }
        }

        match &event {
            TopicEvent::Reaction(reaction) => self.reactions.emit(reaction),
            TopicEvent::Pace(vote) => self.pace.emit(vote),
            TopicEvent::Question(question) => self.questions.emit(question),
        }
        true
    }

    /// Mark a question answered, locally and in the event log
    ///
    /// Returns `Ok(false)` if it was already answered; nothing is written then.
    pub async fn mark_answered(&self, id: &str) -> Result<bool> {
        let path = {
            let mut state = self.state.lock();
            let room = state.room.clone().ok_or(ClientError::NotConnected)?;
            let question = state
                .questions
                .iter_mut()
                .find(|q| q.id == id)
                .ok_or_else(|| ClientError::UnknownQuestion(id.to_string()))?;

            if question.answered {
                return Ok(false);
            }
            question.answered = true;
            format!("{}/answered", room.question_path(id))
        };

        match self.log.write(&path, Value::Bool(true)).await {
            Ok(()) => {
                info!("Question {} answered", id);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to mark question {} answered: {}", id, e);
                if let Some(question) = self.state.lock().questions.iter_mut().find(|q| q.id == id) {
                    question.answered = false;
                }
                Err(e.into())
            }
        }
    }

    /// Reactions routed since the last reset
    pub fn reaction_count(&self) -> u64 {
        self.state.lock().reaction_count
    }

    /// Pace votes routed since the last reset
    pub fn pace_counts(&self) -> PaceCounts {
        self.state.lock().pace
    }

    /// Recent questions, oldest first
    pub fn questions(&self) -> Vec<Question> {
        self.state.lock().questions.iter().cloned().collect()
    }

    pub fn question(&self, id: &str) -> Option<Question> {
        self.state.lock().questions.iter().find(|q| q.id == id).cloned()
    }

    /// Zero the counters and forget questions and seen keys
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.reaction_count = 0;
        state.pace = PaceCounts::default();
        state.questions.clear();
        state.seen.clear();
    }

    /// Room that answered flags are written under
    pub fn bind(&self, room: Option<RoomCode>) {
        self.state.lock().room = room;
    }

    pub fn room(&self) -> Option<RoomCode> {
        self.state.lock().room.clone()
    }
}

impl std::fmt::Debug for ReactionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionRouter")
            .field("state", &*self.state.lock())
            .finish()
    }
}
