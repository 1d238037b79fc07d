//! Session/Store - in-memory per-conversation state
//!
//! `spec.md` 3: "session store is in-memory; no on-disk schema." Grounded
//! on the teacher's `td/src/state/manager.rs` actor-held-state idiom, but
//! kept as a plain struct behind a mutex rather than an actor: nothing
//! here needs its own task loop.

use std::collections::{HashMap, VecDeque};

use crate::domain::{ModeKind, TodoItem};

const CHAT_THREAD_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

/// `spec.md` 9 Open Question resolution: dev and task modes are mutually
/// exclusive per session. `TaskMode` is suspended rather than destroyed
/// when dev intervention takes over, and resumed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    Task,
    Dev,
}

pub struct Session {
    pub id: String,
    chat_thread: VecDeque<ChatTurn>,
    last_plan: Vec<TodoItem>,
    dev_problems_queue: VecDeque<String>,
    mode: SessionMode,
    suspended_mode: Option<SessionMode>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), chat_thread: VecDeque::new(), last_plan: Vec::new(), dev_problems_queue: VecDeque::new(), mode: SessionMode::Idle, suspended_mode: None }
    }

    pub fn push_turn(&mut self, role: impl Into<String>, text: impl Into<String>) {
        self.chat_thread.push_back(ChatTurn { role: role.into(), text: text.into() });
        while self.chat_thread.len() > CHAT_THREAD_CAPACITY {
            self.chat_thread.pop_front();
        }
    }

    pub fn recent_turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.chat_thread.iter()
    }

    pub fn set_last_plan(&mut self, plan: Vec<TodoItem>) {
        self.last_plan = plan;
    }

    pub fn last_plan(&self) -> &[TodoItem] {
        &self.last_plan
    }

    pub fn queue_dev_problem(&mut self, description: impl Into<String>) {
        self.dev_problems_queue.push_back(description.into());
    }

    pub fn next_dev_problem(&mut self) -> Option<String> {
        self.dev_problems_queue.pop_front()
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    /// Entering dev mode while a task is in flight suspends it rather than
    /// destroying its state; `resume_task_mode` restores it afterward.
    pub fn suspend_task_mode(&mut self) {
        if self.mode == SessionMode::Task {
            self.suspended_mode = Some(SessionMode::Task);
        }
        self.mode = SessionMode::Dev;
    }

    pub fn resume_task_mode(&mut self) {
        self.mode = self.suspended_mode.take().unwrap_or(SessionMode::Task);
    }

    pub fn enter_task_mode(&mut self) {
        self.mode = SessionMode::Task;
    }

    pub fn enter_idle(&mut self) {
        self.mode = SessionMode::Idle;
        self.suspended_mode = None;
    }
}

/// Aggregate counters over all live sessions, grounded on the teacher's
/// `state/manager.rs::DaemonMetrics`. Exposed for `orchestrator session
/// inspect`.
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct SessionMetrics {
    pub active_sessions: u64,
    pub idle_sessions: u64,
    pub task_sessions: u64,
    pub dev_sessions: u64,
}

/// Shared, process-wide registry of live sessions, keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, session_id: &str) -> &mut Session {
        self.sessions.entry(session_id.to_string()).or_insert_with(|| Session::new(session_id))
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    pub fn metrics(&self) -> SessionMetrics {
        let mut metrics = SessionMetrics { active_sessions: self.sessions.len() as u64, ..Default::default() };
        for session in self.sessions.values() {
            match session.mode() {
                SessionMode::Idle => metrics.idle_sessions += 1,
                SessionMode::Task => metrics.task_sessions += 1,
                SessionMode::Dev => metrics.dev_sessions += 1,
            }
        }
        metrics
    }
}

/// Resolves a `Mode` classification to whether it collides with an
/// in-flight session mode (`spec.md` 9 Open Question resolution).
pub fn mode_collides(session: &Session, incoming: ModeKind) -> bool {
    matches!((session.mode(), incoming), (SessionMode::Task, ModeKind::Dev) | (SessionMode::Dev, ModeKind::Task))
}
