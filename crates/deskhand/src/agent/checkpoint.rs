//! Per-thread conversation state and where it is kept.
//!
//! [`ReactAgent`](super::runtime::ReactAgent) saves a [`ThreadState`] after
//! every step, so a suspended round survives between the interrupt and the
//! resume, and later turns see the whole conversation. [`MemorySaver`] keeps
//! state for the life of the process; [`FileSaver`] writes one JSON file per
//! thread so a conversation can be picked up again after a restart.

use super::interrupt::ThreadId;
use crate::arcade::AuthorizationResponse;
use crate::{Message, ToolCall};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed checkpoint: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Where a tool call of a suspended round stands.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallStatus {
    /// Not yet checked for authorization or approval.
    Queued,
    /// Approved by the operator; runs without further checks.
    Approved,
    /// Finished (or refused); `result` is what the model will see.
    Done { result: String },
    /// Waiting for the user to complete an authorization flow.
    AwaitingAuthorization { authorization: AuthorizationResponse },
    /// Waiting for the operator to approve the call.
    AwaitingApproval,
}

impl CallStatus {
    /// Whether the call is blocked on an interrupt.
    pub fn is_awaiting(&self) -> bool {
        matches!(
            self,
            CallStatus::AwaitingAuthorization { .. } | CallStatus::AwaitingApproval
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PendingCall {
    pub call: ToolCall,
    pub status: CallStatus,
}

/// The tool calls of the last assistant message while the round is suspended.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PendingRound {
    pub calls: Vec<PendingCall>,
}

impl PendingRound {
    /// Indices of the calls still waiting, in call order.
    pub fn awaiting(&self) -> Vec<usize> {
        self.calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.status.is_awaiting())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Everything the runtime remembers about a thread.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ThreadState {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub pending: Option<PendingRound>,
    /// RFC 3339 time of the last save.
    #[serde(default)]
    pub updated_at: String,
}

impl ThreadState {
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Storage for thread state.
pub trait Checkpointer: Send + Sync {
    fn get(&self, thread_id: &ThreadId) -> Result<Option<ThreadState>, CheckpointError>;
    fn put(&self, thread_id: &ThreadId, state: &ThreadState) -> Result<(), CheckpointError>;
}

// ── MemorySaver ────────────────────────────────────────────────────

/// Process-scoped in-memory checkpointer.
#[derive(Debug, Default)]
pub struct MemorySaver {
    threads: Mutex<HashMap<ThreadId, ThreadState>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpointer for MemorySaver {
    fn get(&self, thread_id: &ThreadId) -> Result<Option<ThreadState>, CheckpointError> {
        let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        Ok(threads.get(thread_id).cloned())
    }

    fn put(&self, thread_id: &ThreadId, state: &ThreadState) -> Result<(), CheckpointError> {
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads.insert(thread_id.clone(), state.clone());
        Ok(())
    }
}

// ── FileSaver ──────────────────────────────────────────────────────

/// One `<thread>.json` file per thread under a directory.
#[derive(Debug, Clone)]
pub struct FileSaver {
    dir: PathBuf,
}

impl FileSaver {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CheckpointError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Safe characters are kept; every other byte becomes `%XX`, so distinct
    /// ids never share a file.
    fn file_stem(thread_id: &ThreadId) -> String {
        let mut stem = String::with_capacity(thread_id.as_str().len());
        for byte in thread_id.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                stem.push(char::from(byte));
            } else {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
        stem
    }

    fn path_for(&self, thread_id: &ThreadId) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem(thread_id)))
    }
}

impl Checkpointer for FileSaver {
    fn get(&self, thread_id: &ThreadId) -> Result<Option<ThreadState>, CheckpointError> {
        let path = self.path_for(thread_id);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CheckpointError::Io { path, source }),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn put(&self, thread_id: &ThreadId, state: &ThreadState) -> Result<(), CheckpointError> {
        let final_path = self.path_for(thread_id);
        let tmp_path = self
            .dir
            .join(format!(".{}.json.tmp", Self::file_stem(thread_id)));
        let json = serde_json::to_string_pretty(state)?;

        std::fs::write(&tmp_path, json).map_err(|source| CheckpointError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|source| CheckpointError::Io {
            path: final_path.clone(),
            source,
        })?;
        debug!("Saved thread {thread_id} to {}", final_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcade::AuthorizationStatus;

    fn state_with_pending() -> ThreadState {
        let call = ToolCall::new("call_1", "Zendesk_ListTickets", "{}");
        let mut state = ThreadState {
            messages: vec![
                Message::user("list open tickets"),
                Message::assistant(None, vec![call.clone()]),
            ],
            pending: Some(PendingRound {
                calls: vec![PendingCall {
                    call,
                    status: CallStatus::AwaitingAuthorization {
                        authorization: AuthorizationResponse {
                            id: Some("auth-1".into()),
                            status: AuthorizationStatus::Pending,
                            url: Some("https://auth".into()),
                            scopes: vec![],
                            provider_id: None,
                            user_id: None,
                        },
                    },
                }],
            }),
            updated_at: String::new(),
        };
        state.touch();
        state
    }

    #[test]
    fn memory_saver_keeps_threads_apart() {
        let saver = MemorySaver::new();
        let a = ThreadId::new("a");
        saver.put(&a, &state_with_pending()).unwrap();
        assert!(saver.get(&a).unwrap().is_some());
        assert!(saver.get(&ThreadId::new("b")).unwrap().is_none());
    }

    #[test]
    fn pending_round_lists_awaiting_calls() {
        let mut round = state_with_pending().pending.unwrap();
        round.calls.push(PendingCall {
            call: ToolCall::new("call_2", "Zendesk_WhoAmI", "{}"),
            status: CallStatus::Done {
                result: "me".into(),
            },
        });
        round.calls.push(PendingCall {
            call: ToolCall::new("call_4", "Zendesk_GetTicketComments", "{}"),
            status: CallStatus::Queued,
        });
        round.calls.push(PendingCall {
            call: ToolCall::new("call_3", "Zendesk_MarkTicketSolved", "{}"),
            status: CallStatus::AwaitingApproval,
        });
        assert_eq!(round.awaiting(), vec![0, 3]);
    }

    #[test]
    fn file_saver_round_trips_suspended_state() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(dir.path().join("sessions")).unwrap();
        let thread = ThreadId::new("1");
        let state = state_with_pending();

        saver.put(&thread, &state).unwrap();
        let loaded = saver.get(&thread).unwrap().unwrap();
        assert_eq!(loaded.pending, state.pending);
        assert_eq!(loaded.messages.len(), 2);
        assert!(!saver.dir().join(".1.json.tmp").exists());
    }

    #[test]
    fn file_saver_escapes_thread_ids() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(dir.path()).unwrap();
        saver
            .put(&ThreadId::new("../escape"), &ThreadState::default())
            .unwrap();
        assert!(dir.path().join("%2E%2E%2Fescape.json").exists());
    }

    #[test]
    fn similar_thread_ids_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(dir.path()).unwrap();
        for id in ["a/b", "a.b", "a_b"] {
            let state = ThreadState {
                messages: vec![Message::user(id)],
                ..ThreadState::default()
            };
            saver.put(&ThreadId::new(id), &state).unwrap();
        }
        for id in ["a/b", "a.b", "a_b"] {
            let loaded = saver.get(&ThreadId::new(id)).unwrap().unwrap();
            assert_eq!(loaded.messages[0].content.as_deref(), Some(id));
        }
        assert!(dir.path().join("a_b.json").exists());
        assert!(dir.path().join("a%2Fb.json").exists());
        assert!(dir.path().join("a%2Eb.json").exists());
    }

    #[test]
    fn file_saver_missing_thread_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileSaver::new(dir.path()).unwrap();
        assert!(saver.get(&ThreadId::default()).unwrap().is_none());
    }
}
