use std::collections::HashMap;
use std::time::Duration;

use time::OffsetDateTime;

/// Debounced write queue for answer autosave, keyed by question id. Each
/// edit re-arms that question's quiet period; only the latest value per
/// question is ever sent, and a value identical to the last synced one is
/// dropped instead of re-sent.
#[derive(Debug)]
pub struct AutosaveQueue {
    quiet: Duration,
    pending: HashMap<String, PendingWrite>,
    synced: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    value: String,
    due_at: OffsetDateTime,
}

impl AutosaveQueue {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: HashMap::new(), synced: HashMap::new() }
    }

    /// Answers already persisted on the backend when the attempt was
    /// resumed. They count as synced so re-selecting one is a no-op.
    pub fn seed_synced(&mut self, question_id: &str, value: &str) {
        self.synced.insert(question_id.to_string(), value.to_string());
    }

    pub fn record(&mut self, question_id: &str, value: &str, now: OffsetDateTime) {
        self.pending.insert(
            question_id.to_string(),
            PendingWrite { value: value.to_string(), due_at: now + self.quiet },
        );
    }

    /// Drain the writes whose quiet period has elapsed. Writes whose value
    /// matches the last synced value for that question are dropped here,
    /// not sent.
    pub fn due(&mut self, now: OffsetDateTime) -> Vec<(String, String)> {
        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, write)| write.due_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let mut writes = Vec::new();
        for question_id in ready {
            if let Some(write) = self.pending.remove(&question_id) {
                if self.synced.get(&question_id) == Some(&write.value) {
                    continue;
                }
                writes.push((question_id, write.value));
            }
        }
        writes
    }

    /// Drain everything pending regardless of quiet periods. Used right
    /// before submit so late edits are not lost.
    pub fn drain_all(&mut self) -> Vec<(String, String)> {
        let mut writes: Vec<(String, String)> = self
            .pending
            .drain()
            .filter(|(id, write)| self.synced.get(id) != Some(&write.value))
            .map(|(id, write)| (id, write.value))
            .collect();
        writes.sort();
        writes
    }

    pub fn mark_synced(&mut self, question_id: &str, value: &str) {
        self.synced.insert(question_id.to_string(), value.to_string());
    }

    /// Re-arm a failed write for retry, unless the user has already typed
    /// a newer value for that question.
    pub fn mark_failed(&mut self, question_id: &str, value: &str, now: OffsetDateTime) {
        if self.pending.contains_key(question_id) {
            return;
        }
        self.record(question_id, value, now);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
