/// Ordered log of dialog turns.
///
/// Append-only during a session: the only permitted mutations are `append`,
/// `clear` (explicit reset), and retiring the transient pending placeholder
/// through the handle returned when it was appended. Individual turns are
/// never edited in place.
use chrono::{DateTime, Utc};

// ── Turn ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

/// What a bot turn carries. User turns are always `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Question,
    Decision,
    Info,
    Error,
    /// Transient "awaiting response" placeholder, removed once resolved.
    Pending,
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub speaker: Speaker,
    /// Display text. May contain the markup subset (`**bold**`, line breaks).
    pub text: String,
    pub kind: TurnKind,
    /// Ordered choices, present only on bot turns that expect a selection.
    pub options: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            kind: TurnKind::Info,
            options: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(kind: TurnKind, text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
            kind,
            options: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Reference to an appended turn, used to retire the pending placeholder.
/// Carries the transcript revision at append time so a stale handle (the log
/// was cleared or mutated since) retires nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnHandle {
    index: usize,
    revision: u64,
}

// ── Transcript ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    /// Bumped on every mutation. The renderer compares it against the last
    /// revision it drew to know when to scroll to the latest turn.
    revision: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn append(&mut self, turn: Turn) -> TurnHandle {
        self.turns.push(turn);
        self.revision += 1;
        TurnHandle {
            index: self.turns.len() - 1,
            revision: self.revision,
        }
    }

    /// Empty the log. Used only by an explicit reset.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.revision += 1;
    }

    /// Swap the last turn for `turn`. Silent no-op on an empty log.
    pub fn replace_last(&mut self, turn: Turn) {
        if let Some(last) = self.turns.last_mut() {
            *last = turn;
            self.revision += 1;
        }
    }

    /// Drop the last turn. Silent no-op on an empty log.
    pub fn remove_last(&mut self) {
        if self.turns.pop().is_some() {
            self.revision += 1;
        }
    }

    /// Remove the turn a handle points at, provided the transcript has not
    /// changed since the handle was issued. Stale handles are a silent no-op —
    /// this is what keeps "retire the pending placeholder" from ever eating a
    /// real turn.
    pub fn retire(&mut self, handle: TurnHandle) {
        if handle.revision == self.revision && handle.index == self.turns.len().saturating_sub(1) {
            self.remove_last();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_orders_turns() {
        let mut t = Transcript::new();
        t.append(Turn::user("hello"));
        t.append(Turn::bot(TurnKind::Question, "which degree?"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.turns()[0].speaker, Speaker::User);
        assert_eq!(t.turns()[1].kind, TurnKind::Question);
    }

    #[test]
    fn test_remove_last_on_empty_is_noop() {
        let mut t = Transcript::new();
        t.remove_last();
        t.replace_last(Turn::user("x"));
        assert!(t.is_empty());
    }

    #[test]
    fn test_retire_removes_only_the_handled_turn() {
        let mut t = Transcript::new();
        t.append(Turn::user("q"));
        let pending = t.append(Turn::bot(TurnKind::Pending, "…"));
        t.retire(pending);
        assert_eq!(t.len(), 1);
        assert_eq!(t.turns()[0].text, "q");
    }

    #[test]
    fn test_stale_handle_is_noop() {
        let mut t = Transcript::new();
        let pending = t.append(Turn::bot(TurnKind::Pending, "…"));
        // A turn arrived after the handle was issued — the handle is stale
        t.append(Turn::bot(TurnKind::Info, "answer"));
        t.retire(pending);
        assert_eq!(t.len(), 2);
        // Retiring twice is also safe
        t.retire(pending);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut t = Transcript::new();
        let h = t.append(Turn::user("a"));
        t.clear();
        t.append(Turn::user("b"));
        t.retire(h);
        assert_eq!(t.len(), 1);
        assert_eq!(t.turns()[0].text, "b");
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut t = Transcript::new();
        let r0 = t.revision();
        t.append(Turn::user("a"));
        assert!(t.revision() > r0);
        let r1 = t.revision();
        t.remove_last();
        assert!(t.revision() > r1);
    }
}
