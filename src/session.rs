/// Session state for one advisory dialog.
///
/// A session is created when the TUI starts (or when the user resets the
/// dialog) and lives until the next reset. It owns the three values the rest
/// of the app derives UI state from: the opaque session id sent with every
/// backend request, the completion percentage, and the apply-gate.
use uuid::Uuid;

/// Upper bound of the completion scale.
pub const PROGRESS_FULL: u8 = 100;

#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque token generated client-side, stable for the session's lifetime,
    /// never reused across sessions.
    pub id: String,
    /// 0–100, monotonic non-decreasing.
    progress: u8,
    /// Unlocks the external application action. Never relocks.
    apply_unlocked: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            progress: 0,
            apply_unlocked: false,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Update progress. Clamps to [0,100] and rejects (no-op) any value below
    /// the stored one. Returns `true` exactly once per session: the first
    /// time the value reaches 100, so callers can trigger the apply-gate.
    pub fn set_progress(&mut self, value: i64) -> bool {
        let clamped = value.clamp(0, PROGRESS_FULL as i64) as u8;
        if clamped <= self.progress {
            return false;
        }
        let was_full = self.progress >= PROGRESS_FULL;
        self.progress = clamped;
        !was_full && self.progress >= PROGRESS_FULL
    }

    pub fn apply_unlocked(&self) -> bool {
        self.apply_unlocked
    }

    /// Open the apply-gate. Monotonic — there is no way to relock.
    pub fn unlock_apply(&mut self) {
        self.apply_unlocked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut s = Session::new();
        s.set_progress(40);
        s.set_progress(20);
        assert_eq!(s.progress(), 40);
        s.set_progress(55);
        assert_eq!(s.progress(), 55);
    }

    #[test]
    fn test_progress_clamps_out_of_range() {
        let mut s = Session::new();
        s.set_progress(-5);
        assert_eq!(s.progress(), 0);
        s.set_progress(250);
        assert_eq!(s.progress(), 100);
    }

    #[test]
    fn test_reach_full_fires_once() {
        let mut s = Session::new();
        assert!(!s.set_progress(60));
        assert!(s.set_progress(100));
        // Already full — must not fire again, even via the clamp path
        assert!(!s.set_progress(100));
        assert!(!s.set_progress(180));
    }

    #[test]
    fn test_apply_gate_never_relocks() {
        let mut s = Session::new();
        s.unlock_apply();
        s.set_progress(10);
        assert!(s.apply_unlocked());
    }

    #[test]
    fn test_fresh_sessions_get_distinct_ids() {
        let a = Session::new();
        let b = Session::new();
        assert_ne!(a.id, b.id);
        assert_eq!(a.progress(), 0);
        assert!(!a.apply_unlocked());
    }
}
