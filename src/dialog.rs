/// Dialog controller — the state machine that owns the session, sequences
/// turns, and derives every piece of UI state from backend replies.
///
/// The controller itself is synchronous and single-entrant: `submit` and
/// `select_option` produce an `Outbound` message, the caller performs the
/// network call on its own task (the TUI spawns it and feeds the outcome back
/// through its event channel), and `resolve` applies the outcome. The
/// `Idle`/`Awaiting` guard is the mutual exclusion mechanism — a second
/// submit while a request is in flight is dropped, not queued.
use crate::protocol::BackendReply;
use crate::prompt::OptionPrompt;
use crate::session::{PROGRESS_FULL, Session};
use crate::transcript::{Transcript, Turn, TurnHandle, TurnKind};

pub const PENDING_TEXT: &str = "Einen Moment bitte …";
pub const NETWORK_ERROR_TEXT: &str = "Verbindung zum Server fehlgeschlagen.";
pub const UNRECOGNIZED_TEXT: &str = "Keine verwertbare Antwort vom Server erhalten.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// No request in flight, input enabled.
    Idle,
    /// One request in flight; input and send-action disabled.
    Awaiting,
}

/// A message the caller must deliver to the backend. Tagged with the session
/// id so a reply that arrives after a reset can be told apart and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub message: String,
    pub session_id: String,
}

pub struct DialogController {
    pub session: Session,
    pub transcript: Transcript,
    state: DialogState,
    /// Handle to the transient pending placeholder, if one is on the log.
    pending: Option<TurnHandle>,
    /// The one prompt that may still be answered. Replaced (never stacked)
    /// when a new bot turn with options arrives.
    prompt: Option<OptionPrompt>,
    greeting: String,
    start_message: String,
}

impl DialogController {
    pub fn new(greeting: String, start_message: String) -> Self {
        Self {
            session: Session::new(),
            transcript: Transcript::new(),
            state: DialogState::Idle,
            pending: None,
            prompt: None,
            greeting,
            start_message,
        }
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == DialogState::Awaiting
    }

    /// The currently answerable option prompt, if any.
    pub fn active_prompt(&self) -> Option<&OptionPrompt> {
        self.prompt.as_ref().filter(|p| p.is_active())
    }

    /// Explicit "begin" action. Clears the transcript, starts a fresh session
    /// (new id, progress 0), shows the greeting, and issues the configured
    /// start-trigger exchange so the backend serves its first real question.
    /// Also acts as reset: a reply still in flight for the old session is
    /// dropped by `resolve` because its session id no longer matches.
    pub fn start(&mut self) -> Outbound {
        self.session = Session::new();
        self.transcript.clear();
        self.prompt = None;
        self.pending = None;

        self.transcript
            .append(Turn::bot(TurnKind::Info, self.greeting.clone()));
        self.begin_request(self.start_message.clone())
    }

    /// Send free text. No-op when the text is empty/whitespace or a request
    /// is already in flight.
    pub fn submit(&mut self, text: &str) -> Option<Outbound> {
        let text = text.trim();
        if text.is_empty() || self.state != DialogState::Idle {
            return None;
        }
        // Typing free text retires any still-active prompt
        if let Some(p) = &mut self.prompt {
            p.dismiss();
        }
        self.transcript.append(Turn::user(text));
        Some(self.begin_request(text.to_string()))
    }

    /// Answer the active prompt by choice index. Consumes the choice (the
    /// prompt becomes inert) and behaves like `submit` of the chosen string.
    pub fn select_option(&mut self, index: usize) -> Option<Outbound> {
        if self.state != DialogState::Idle {
            return None;
        }
        let chosen = self.prompt.as_mut()?.select(index)?;
        self.transcript.append(Turn::user(chosen.clone()));
        Some(self.begin_request(chosen))
    }

    fn begin_request(&mut self, message: String) -> Outbound {
        self.state = DialogState::Awaiting;
        self.pending = Some(
            self.transcript
                .append(Turn::bot(TurnKind::Pending, PENDING_TEXT)),
        );
        Outbound {
            message,
            session_id: self.session.id.clone(),
        }
    }

    /// Apply the outcome of the in-flight request. Retires the pending
    /// placeholder and returns to `Idle` regardless of outcome — the user can
    /// always keep typing. A reply tagged with a stale session id (the dialog
    /// was reset while it was in flight) is dropped entirely.
    pub fn resolve(&mut self, session_id: &str, outcome: Result<BackendReply, String>) {
        if session_id != self.session.id || self.state != DialogState::Awaiting {
            return;
        }
        if let Some(handle) = self.pending.take() {
            self.transcript.retire(handle);
        }

        match outcome {
            Ok(BackendReply::Message {
                text,
                options,
                progress,
            }) => {
                let kind = if options.is_empty() {
                    TurnKind::Info
                } else {
                    TurnKind::Question
                };
                self.transcript
                    .append(Turn::bot(kind, text).with_options(options.clone()));
                self.prompt = if options.is_empty() {
                    None
                } else {
                    Some(OptionPrompt::new(options))
                };
                if let Some(p) = progress {
                    if self.session.set_progress(p) {
                        self.session.unlock_apply();
                    }
                }
            }
            Ok(BackendReply::Decision {
                decision,
                rationale,
            }) => {
                let text = match rationale {
                    Some(r) if !r.is_empty() => format!("**{decision}**\n\n{r}"),
                    _ => format!("**{decision}**"),
                };
                self.transcript.append(Turn::bot(TurnKind::Decision, text));
                self.prompt = None;
                self.session.set_progress(PROGRESS_FULL as i64);
                self.session.unlock_apply();
            }
            Ok(BackendReply::Unrecognized) => {
                self.transcript
                    .append(Turn::bot(TurnKind::Info, UNRECOGNIZED_TEXT));
            }
            Err(detail) => {
                self.transcript.append(Turn::bot(
                    TurnKind::Error,
                    format!("{NETWORK_ERROR_TEXT}\n{detail}"),
                ));
            }
        }

        // Unconditional cleanup — no outcome leaves input disabled
        self.state = DialogState::Idle;
    }
}
