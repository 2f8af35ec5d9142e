/// Ratatui-based TUI for studicheck.
///
/// Architecture:
///   main thread:   event loop — crossterm keyboard events + mpsc UiEvent drain
///   request task:  tokio::spawn per outbound message — performs the HTTP call
///                  and sends the classified outcome back via UnboundedSender
///
/// Layout:
///   ┌────────────────────────────────────────────────┐
///   │  transcript (scrollable, Min(0))               │
///   ├────────────────────────────────────────────────┤
///   │  status bar: progress + apply-gate (1 line)    │
///   ├────────────────────────────────────────────────┤
///   │  input box (3 lines, fixed)                    │
///   └────────────────────────────────────────────────┘
pub mod chat;
pub mod render;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use crate::config::ResolvedConfig;
use crate::dialog::{DialogController, Outbound};
use crate::protocol::{BackendClient, BackendReply};
use crate::transcript::{Turn, TurnKind};

// ── UiEvent — typed events from request tasks → TUI ──────────────────────────

#[derive(Debug)]
pub enum UiEvent {
    /// Outcome of an in-flight backend request. Tagged with the session id it
    /// was sent for so the controller can drop replies to a reset session.
    Reply {
        session_id: String,
        outcome: Result<BackendReply, String>,
    },
}

// ── AppState ──────────────────────────────────────────────────────────────────

pub struct AppState {
    pub dialog: DialogController,
    pub input: String,
    pub cursor: usize, // byte offset in input
    pub scroll: usize, // lines scrolled up in transcript
    /// Highlighted row in the active option prompt
    pub option_cursor: usize,
    /// Incremented every 120ms while a request is in flight
    pub spinner_tick: u32,
    pub help_visible: bool,
    pub show_timestamps: bool,
    pub profile: String,
    pub backend_url: String,
    pub apply_url: Option<String>,
    /// Transcript revision last drawn — used to auto-scroll on new turns
    last_revision: u64,
}

impl AppState {
    pub fn new(resolved: &ResolvedConfig, show_timestamps: bool) -> Self {
        Self {
            dialog: DialogController::new(
                resolved.greeting.clone(),
                resolved.start_message.clone(),
            ),
            input: String::new(),
            cursor: 0,
            scroll: 0,
            option_cursor: 0,
            spinner_tick: 0,
            help_visible: false,
            show_timestamps,
            profile: resolved.profile_name.clone(),
            backend_url: resolved.backend_url.clone(),
            apply_url: resolved.apply_url.clone(),
            last_revision: 0,
        }
    }

    fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::Reply {
                session_id,
                outcome,
            } => {
                self.dialog.resolve(&session_id, outcome);
                self.option_cursor = 0;
            }
        }
    }

    /// Auto-scroll to the latest turn whenever the transcript changed.
    fn sync_scroll(&mut self) {
        let rev = self.dialog.transcript.revision();
        if rev != self.last_revision {
            self.last_revision = rev;
            self.scroll = 0;
        }
    }

    /// Surface the external application URL as an info turn. Only reachable
    /// once the apply-gate is unlocked.
    fn show_apply_info(&mut self) {
        let text = match &self.apply_url {
            Some(url) => format!("**Jetzt bewerben:** {url}"),
            None => "Die Bewerbung ist freigeschaltet — für diesen Backend-Betreiber \
                     ist keine Bewerbungs-URL konfiguriert (apply_url)."
                .to_string(),
        };
        self.dialog.transcript.append(Turn::bot(TurnKind::Info, text));
    }
}

// ── Terminal setup / teardown ─────────────────────────────────────────────────

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

// ── Main TUI run loop ─────────────────────────────────────────────────────────

pub async fn run(resolved: ResolvedConfig, show_timestamps: bool) -> Result<()> {
    let mut terminal = setup_terminal()?;

    // Panic hook — restore terminal before printing panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        orig_hook(info);
    }));

    let result = event_loop(&mut terminal, resolved, show_timestamps).await;

    restore_terminal(&mut terminal);
    result
}

/// Spawn the HTTP call for one outbound message; the outcome comes back
/// through the UI channel. Exactly one of these is alive at a time — the
/// controller's Awaiting guard drops any further submits until it resolves.
fn dispatch(client: &Arc<BackendClient>, out: Outbound, tx: mpsc::UnboundedSender<UiEvent>) {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        let outcome = client
            .send(&out.message, &out.session_id)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(UiEvent::Reply {
            session_id: out.session_id,
            outcome,
        });
    });
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    resolved: ResolvedConfig,
    show_timestamps: bool,
) -> Result<()> {
    let client = Arc::new(BackendClient::new(
        resolved.backend_url.clone(),
        Duration::from_secs(resolved.timeout_secs),
    )?);

    let mut state = AppState::new(&resolved, show_timestamps);

    // Channel: request tasks → TUI
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();

    // Begin the dialog immediately: greeting + the configured start trigger,
    // so the backend serves its first real question.
    let out = state.dialog.start();
    dispatch(&client, out, ui_tx.clone());

    let mut crossterm_events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(120));

    state.sync_scroll();
    terminal.draw(|f| render::draw(f, &state))?;

    loop {
        tokio::select! {
            // ── Spinner tick ──────────────────────────────────────────────────
            _ = ticker.tick() => {
                if state.dialog.is_awaiting() {
                    state.spinner_tick = state.spinner_tick.wrapping_add(1);
                    terminal.draw(|f| render::draw(f, &state))?;
                }
            }

            // ── Drain reply events ────────────────────────────────────────────
            Some(ev) = ui_rx.recv() => {
                state.apply_event(ev);
                state.sync_scroll();
                terminal.draw(|f| render::draw(f, &state))?;
            }

            // ── Keyboard/resize events ────────────────────────────────────────
            Some(Ok(ev)) = crossterm_events.next() => {
                if let Event::Key(key) = ev {
                    let keep = handle_key(key, &mut state, &client, &ui_tx);
                    if !keep { break; }
                }
                state.sync_scroll();
                terminal.draw(|f| render::draw(f, &state))?;
            }
        }
    }

    Ok(())
}

// ── Key handler ───────────────────────────────────────────────────────────────

/// Returns false when the app should quit.
fn handle_key(
    key: KeyEvent,
    state: &mut AppState,
    client: &Arc<BackendClient>,
    ui_tx: &mpsc::UnboundedSender<UiEvent>,
) -> bool {
    // Quit always works, in-flight request or not
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        return false;
    }

    // Help overlay swallows everything except dismiss keys
    if state.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
            state.help_visible = false;
        }
        return true;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            // Explicit reset: fresh session, cleared transcript. Works while
            // awaiting too — the stale reply is dropped by its session id.
            KeyCode::Char('r') => {
                let out = state.dialog.start();
                state.input.clear();
                state.cursor = 0;
                state.option_cursor = 0;
                dispatch(client, out, ui_tx.clone());
            }
            KeyCode::Char('a') => {
                if state.dialog.session.apply_unlocked() {
                    state.show_apply_info();
                }
                // Locked gate: the key is simply inert
            }
            _ => {}
        }
        return true;
    }

    let prompt_active = state.dialog.active_prompt().is_some();

    match key.code {
        KeyCode::F(1) => state.help_visible = true,
        KeyCode::Esc => state.help_visible = false,

        KeyCode::Enter => {
            if prompt_active && state.input.trim().is_empty() {
                if let Some(out) = state.dialog.select_option(state.option_cursor) {
                    state.option_cursor = 0;
                    dispatch(client, out, ui_tx.clone());
                }
            } else if let Some(out) = state.dialog.submit(&state.input) {
                state.input.clear();
                state.cursor = 0;
                dispatch(client, out, ui_tx.clone());
            }
            // Empty input without a prompt, or a request in flight: no-op
        }

        // Digit shortcut answers the active prompt directly
        KeyCode::Char(c @ '1'..='9') if prompt_active && state.input.is_empty() => {
            let index = (c as usize) - ('1' as usize);
            if let Some(out) = state.dialog.select_option(index) {
                state.option_cursor = 0;
                dispatch(client, out, ui_tx.clone());
            }
        }

        KeyCode::Up => {
            if prompt_active {
                state.option_cursor = state.option_cursor.saturating_sub(1);
            } else {
                state.scroll = state.scroll.saturating_add(1);
            }
        }
        KeyCode::Down => {
            if prompt_active {
                let max = state
                    .dialog
                    .active_prompt()
                    .map(|p| p.choices().len().saturating_sub(1))
                    .unwrap_or(0);
                state.option_cursor = (state.option_cursor + 1).min(max);
            } else {
                state.scroll = state.scroll.saturating_sub(1);
            }
        }
        KeyCode::PageUp => state.scroll = state.scroll.saturating_add(10),
        KeyCode::PageDown => state.scroll = state.scroll.saturating_sub(10),

        // ── Input editing ─────────────────────────────────────────────────────
        KeyCode::Char(c) => {
            state.input.insert(state.cursor, c);
            state.cursor += c.len_utf8();
        }
        KeyCode::Backspace => {
            if state.cursor > 0 {
                let prev = prev_boundary(&state.input, state.cursor);
                state.input.replace_range(prev..state.cursor, "");
                state.cursor = prev;
            }
        }
        KeyCode::Delete => {
            if state.cursor < state.input.len() {
                let next = next_boundary(&state.input, state.cursor);
                state.input.replace_range(state.cursor..next, "");
            }
        }
        KeyCode::Left => state.cursor = prev_boundary(&state.input, state.cursor),
        KeyCode::Right => state.cursor = next_boundary(&state.input, state.cursor),
        KeyCode::Home => state.cursor = 0,
        KeyCode::End => state.cursor = state.input.len(),
        _ => {}
    }

    true
}

fn prev_boundary(s: &str, i: usize) -> usize {
    s[..i].char_indices().last().map(|(j, _)| j).unwrap_or(0)
}

fn next_boundary(s: &str, i: usize) -> usize {
    s[i..].chars().next().map(|c| i + c.len_utf8()).unwrap_or(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_boundaries_handle_multibyte() {
        let s = "Führung";
        let after_f = next_boundary(s, 0);
        assert_eq!(after_f, 1);
        let after_umlaut = next_boundary(s, after_f);
        assert_eq!(after_umlaut, 1 + 'ü'.len_utf8());
        assert_eq!(prev_boundary(s, after_umlaut), 1);
        assert_eq!(prev_boundary(s, 0), 0);
        assert_eq!(next_boundary(s, s.len()), s.len());
    }
}
