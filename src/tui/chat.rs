/// Transcript pane rendering — build_items, draw_history, markup subset,
/// word wrap, spinner.
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, List, ListItem},
};
use unicode_width::UnicodeWidthStr;

use super::AppState;
use crate::transcript::{Speaker, Turn, TurnKind};

// ── Spinner ────────────────────────────────────────────────────────────────────

pub const SPINNER_GLYPHS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── Markup subset ─────────────────────────────────────────────────────────────

/// Split one line of display text into spans, honoring the `**bold**` subset
/// the backend is allowed to send. Unterminated markers render literally.
pub fn markup_spans(line: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = line;
    loop {
        let Some(open) = rest.find("**") else {
            if !rest.is_empty() {
                spans.push(Span::styled(rest.to_string(), base));
            }
            break;
        };
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            if !rest.is_empty() {
                spans.push(Span::styled(rest.to_string(), base));
            }
            break;
        };
        if open > 0 {
            spans.push(Span::styled(rest[..open].to_string(), base));
        }
        spans.push(Span::styled(
            after[..close].to_string(),
            base.add_modifier(Modifier::BOLD),
        ));
        rest = &after[close + 2..];
    }
    if spans.is_empty() {
        spans.push(Span::styled(String::new(), base));
    }
    spans
}

/// Strip bold markers for contexts that wrap on display width.
fn strip_markup(text: &str) -> String {
    text.replace("**", "")
}

// ── History items builder ──────────────────────────────────────────────────────

pub fn build_items(state: &AppState, term_width: u16) -> Vec<ListItem<'static>> {
    let turns = state.dialog.transcript.turns();
    // The only turn whose options may still be answered is the last one that
    // carries options, and only while the controller's prompt is active.
    let active_options_turn = if state.dialog.active_prompt().is_some() {
        turns.iter().rposition(|t| !t.options.is_empty())
    } else {
        None
    };

    let mut items: Vec<ListItem<'static>> = Vec::new();
    for (i, turn) in turns.iter().enumerate() {
        match turn.speaker {
            Speaker::User => push_user_turn(&mut items, state, turn, term_width),
            Speaker::Bot => {
                push_bot_turn(&mut items, state, turn, term_width);
                if !turn.options.is_empty() {
                    push_option_rows(&mut items, state, turn, Some(i) == active_options_turn);
                }
                items.push(ListItem::new(Line::raw("")));
            }
        }
    }
    items
}

fn timestamp_span(state: &AppState, turn: &Turn) -> Option<Span<'static>> {
    if !state.show_timestamps {
        return None;
    }
    Some(Span::styled(
        format!("{} ", turn.timestamp.format("%H:%M")),
        Style::default().fg(Color::Rgb(60, 60, 80)),
    ))
}

fn push_user_turn(
    items: &mut Vec<ListItem<'static>>,
    state: &AppState,
    turn: &Turn,
    term_width: u16,
) {
    // Bubble colours
    let bg = Color::Rgb(28, 26, 52);
    let border = Color::Rgb(110, 90, 200);
    let label_fg = Color::Rgb(160, 140, 255);
    let text_fg = Color::Rgb(235, 232, 255);
    let body_style = Style::default().fg(text_fg).bg(bg);
    let edge_style = Style::default().fg(border).bg(bg);

    // 2 chars left margin, 1 right margin
    let inner_w = (term_width as usize).saturating_sub(3).max(10);
    // Top: "╭─ sie ──…──╮" — label " sie " is 5 chars, corners+space = 4
    let dash_total = inner_w.saturating_sub(4 + 5);
    let top_dashes = "─".repeat(dash_total);
    let mut header = vec![Span::raw("  ")];
    if let Some(ts) = timestamp_span(state, turn) {
        header.push(ts);
    }
    header.push(Span::styled("╭─ ".to_string(), edge_style));
    header.push(Span::styled(
        "sie",
        Style::default()
            .fg(label_fg)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    ));
    header.push(Span::styled(format!(" {top_dashes}╮"), edge_style));
    items.push(ListItem::new(Line::from(header)));

    let wrap_width = inner_w.saturating_sub(2).max(10);
    for src_line in turn.text.lines() {
        for line in wrap_text(src_line, wrap_width) {
            items.push(ListItem::new(Line::from(vec![
                Span::raw("  "),
                Span::styled("│ ", edge_style),
                Span::styled(line, body_style),
            ])));
        }
    }

    let bot_dashes = "─".repeat(inner_w.saturating_sub(2));
    items.push(ListItem::new(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("╰{bot_dashes}╯"), edge_style),
    ])));
    items.push(ListItem::new(Line::raw("")));
}

fn push_bot_turn(
    items: &mut Vec<ListItem<'static>>,
    state: &AppState,
    turn: &Turn,
    term_width: u16,
) {
    let (glyph, label_fg, text_style) = match turn.kind {
        TurnKind::Pending => {
            let g = SPINNER_GLYPHS[(state.spinner_tick as usize) % SPINNER_GLYPHS.len()];
            let style = Style::default()
                .fg(Color::Rgb(100, 100, 130))
                .add_modifier(Modifier::ITALIC);
            items.push(ListItem::new(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{g} "), Style::default().fg(Color::Cyan)),
                Span::styled(turn.text.clone(), style),
            ])));
            return;
        }
        TurnKind::Error => (
            "✗",
            Color::Rgb(220, 60, 60),
            Style::default().fg(Color::Rgb(230, 150, 150)),
        ),
        TurnKind::Decision => (
            "✓",
            Color::Rgb(0, 200, 100),
            Style::default().fg(Color::Rgb(180, 240, 200)),
        ),
        _ => (
            "◆",
            Color::Rgb(0, 210, 210),
            Style::default().fg(Color::Rgb(210, 230, 255)),
        ),
    };

    // "        " indent = 8 cols after the label
    let wrap_width = (term_width as usize).saturating_sub(8).max(20);
    let mut first = true;
    for src_line in turn.text.lines() {
        // Wrap on the stripped text, then re-apply bold per wrapped line.
        // A bold run that spans a wrap point loses emphasis on the
        // continuation — acceptable for the constrained subset.
        for wrapped in wrap_text(&strip_markup(src_line), wrap_width) {
            let styled = fragment_spans(src_line, &wrapped, text_style);
            if first {
                first = false;
                let mut spans = vec![Span::raw("  ")];
                if let Some(ts) = timestamp_span(state, turn) {
                    spans.push(ts);
                }
                spans.push(Span::styled(
                    format!("{glyph} bot"),
                    Style::default().fg(label_fg).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw("  "));
                spans.extend(styled);
                items.push(ListItem::new(Line::from(spans)));
            } else {
                let mut spans = vec![Span::raw("        ")];
                spans.extend(styled);
                items.push(ListItem::new(Line::from(spans)));
            }
        }
    }
}

/// Style a wrapped fragment of a source line. When the whole source line is a
/// single bold run the fragment inherits bold; a line without markers passes
/// through; anything else gets the inline markup treatment on the fragment.
fn fragment_spans(src: &str, fragment: &str, base: Style) -> Vec<Span<'static>> {
    if !src.contains("**") {
        return vec![Span::styled(fragment.to_string(), base)];
    }
    let trimmed = src.trim();
    if trimmed.starts_with("**") && trimmed.ends_with("**") && trimmed.len() >= 4 {
        return vec![Span::styled(
            fragment.to_string(),
            base.add_modifier(Modifier::BOLD),
        )];
    }
    markup_spans(fragment, base)
}

fn push_option_rows(
    items: &mut Vec<ListItem<'static>>,
    state: &AppState,
    turn: &Turn,
    active: bool,
) {
    for (i, option) in turn.options.iter().enumerate() {
        let selected = active && i == state.option_cursor;
        let (num_fg, text_fg, bg) = if selected {
            (Color::Black, Color::Black, Color::Cyan)
        } else if active {
            (Color::Cyan, Color::Rgb(200, 220, 240), Color::Reset)
        } else {
            // Answered or superseded prompt — inert, visually retired
            (Color::Rgb(50, 50, 70), Color::Rgb(70, 70, 90), Color::Reset)
        };
        items.push(ListItem::new(Line::from(vec![
            Span::raw("      "),
            Span::styled(
                format!("[{}] ", i + 1),
                Style::default()
                    .fg(num_fg)
                    .bg(bg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(option.clone(), Style::default().fg(text_fg).bg(bg)),
        ])));
    }
    if active {
        items.push(ListItem::new(Line::from(vec![Span::styled(
            "      ↑↓ wählen · Enter bestätigen · oder Ziffer drücken",
            Style::default().fg(Color::Rgb(70, 70, 90)),
        )])));
    }
}

// ── Draw ───────────────────────────────────────────────────────────────────────

pub fn draw_history(f: &mut Frame, state: &AppState, area: Rect) {
    let all_items = build_items(state, area.width);
    let total = all_items.len();
    let visible = area.height as usize;

    let skip = if total > visible {
        (total - visible).saturating_sub(state.scroll)
    } else {
        0
    };

    let sliced: Vec<ListItem<'static>> = all_items.into_iter().skip(skip).collect();
    let list = List::new(sliced)
        .block(Block::default().style(Style::default().bg(Color::Rgb(8, 8, 14))));
    f.render_widget(list, area);
}

// ── Utilities ──────────────────────────────────────────────────────────────────

/// Word-wrap a single line of text to `max_width` display columns.
/// Splits on whitespace; never truncates mid-word unless the word alone
/// exceeds max_width.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = word.width();
        if current_width == 0 {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(current.clone());
            current = word.to_string();
            current_width = word_width;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text(
            "Welchen akademischen Abschluss haben Sie bereits erworben",
            20,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width() <= 20, "line too wide: {line:?}");
        }
    }

    #[test]
    fn test_wrap_text_keeps_empty_line() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_markup_bold_run() {
        let spans = markup_spans("Ergebnis: **Zulassung möglich** heute", Style::default());
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].content.as_ref(), "Ergebnis: ");
        assert_eq!(spans[1].content.as_ref(), "Zulassung möglich");
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[2].content.as_ref(), " heute");
    }

    #[test]
    fn test_markup_unterminated_renders_literally() {
        let spans = markup_spans("kein **fett hier", Style::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content.as_ref(), "kein **fett hier");
    }
}
