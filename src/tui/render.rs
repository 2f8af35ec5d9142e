/// Ratatui draw entry-point for studicheck.
/// Thin dispatcher — transcript rendering lives in chat.rs.
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::AppState;
use super::chat::SPINNER_GLYPHS;

// ── Main draw entry point ─────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, state: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // transcript
            Constraint::Length(1), // status bar
            Constraint::Length(3), // input box
        ])
        .split(area);

    super::chat::draw_history(f, state, chunks[0]);
    draw_status_bar(f, state, chunks[1]);
    draw_input(f, state, chunks[2]);

    if state.help_visible {
        draw_help_overlay(f, area);
    }
}

// ── Status bar ────────────────────────────────────────────────────────────────

fn draw_status_bar(f: &mut Frame, state: &AppState, area: Rect) {
    let pct = state.dialog.session.progress() as usize;

    // Completion bar — mini progress bar using block chars
    let bar_width = 10usize;
    let filled = (pct.min(100) * bar_width / 100).min(bar_width);
    let bar: String = format!("[{}{}]", "█".repeat(filled), "░".repeat(bar_width - filled));
    let bar_color = match pct {
        0..=33 => Color::Rgb(100, 140, 220),
        34..=66 => Color::Cyan,
        67..=99 => Color::Rgb(0, 220, 180),
        _ => Color::Rgb(0, 240, 120),
    };

    let (status_glyph, status_color) = if state.dialog.is_awaiting() {
        let g = SPINNER_GLYPHS[(state.spinner_tick as usize) % SPINNER_GLYPHS.len()];
        (g, Color::Cyan)
    } else {
        ("▲", Color::White)
    };

    let apply_span = if state.dialog.session.apply_unlocked() {
        Span::styled(
            "  ➜ Ctrl+A Bewerbung",
            Style::default()
                .fg(Color::Rgb(0, 240, 120))
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "  Bewerbung gesperrt",
            Style::default().fg(Color::Rgb(55, 50, 90)),
        )
    };

    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(
            status_glyph,
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " studicheck",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            state.profile.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ·  ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            state.backend_url.clone(),
            Style::default().fg(Color::Rgb(100, 180, 220)),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(bar, Style::default().fg(bar_color)),
        Span::styled(
            format!(" {pct}%"),
            Style::default().fg(bar_color).add_modifier(Modifier::BOLD),
        ),
        apply_span,
        Span::styled(
            "  F1 Hilfe  Ctrl+R Neustart",
            Style::default().fg(Color::Rgb(55, 50, 90)),
        ),
    ]);

    let bar_style = if state.dialog.is_awaiting() {
        Style::default().bg(Color::Rgb(15, 15, 25))
    } else {
        Style::default().bg(Color::Rgb(10, 10, 18))
    };

    f.render_widget(Paragraph::new(line).style(bar_style), area);
}

// ── Input box ─────────────────────────────────────────────────────────────────

fn draw_input(f: &mut Frame, state: &AppState, area: Rect) {
    let awaiting = state.dialog.is_awaiting();
    let (border_color, prompt_color, prompt_char) = if awaiting {
        (Color::Rgb(40, 40, 60), Color::DarkGray, "·")
    } else {
        (Color::Rgb(60, 60, 80), Color::Cyan, "❯")
    };

    let prompt_span = Span::styled(
        format!("  {prompt_char} "),
        Style::default().fg(prompt_color).add_modifier(Modifier::BOLD),
    );

    let content_span = if awaiting {
        Span::styled(
            "Anfrage läuft — Eingabe gesperrt",
            Style::default().fg(Color::Rgb(60, 60, 80)),
        )
    } else if state.input.is_empty() {
        if state.dialog.active_prompt().is_some() {
            Span::styled(
                "Option wählen oder Antwort eingeben · Enter senden",
                Style::default().fg(Color::Rgb(70, 70, 90)),
            )
        } else {
            Span::styled(
                "Antwort eingeben · Enter senden · F1 Hilfe",
                Style::default().fg(Color::Rgb(70, 70, 90)),
            )
        }
    } else {
        Span::styled(state.input.clone(), Style::default().fg(Color::White))
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(Color::Rgb(8, 8, 14)));

    let paragraph = Paragraph::new(Line::from(vec![prompt_span, content_span]))
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);

    // Position cursor at the actual edit cursor, not end of string
    if !awaiting {
        use unicode_width::UnicodeWidthStr;
        // prompt is "  ❯ " — ❯ is 1 wide, total visible width is 4 cols
        let prompt_width: u16 = 4;
        let text_before_cursor = &state.input[..state.cursor.min(state.input.len())];
        let cursor_x = area.x + prompt_width + text_before_cursor.width() as u16;
        let cursor_y = area.y + 1; // +1 for top border
        if cursor_x < area.x + area.width {
            f.set_cursor_position((cursor_x, cursor_y));
        }
    }
}

// ── Help overlay ──────────────────────────────────────────────────────────────

const HELP_LINES: &[(&str, &str)] = &[
    ("Enter", "Antwort senden / markierte Option bestätigen"),
    ("1–9", "Option direkt wählen"),
    ("↑ ↓", "Option markieren (sonst: Verlauf blättern)"),
    ("PgUp PgDn", "Verlauf blättern"),
    ("Ctrl+R", "Dialog neu starten (neue Sitzung)"),
    ("Ctrl+A", "Bewerbungslink anzeigen (nach Abschluss)"),
    ("F1 / Esc", "Diese Hilfe ein-/ausblenden"),
    ("Ctrl+C", "Beenden"),
];

fn draw_help_overlay(f: &mut Frame, area: Rect) {
    let width = 64.min(area.width.saturating_sub(4));
    let height = (HELP_LINES.len() as u16 + 6).min(area.height.saturating_sub(2));
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    f.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled(
            "Der Studiencheck stellt Ihnen nacheinander Fragen zu Ihrem",
            Style::default().fg(Color::Rgb(180, 180, 200)),
        )),
        Line::from(Span::styled(
            "Werdegang und prüft, ob eine Zulassung möglich ist.",
            Style::default().fg(Color::Rgb(180, 180, 200)),
        )),
        Line::raw(""),
    ];
    for (key, desc) in HELP_LINES {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {key:<10}"),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(*desc, Style::default().fg(Color::Rgb(200, 200, 220))),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Hilfe ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(Color::Rgb(12, 12, 20)));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}
