//! Timeline rendering for the terminal UI
//!
//! Turns timeline entries into styled ratatui lines. Operator entries are
//! right-aligned, agent entries left-aligned, and each entry is headed by
//! its avatar.

use crate::state_machine::transition::FAILURE_PREFIX;
use crate::timeline::{EntryContent, Side, TimelineEntry};
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Bubbles never take the full width so the two sides stay distinguishable
const BUBBLE_WIDTH_PERCENT: usize = 80;

/// Render the whole timeline, one blank line between entries
pub fn timeline_lines(entries: &[TimelineEntry], width: u16, tick: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.extend(entry_lines(entry, width, tick));
    }
    lines
}

/// Render a single entry: header line with the avatar, then the body
pub fn entry_lines(entry: &TimelineEntry, width: u16, tick: usize) -> Vec<Line<'static>> {
    let side = entry.side();
    let alignment = match side {
        Side::Incoming => Alignment::Left,
        Side::Outgoing => Alignment::Right,
    };
    let bubble_width = (usize::from(width) * BUBBLE_WIDTH_PERCENT / 100).max(1);

    let mut lines = vec![header(entry).alignment(alignment)];

    match &entry.content {
        EntryContent::OperatorText { body } => {
            let style = Style::default().fg(Color::Cyan);
            lines.extend(body_lines(body, bubble_width, style, alignment));
        }
        EntryContent::AgentText { body } => {
            let style = if body.starts_with(FAILURE_PREFIX) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            lines.extend(body_lines(body, bubble_width, style, alignment));
        }
        EntryContent::Pending => {
            lines.push(
                Line::from(Span::styled(
                    pending_indicator(tick),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                ))
                .alignment(alignment),
            );
        }
    }

    lines
}

fn header(entry: &TimelineEntry) -> Line<'static> {
    let avatar = entry.avatar();
    let name = Span::styled(
        avatar.label(),
        Style::default().add_modifier(Modifier::BOLD),
    );
    let glyph = Span::raw(avatar.glyph());
    match entry.side() {
        Side::Incoming => Line::from(vec![glyph, Span::raw(" "), name]),
        Side::Outgoing => Line::from(vec![name, Span::raw(" "), glyph]),
    }
}

fn body_lines(
    body: &str,
    width: usize,
    style: Style,
    alignment: Alignment,
) -> impl Iterator<Item = Line<'static>> {
    wrap_text(body, width)
        .into_iter()
        .map(move |text| Line::from(Span::styled(text, style)).alignment(alignment))
}

/// Animated "typing" indicator for a pending reply
pub fn pending_indicator(tick: usize) -> String {
    let dots = tick % 3 + 1;
    format!("{}{}", "●".repeat(dots), "○".repeat(3 - dots))
}

/// Greedy word wrap on character counts. Explicit line breaks are kept and
/// words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw_line in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in raw_line.split_whitespace() {
            let word_len = word.chars().count();

            if current_len > 0 && current_len + 1 + word_len > width {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if word_len > width {
                let chars: Vec<char> = word.chars().collect();
                let mut pieces = chars.chunks(width).peekable();
                while let Some(piece) = pieces.next() {
                    if pieces.peek().is_some() {
                        out.push(piece.iter().collect());
                    } else {
                        current = piece.iter().collect();
                        current_len = piece.len();
                    }
                }
                continue;
            }

            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }

        out.push(current);
    }

    out
}
