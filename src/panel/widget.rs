//! Ratatui rendering of a [`PanelView`].
//!
//! The panel state machine knows nothing about toolkits; this adapter draws
//! its declarative description as a floating box anchored at the cursor's
//! screen position, and maps crossterm key events onto [`PanelKey`].

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use unicode_width::UnicodeWidthStr;

use super::{PanelKey, PanelView};

/// Widest the panel box will grow.
const MAX_PANEL_WIDTH: u16 = 48;

/// Maps a crossterm key event onto the panel's keyboard contract.
///
/// Returns `None` for keys the panel does not handle (the host editor keeps
/// them). Shift/alt combinations are left alone, as are control chords other
/// than the jump variants.
#[must_use]
pub fn panel_key(event: &KeyEvent) -> Option<PanelKey> {
    if event
        .modifiers
        .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
    {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && !matches!(event.code, KeyCode::Up | KeyCode::Down) {
        return None;
    }

    match event.code {
        KeyCode::Up if ctrl => Some(PanelKey::JumpUp),
        KeyCode::Down if ctrl => Some(PanelKey::JumpDown),
        KeyCode::Up => Some(PanelKey::Up),
        KeyCode::Down => Some(PanelKey::Down),
        KeyCode::PageUp => Some(PanelKey::PageUp),
        KeyCode::PageDown => Some(PanelKey::PageDown),
        KeyCode::Enter | KeyCode::Tab => Some(PanelKey::Commit),
        KeyCode::Esc => Some(PanelKey::Cancel),
        _ => None,
    }
}

/// Floating candidate-panel widget.
pub struct PanelWidget<'a> {
    view: &'a PanelView,
    /// Cursor screen position the panel anchors below.
    origin: (u16, u16),
}

impl<'a> PanelWidget<'a> {
    /// Creates a widget for one render pass.
    #[must_use]
    pub fn new(view: &'a PanelView, origin: (u16, u16)) -> Self {
        Self { view, origin }
    }

    fn panel_area(&self, area: Rect) -> Rect {
        let signature_rows = u16::from(self.view.signature.is_some());
        let candidate_rows = self.view.rows.len() as u16 + u16::from(self.view.show_more);
        let detail_rows = u16::from(self.view.detail.is_some());
        // +2 for the border.
        let height = (signature_rows + candidate_rows + detail_rows + 2).min(area.height);

        let width = self
            .view
            .rows
            .iter()
            .map(|row| row.name.width() as u16 + 14)
            .chain(
                self.view
                    .signature
                    .iter()
                    .map(|s| s.width() as u16 + 2),
            )
            .max()
            .unwrap_or(20)
            .clamp(20, MAX_PANEL_WIDTH)
            .min(area.width);

        // Below the cursor line when it fits, above otherwise.
        let (ox, oy) = self.origin;
        let y = if oy + 1 + height <= area.height {
            oy + 1
        } else {
            oy.saturating_sub(height)
        };
        let x = ox.min(area.width.saturating_sub(width));

        Rect::new(x, y, width, height)
    }
}

impl<'a> Widget for PanelWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.view.rows.is_empty() && self.view.signature.is_none() {
            return;
        }

        let panel_area = self.panel_area(area);
        Clear.render(panel_area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(panel_area);
        block.render(panel_area, buf);

        let mut y = inner.y;

        if let Some(signature) = &self.view.signature {
            if y < inner.bottom() {
                let line = Line::from(Span::styled(
                    signature.clone(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::ITALIC),
                ));
                buf.set_line(inner.x, y, &line, inner.width);
                y += 1;
            }
        }

        for (index, row) in self.view.rows.iter().enumerate() {
            if y >= inner.bottom() {
                break;
            }
            let selected = index == self.view.selected;
            let base = if selected {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            let tag_style = base.add_modifier(Modifier::DIM);

            let line = Line::from(vec![
                Span::styled(format!("{:>4} ", row.source), tag_style),
                Span::styled(format!("{:<6} ", row.kind), tag_style),
                Span::styled(row.name.clone(), base),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);

            if selected {
                for x in inner.x..inner.right() {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_style(base);
                    }
                }
            }
            y += 1;
        }

        if self.view.show_more && y < inner.bottom() {
            let selected = self.view.selected == self.view.rows.len();
            let style = if selected {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            };
            let line = Line::from(Span::styled("… show all", style));
            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }

        if let Some(detail) = &self.view.detail {
            if y < inner.bottom() {
                let line = Line::from(Span::styled(
                    detail.clone(),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::DIM),
                ));
                buf.set_line(inner.x, y, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::panel::RowView;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn sample_view() -> PanelView {
        PanelView {
            signature: Some("fn foo(a: u32)".to_string()),
            rows: vec![
                RowView {
                    name: "foobar".to_string(),
                    kind: "fn",
                    source: "buf",
                },
                RowView {
                    name: "foobaz".to_string(),
                    kind: "var",
                    source: "ext",
                },
            ],
            show_more: true,
            selected: 0,
            detail: Some("buffer".to_string()),
        }
    }

    #[test]
    fn test_key_mapping_basics() {
        assert_eq!(
            panel_key(&key(KeyCode::Up, KeyModifiers::NONE)),
            Some(PanelKey::Up)
        );
        assert_eq!(
            panel_key(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(PanelKey::Commit)
        );
        assert_eq!(
            panel_key(&key(KeyCode::Tab, KeyModifiers::NONE)),
            Some(PanelKey::Commit)
        );
        assert_eq!(
            panel_key(&key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(PanelKey::Cancel)
        );
    }

    #[test]
    fn test_key_mapping_jump_variants() {
        assert_eq!(
            panel_key(&key(KeyCode::Up, KeyModifiers::CONTROL)),
            Some(PanelKey::JumpUp)
        );
        assert_eq!(
            panel_key(&key(KeyCode::Down, KeyModifiers::CONTROL)),
            Some(PanelKey::JumpDown)
        );
    }

    #[test]
    fn test_key_mapping_leaves_other_chords_alone() {
        assert_eq!(panel_key(&key(KeyCode::Up, KeyModifiers::SHIFT)), None);
        assert_eq!(panel_key(&key(KeyCode::Char('a'), KeyModifiers::NONE)), None);
        assert_eq!(
            panel_key(&key(KeyCode::Enter, KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn test_render_fits_in_area() {
        let view = sample_view();
        let widget = PanelWidget::new(&view, (5, 2));
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        let mut rendered = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                if let Some(cell) = buf.cell((x, y)) {
                    rendered.push_str(cell.symbol());
                }
            }
            rendered.push('\n');
        }
        assert!(rendered.contains("fn foo(a: u32)"));
        assert!(rendered.contains("foobar"));
        assert!(rendered.contains("… show all"));
    }

    #[test]
    fn test_render_empty_view_is_noop() {
        let view = PanelView {
            signature: None,
            rows: Vec::new(),
            show_more: false,
            selected: 0,
            detail: None,
        };
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        PanelWidget::new(&view, (0, 0)).render(area, &mut buf);
        assert_eq!(buf, Buffer::empty(area));
    }
}
