//! Terminal UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use margin_core::layout::SegmentMarker;
use margin_core::{ExportAnnotation, Focus, HighlightColor, Mode, Session};

// Catppuccin Mocha colors
const BASE: Color = Color::Rgb(30, 30, 46);
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const TEXT: Color = Color::Rgb(205, 214, 244);
const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const GREEN: Color = Color::Rgb(166, 227, 161);
const BLUE: Color = Color::Rgb(137, 180, 250);
const PINK: Color = Color::Rgb(245, 194, 231);
const MAUVE: Color = Color::Rgb(203, 166, 247);
const PEACH: Color = Color::Rgb(250, 179, 135);

pub fn draw(frame: &mut Frame, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title_bar(frame, session, chunks[0]);
    draw_main_area(frame, session, chunks[1]);
    draw_status_bar(frame, session, chunks[2]);

    match session.mode {
        Mode::Comment => draw_input_dialog(frame, session, "Comment (Enter to save, Esc to cancel)"),
        Mode::Import => draw_input_dialog(frame, session, "Import HTML file path"),
        Mode::Help => draw_help(frame),
        _ => {}
    }
}

fn draw_title_bar(frame: &mut Frame, session: &Session, area: Rect) {
    let count = session.page().map(|p| p.annotations.len()).unwrap_or(0);
    let current = session.selected_index().map(|i| i + 1).unwrap_or(0);
    let editing = if session.editing { " [EDITING]" } else { "" };

    let title_bar = Line::from(vec![
        Span::styled(
            format!(" Margin - {} [{}/{}]{} ", session.title(), current, count, editing),
            Style::default().fg(TEXT),
        ),
        Span::styled(
            format!(" {} ", session.color),
            Style::default().fg(BASE).bg(highlight_color(session.color)),
        ),
    ]);

    frame.render_widget(Paragraph::new(title_bar).style(Style::default().bg(SURFACE0)), area);
}

fn draw_main_area(frame: &mut Frame, session: &Session, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(24), // Pages
            Constraint::Min(0),     // Editor
            Constraint::Length(34), // Sidebar
        ])
        .split(area);

    draw_pages(frame, session, chunks[0]);
    draw_editor(frame, session, chunks[1]);
    draw_sidebar(frame, session, chunks[2]);
}

fn border_style(session: &Session, focus: Focus) -> Style {
    if session.focus == focus {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    }
}

fn draw_pages(frame: &mut Frame, session: &Session, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(session, Focus::Pages))
        .title(format!("Pages ({})", session.store.len()));

    let items: Vec<ListItem> = session
        .store
        .pages()
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let marker = if i == session.page_selected { ">" } else { " " };
            let mut style = Style::default().fg(TEXT);
            if session.current.as_deref() == Some(page.id.as_str()) {
                style = style.add_modifier(Modifier::BOLD);
            }
            if i == session.page_selected && session.focus == Focus::Pages {
                style = style.bg(SURFACE1);
            }
            ListItem::new(format!("{} {}", marker, page.title)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_editor(frame: &mut Frame, session: &Session, area: Rect) {
    let mode_indicator = match session.mode {
        Mode::Visual => " [VISUAL]",
        _ => "",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(session, Focus::Editor))
        .title(format!("Page{}", mode_indicator));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = &session.layout;
    // Marker of every flat char, filled in segment order
    let mut markers: Vec<Option<&SegmentMarker>> = vec![None; layout.len()];
    for seg in layout.segments() {
        for slot in markers.iter_mut().take(seg.flat_end()).skip(seg.flat_start) {
            *slot = seg.marker.as_ref();
        }
    }

    let selection = session.selection_range();
    let cursor = session.cursor.offset();
    let selected = session.selected.as_deref();

    let mut lines: Vec<Line> = Vec::new();
    let mut offset = 0;
    for line_text in layout.text().split('\n') {
        let mut spans: Vec<Span> = Vec::new();
        for ch in line_text.chars() {
            let mut style = Style::default().fg(TEXT);

            if let Some(marker) = markers.get(offset).copied().flatten() {
                style = style.fg(BASE).bg(highlight_color(marker.color));
                if Some(marker.id.as_str()) == selected {
                    style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                }
            }
            if let Some((sel_start, sel_end)) = selection {
                if offset >= sel_start && offset < sel_end {
                    style = style.fg(TEXT).bg(SURFACE1).add_modifier(Modifier::BOLD);
                }
            }
            if offset == cursor && !session.editing {
                style = style.add_modifier(Modifier::REVERSED);
            }

            spans.push(Span::styled(ch.to_string(), style));
            offset += 1;
        }
        lines.push(Line::from(spans));
        offset += 1; // newline
    }

    let visible_height = inner.height as usize;
    let (row, _) = session.cursor.cursor();
    let scroll_offset = if row >= visible_height {
        row - visible_height + 1
    } else {
        0
    };

    let paragraph = Paragraph::new(lines).scroll((scroll_offset as u16, 0));
    frame.render_widget(paragraph, inner);
}

fn draw_sidebar(frame: &mut Frame, session: &Session, area: Rect) {
    let count = session.page().map(|p| p.annotations.len()).unwrap_or(0);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(session, Focus::Sidebar))
        .title(format!("Highlights ({})", count));

    let Some(page) = session.page() else {
        frame.render_widget(block, area);
        return;
    };

    let items: Vec<ListItem> = page
        .annotations
        .iter()
        .map(|ann| {
            let export = ExportAnnotation::new(ann, &session.container, session.marker_config());
            let selected = session.selected.as_deref() == Some(ann.id.as_str());
            let marker = if selected { ">" } else { " " };

            let preview = if export.text.is_empty() {
                "(not shown)".to_string()
            } else {
                let text: String = export.text.chars().take(22).collect();
                format!("\"{}\"", text)
            };

            let style = if selected {
                Style::default().fg(TEXT).bg(SURFACE1)
            } else {
                Style::default().fg(TEXT)
            };
            let line1 = Line::from(vec![
                Span::styled(format!("{} ", marker), style),
                Span::styled("■ ", style.fg(highlight_color(ann.color))),
                Span::styled(preview, style),
            ]);
            let line2 = Line::from(Span::styled(
                format!("   {}", ann.comment.chars().take(28).collect::<String>()),
                style.fg(SUBTEXT0),
            ));
            ListItem::new(vec![line1, line2])
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_status_bar(frame: &mut Frame, session: &Session, area: Rect) {
    let mode_str = match session.mode {
        Mode::Normal if session.editing => "EDIT",
        Mode::Normal => "NORMAL",
        Mode::Visual => "VISUAL",
        Mode::Comment => "COMMENT",
        Mode::Import => "IMPORT",
        Mode::Help => "HELP",
    };

    let status = session.status_message.as_deref().unwrap_or("");
    let help_hint = "v select | 1-4 color | c comment | d delete | e edit | ? help";

    let status_text = format!(
        " {} | {}",
        mode_str,
        if status.is_empty() { help_hint } else { status },
    );

    let status_bar = Paragraph::new(status_text).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));
    frame.render_widget(status_bar, area);
}

fn draw_input_dialog(frame: &mut Frame, session: &Session, title: &str) {
    let area = centered_rect(60, 5, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN))
        .title(title.to_string());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = Paragraph::new(format!("{}_", session.input_buffer)).style(Style::default().fg(TEXT));
    frame.render_widget(input, inner);
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(60, 28, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title("Help (press any key to close)");

    let heading = Style::default().fg(MAUVE).add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled("Navigation", heading)),
        Line::from("  h/j/k/l  Move cursor"),
        Line::from("  w/b      Next/prev word"),
        Line::from("  g/G      Go to top/bottom"),
        Line::from("  ]/[      Next/prev highlight"),
        Line::from("  Enter    Select highlight / open page"),
        Line::from("  Tab      Cycle pages/page/highlights"),
        Line::from(""),
        Line::from(Span::styled("Highlights", heading)),
        Line::from("  v        Start selection"),
        Line::from("  a        Highlight selection"),
        Line::from("  1-4      Pick color (recolor in sidebar)"),
        Line::from("  c        Comment on highlight"),
        Line::from("  d        Delete highlight"),
        Line::from(""),
        Line::from(Span::styled("Pages", heading)),
        Line::from("  e        Edit page in $EDITOR"),
        Line::from("  i        Import HTML file"),
        Line::from("  n / X    New / remove page"),
        Line::from("  x / p    Export JSON / digest"),
        Line::from("  s        Save"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Style::default().fg(PEACH))),
    ];

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn highlight_color(color: HighlightColor) -> Color {
    match color {
        HighlightColor::Yellow => YELLOW,
        HighlightColor::Green => GREEN,
        HighlightColor::Blue => BLUE,
        HighlightColor::Pink => PINK,
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
