//! Margin CLI - Terminal highlighter for HTML pages and articles

mod config;
mod io;
mod ui;

use std::fs::OpenOptions;
use std::io::stdout;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use margin_core::{Focus, HighlightColor, Mode, Session};

use crate::config::Config;

/// Work that needs the terminal itself
enum Request {
    Edit,
}

fn main() -> Result<()> {
    let config = Config::from_env()?;
    io::ensure_dir(&config.data_dir)?;
    init_logging(&config)?;

    let store = io::load_store(&config)?;
    let mut session = Session::new(store).with_color(config.color);
    session.load_first_page();

    // Import a file if provided
    if let Some(path) = std::env::args().nth(1) {
        match session.import_article(Path::new(&path)) {
            Ok(_) => session.set_status(&format!("Imported {}", path)),
            Err(e) => session.set_status(&format!("Error: {:#}", e)),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut session, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = io::save_store(&config, &session.store) {
        error!("Failed to save pages: {:#}", e);
        eprintln!("Error: {:#}", e);
    }
    if let Err(e) = res {
        eprintln!("Error: {:#}", e);
    }

    Ok(())
}

/// Log to a file in the data directory; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    info!("Starting margin with data in {}", config.data_dir.display());
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, session: &mut Session, config: &Config) -> Result<()> {
    while session.running {
        terminal.draw(|f| ui::draw(f, session))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            // Clear status on any key
            session.clear_status();

            let request = match session.mode {
                Mode::Normal => handle_normal_mode(session, config, key.code, key.modifiers),
                Mode::Visual => {
                    handle_visual_mode(session, key.code);
                    None
                }
                Mode::Comment | Mode::Import => {
                    handle_input_mode(session, key.code);
                    None
                }
                Mode::Help => {
                    session.mode = Mode::Normal;
                    None
                }
            };

            if let Some(Request::Edit) = request {
                edit_page(terminal, session, config)?;
            }

            if session.take_dirty() {
                if let Err(e) = io::save_store(config, &session.store) {
                    error!("Failed to save pages: {:#}", e);
                    session.set_status(&format!("Save failed: {:#}", e));
                }
            }
        }
    }
    Ok(())
}

/// Run an edit session in the external editor with the terminal suspended
fn edit_page<B: Backend>(terminal: &mut Terminal<B>, session: &mut Session, config: &Config) -> Result<()> {
    session.toggle_edit();
    if !session.editing {
        return Ok(());
    }

    disable_raw_mode()?;
    execute!(std::io::stdout(), LeaveAlternateScreen)?;
    let edited = io::edit_externally(config, &session.container.inner_html());
    execute!(std::io::stdout(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    terminal.clear()?;

    let failure = match edited {
        Ok(html) => session.replace_content(&html).err().map(|e| {
            error!("Edited markup could not be parsed: {}", e);
            format!("Edit discarded: {}", e)
        }),
        Err(e) => {
            error!("Edit failed: {:#}", e);
            Some(format!("Edit failed: {:#}", e))
        }
    };
    session.toggle_edit();
    if let Some(failure) = failure {
        session.set_status(&failure);
    }
    Ok(())
}

fn color_key(c: char) -> Option<HighlightColor> {
    let index = c.to_digit(10)? as usize;
    HighlightColor::all().get(index.checked_sub(1)?).copied()
}

fn handle_normal_mode(session: &mut Session, config: &Config, code: KeyCode, _modifiers: KeyModifiers) -> Option<Request> {
    match code {
        KeyCode::Char('q') => session.running = false,
        KeyCode::Char('?') => session.mode = Mode::Help,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => match session.focus {
            Focus::Pages => session.next_page(),
            Focus::Editor => session.cursor.move_down(),
            Focus::Sidebar => session.next_annotation(),
        },
        KeyCode::Char('k') | KeyCode::Up => match session.focus {
            Focus::Pages => session.prev_page(),
            Focus::Editor => session.cursor.move_up(),
            Focus::Sidebar => session.prev_annotation(),
        },
        KeyCode::Char('h') | KeyCode::Left => session.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => session.cursor.move_right(),
        KeyCode::Char('w') => session.cursor.move_word_forward(),
        KeyCode::Char('b') => session.cursor.move_word_back(),
        KeyCode::Char('0') | KeyCode::Home => session.cursor.move_to_start(),
        KeyCode::Char('$') | KeyCode::End => session.cursor.move_to_end(),
        KeyCode::Char('g') => session.cursor.move_to_top(),
        KeyCode::Char('G') => session.cursor.move_to_bottom(),
        KeyCode::Enter => match session.focus {
            Focus::Pages => {
                session.open_selected_page();
                session.focus = Focus::Editor;
            }
            _ => {
                if !session.select_at_cursor() {
                    session.set_status("No highlight under cursor");
                }
            }
        },

        // Annotation navigation
        KeyCode::Char(']') => session.next_annotation(),
        KeyCode::Char('[') => session.prev_annotation(),

        // Highlights
        KeyCode::Char('v') => session.enter_visual_mode(),
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(color) = color_key(c) {
                if session.focus == Focus::Sidebar && session.selected.is_some() {
                    session.recolor_selected(color);
                } else {
                    session.set_color(color);
                }
            }
        }
        KeyCode::Char('c') => session.start_comment(),
        KeyCode::Char('d') => {
            session.delete_selected();
        }

        // Pages
        KeyCode::Char('e') => return Some(Request::Edit),
        KeyCode::Char('i') => session.start_import(),
        KeyCode::Char('n') => {
            session.new_page();
        }
        KeyCode::Char('X') => {
            session.remove_page();
        }

        // Export
        KeyCode::Char('x') => match io::export_page(config, session) {
            Ok(path) => session.set_status(&format!("Exported to {}", path.display())),
            Err(e) => session.set_status(&format!("Export failed: {:#}", e)),
        },
        KeyCode::Char('p') => match io::export_digest(config, session) {
            Ok(path) => session.set_status(&format!("Digest written to {}", path.display())),
            Err(e) => session.set_status(&format!("Export failed: {:#}", e)),
        },
        KeyCode::Char('s') => match io::save_store(config, &session.store) {
            Ok(()) => session.set_status("Saved"),
            Err(e) => session.set_status(&format!("Save failed: {:#}", e)),
        },

        KeyCode::Tab => session.toggle_focus(),

        _ => {}
    }
    None
}

fn handle_visual_mode(session: &mut Session, code: KeyCode) {
    match code {
        KeyCode::Esc => session.cancel_selection(),
        KeyCode::Char('j') | KeyCode::Down => session.cursor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => session.cursor.move_up(),
        KeyCode::Char('h') | KeyCode::Left => session.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => session.cursor.move_right(),
        KeyCode::Char('w') => session.cursor.move_word_forward(),
        KeyCode::Char('b') => session.cursor.move_word_back(),
        KeyCode::Char('0') | KeyCode::Home => session.cursor.move_to_start(),
        KeyCode::Char('$') | KeyCode::End => session.cursor.move_to_end(),
        KeyCode::Char('a') | KeyCode::Enter => {
            session.highlight_selection();
        }
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(color) = color_key(c) {
                session.set_color(color);
            }
        }
        _ => {}
    }
}

fn handle_input_mode(session: &mut Session, code: KeyCode) {
    match code {
        KeyCode::Esc => session.cancel_input(),
        KeyCode::Enter => session.submit_input(),
        KeyCode::Backspace => {
            session.input_buffer.pop();
        }
        KeyCode::Char(c) => session.input_buffer.push(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_keys_follow_palette() {
        assert_eq!(color_key('1'), Some(HighlightColor::Yellow));
        assert_eq!(color_key('4'), Some(HighlightColor::Pink));
        assert_eq!(color_key('5'), None);
        assert_eq!(color_key('0'), None);
    }
}
