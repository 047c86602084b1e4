use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cursor::CursorState;
use crate::dom::{Container, TreeRange};
use crate::engine::{self, CreateOutcome, MarkerConfig};
use crate::error::{EngineError, MarkupError};
use crate::export;
use crate::layout::TextLayout;
use crate::model::{Annotation, AnnotationIdGenerator, HighlightColor, Page};
use crate::store::PageStore;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Visual,
    /// Typing a comment for the selected annotation
    Comment,
    /// Typing the path of an HTML file to import
    Import,
    Help,
}

/// Focus area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Pages,
    Editor,
    Sidebar,
}

/// Platform-agnostic application state
pub struct Session {
    pub store: PageStore,
    /// Id of the page shown in the container
    pub current: Option<String>,
    pub container: Container,
    pub layout: TextLayout,
    pub cursor: CursorState,
    pub color: HighlightColor,
    pub editing: bool,
    pub mode: Mode,
    pub focus: Focus,
    pub running: bool,

    /// Flat offset where visual selection started
    pub selection_anchor: Option<usize>,
    /// Annotation shown as selected in the sidebar
    pub selected: Option<String>,
    pub page_selected: usize,

    pub input_buffer: String,
    pub status_message: Option<String>,

    dirty: bool,
    markers: MarkerConfig,
    ids: AnnotationIdGenerator,
}

impl Session {
    pub fn new(store: PageStore) -> Self {
        Self {
            store,
            current: None,
            container: Container::new(),
            layout: TextLayout::default(),
            cursor: CursorState::new(),
            color: HighlightColor::default(),
            editing: false,
            mode: Mode::Normal,
            focus: Focus::Editor,
            running: true,

            selection_anchor: None,
            selected: None,
            page_selected: 0,

            input_buffer: String::new(),
            status_message: None,

            dirty: false,
            markers: MarkerConfig::default(),
            ids: AnnotationIdGenerator::new(),
        }
    }

    pub fn with_color(mut self, color: HighlightColor) -> Self {
        self.color = color;
        self
    }

    pub fn marker_config(&self) -> &MarkerConfig {
        &self.markers
    }

    pub fn page(&self) -> Option<&Page> {
        self.store.get(self.current.as_deref()?)
    }

    /// Whether the store changed since the last call
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Show a page: rebuild the container from its content and replay its annotations
    pub fn load_page(&mut self, id: &str) -> bool {
        if self.editing {
            self.toggle_edit();
        }
        if self.store.get(id).is_none() {
            debug!("{}", EngineError::MissingPageOrPageData(id.to_string()));
            self.set_status(&format!("No page {}", id));
            return false;
        }

        let mut status = None;
        if let Some(page) = self.store.get(id) {
            if let Err(e) = self.container.set_html(&page.content) {
                warn!(page = %id, "Could not parse page content: {}", e);
                self.container = Container::new();
                status = Some(format!("Could not load {}: {}", page.title, e));
            }
            engine::strip_orphan_markers(page, &mut self.container, &self.markers);
            let report = engine::render_annotations(page, &mut self.container, &self.markers);
            if status.is_none() && !report.skipped.is_empty() {
                status = Some(format!("{} highlight(s) could not be shown", report.skipped.len()));
            }
            debug!(page = %id, "Loaded page: {}", page.title);
        }

        if let Some(index) = self.store.pages().iter().position(|p| p.id == id) {
            self.page_selected = index;
        }
        self.current = Some(id.to_string());
        self.selected = None;
        self.selection_anchor = None;
        self.mode = Mode::Normal;
        self.refresh_layout();
        self.cursor.move_to_top();
        if let Some(status) = status {
            self.set_status(&status);
        }
        true
    }

    /// Load the first page of the store, if any
    pub fn load_first_page(&mut self) -> bool {
        match self.store.ids().into_iter().next() {
            Some(id) => self.load_page(&id),
            None => {
                self.current = None;
                self.container = Container::new();
                self.refresh_layout();
                false
            }
        }
    }

    fn refresh_layout(&mut self) {
        self.layout = TextLayout::build(&self.container, &self.markers);
        self.cursor.set_content(self.layout.text());
    }

    // Selection

    pub fn enter_visual_mode(&mut self) {
        if self.editing {
            self.set_status("Finish editing before selecting");
            return;
        }
        self.mode = Mode::Visual;
        self.selection_anchor = Some(self.cursor.offset());
    }

    pub fn cancel_selection(&mut self) {
        self.selection_anchor = None;
        if self.mode == Mode::Visual {
            self.mode = Mode::Normal;
        }
    }

    /// Flat `[start, end)` of the visual selection; the char under the cursor is included
    pub fn selection_range(&self) -> Option<(usize, usize)> {
        if self.mode != Mode::Visual {
            return None;
        }
        let anchor = self.selection_anchor?;
        let cursor = self.cursor.offset();
        let end = (anchor.max(cursor) + 1).min(self.layout.len());
        Some((anchor.min(cursor), end))
    }

    pub fn selected_tree_range(&self) -> Option<TreeRange> {
        let (start, end) = self.selection_range()?;
        self.layout.range_between(start, end)
    }

    // Highlights

    /// Highlight `range` with the current color
    pub fn highlight(&mut self, range: &TreeRange) -> bool {
        if self.editing {
            debug!("Ignoring selection while editing");
            self.set_status("Finish editing before highlighting");
            return false;
        }
        let Some(page) = self.current.as_deref().and_then(|id| self.store.get_mut(id)) else {
            debug!("{}", EngineError::MissingPageOrPageData("current page".to_string()));
            return false;
        };

        let outcome = engine::create_annotation(
            page,
            &mut self.container,
            range,
            self.color,
            &mut self.ids,
            &self.markers,
        );
        match outcome {
            CreateOutcome::Created(annotation) => {
                self.selected = Some(annotation.id);
                self.cancel_selection();
                self.dirty = true;
                self.refresh_layout();
                self.set_status(&format!("Added {} highlight", self.color));
                true
            }
            CreateOutcome::Ignored(e) => {
                self.set_status(&e.to_string());
                false
            }
        }
    }

    /// Highlight the visual selection
    pub fn highlight_selection(&mut self) -> bool {
        match self.selected_tree_range() {
            Some(range) => self.highlight(&range),
            None => {
                self.set_status("Nothing selected");
                false
            }
        }
    }

    /// Set the current color; an active selection is highlighted right away
    pub fn set_color(&mut self, color: HighlightColor) {
        self.color = color;
        if self.mode == Mode::Visual {
            self.highlight_selection();
        } else {
            self.set_status(&format!("Color: {}", color));
        }
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.page()?.find_annotation(self.selected.as_deref()?)
    }

    /// Index of the selected annotation in the page list
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.page()?.annotations.iter().position(|a| a.id == id)
    }

    pub fn recolor_selected(&mut self, color: HighlightColor) -> bool {
        let Some(id) = self.selected.clone() else {
            return false;
        };
        let Some(page) = self.current.as_deref().and_then(|pid| self.store.get_mut(pid)) else {
            return false;
        };
        if !engine::change_color(page, &mut self.container, &id, color, &self.markers) {
            return false;
        }
        self.dirty = true;
        self.refresh_layout();
        self.set_status(&format!("Changed highlight to {}", color));
        true
    }

    pub fn comment_selected(&mut self, comment: &str) -> bool {
        let Some(id) = self.selected.clone() else {
            return false;
        };
        let Some(page) = self.current.as_deref().and_then(|pid| self.store.get_mut(pid)) else {
            return false;
        };
        if !engine::set_comment(page, &mut self.container, &id, comment.trim(), &self.markers) {
            return false;
        }
        self.dirty = true;
        self.set_status("Comment saved");
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected.clone() else {
            return false;
        };
        let Some(page) = self.current.as_deref().and_then(|pid| self.store.get_mut(pid)) else {
            return false;
        };
        if engine::delete_annotation(page, &mut self.container, &id, &self.markers).is_none() {
            return false;
        }
        self.selected = None;
        self.dirty = true;
        self.refresh_layout();
        self.set_status("Highlight deleted");
        true
    }

    /// Select the annotation under the cursor
    pub fn select_at_cursor(&mut self) -> bool {
        let offset = self.cursor.offset();
        let id = self.layout.marker_at(offset).map(|m| m.id.clone()).or_else(|| {
            let boundary = self.layout.boundary_at(offset)?;
            engine::annotation_at(&self.container, &self.markers, &boundary)
        });
        match id {
            Some(id) => {
                self.selected = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn next_annotation(&mut self) {
        self.step_annotation(1);
    }

    pub fn prev_annotation(&mut self) {
        self.step_annotation(-1);
    }

    fn step_annotation(&mut self, step: isize) {
        let Some(page) = self.page() else {
            return;
        };
        let count = page.annotations.len();
        if count == 0 {
            return;
        }
        let next = match self.selected_index() {
            Some(index) => (index as isize + step).rem_euclid(count as isize) as usize,
            None if step < 0 => count - 1,
            None => 0,
        };
        let id = page.annotations[next].id.clone();
        if let Some((start, _)) = self.layout.marker_span(&id) {
            self.cursor.set_cursor_offset(start);
        }
        self.selected = Some(id);
    }

    pub fn start_comment(&mut self) {
        let Some(comment) = self.selected_annotation().map(|a| a.comment.clone()) else {
            self.set_status("Select a highlight first");
            return;
        };
        self.input_buffer = comment;
        self.mode = Mode::Comment;
    }

    pub fn start_import(&mut self) {
        self.input_buffer.clear();
        self.mode = Mode::Import;
    }

    /// Apply the input buffer to the pending comment or import
    pub fn submit_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match mode {
            Mode::Comment => {
                self.comment_selected(&input);
            }
            Mode::Import => {
                let path = input.trim();
                if let Err(e) = self.import_article(Path::new(path)) {
                    warn!("Import failed: {:#}", e);
                    self.set_status(&format!("Error: {:#}", e));
                }
            }
            _ => {}
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_buffer.clear();
        self.mode = Mode::Normal;
    }

    // Editing

    /// Enter or leave an edit session. Leaving stores the edited markup and
    /// rebuilds the highlights from their addresses.
    pub fn toggle_edit(&mut self) {
        if !self.editing {
            if self.current.is_none() {
                return;
            }
            self.cancel_selection();
            self.editing = true;
            self.set_status("Editing; highlights are paused");
            return;
        }

        self.editing = false;
        let Some(page) = self.current.as_deref().and_then(|id| self.store.get_mut(id)) else {
            return;
        };
        let report = engine::reconcile_after_edit(page, &mut self.container, &self.markers);
        self.dirty = true;
        if self.selected.as_deref().map(|id| !report.rendered.contains(&id.to_string())).unwrap_or(false) {
            self.selected = None;
        }
        self.refresh_layout();
        if report.skipped.is_empty() {
            self.set_status("Saved");
        } else {
            self.set_status(&format!("Saved; {} highlight(s) no longer match the text", report.skipped.len()));
        }
    }

    /// Overwrite the container while an edit session is open. Returns
    /// false when no edit session is open.
    pub fn replace_content(&mut self, html: &str) -> Result<bool, MarkupError> {
        if !self.editing {
            return Ok(false);
        }
        self.container.set_html(html)?;
        self.container.normalize();
        self.refresh_layout();
        Ok(true)
    }

    // Pages

    /// Import an HTML file as a new page and show it
    pub fn import_article(&mut self, path: &Path) -> Result<String> {
        let html = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let hint = path.file_stem().map(|s| s.to_string_lossy().to_string());
        let id = self
            .store
            .import_html(hint.as_deref(), &html)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        self.dirty = true;
        self.load_page(&id);
        self.set_status(&format!("Imported {}", path.display()));
        Ok(id)
    }

    pub fn new_page(&mut self) -> String {
        let id = self.store.new_page();
        self.dirty = true;
        self.load_page(&id);
        id
    }

    /// Remove the current page and show the first remaining one
    pub fn remove_page(&mut self) -> Option<Page> {
        let id = self.current.take()?;
        self.editing = false;
        let removed = self.store.remove(&id)?;
        self.dirty = true;
        self.load_first_page();
        self.set_status(&format!("Removed {}", removed.title));
        Some(removed)
    }

    pub fn next_page(&mut self) {
        let count = self.store.len();
        if count > 0 {
            self.page_selected = (self.page_selected + 1) % count;
        }
    }

    pub fn prev_page(&mut self) {
        let count = self.store.len();
        if count > 0 {
            self.page_selected = if self.page_selected == 0 {
                count - 1
            } else {
                self.page_selected - 1
            };
        }
    }

    pub fn open_selected_page(&mut self) -> bool {
        let Some(id) = self.store.pages().get(self.page_selected).map(|p| p.id.clone()) else {
            return false;
        };
        self.load_page(&id)
    }

    /// Export document of the current page
    pub fn export_json(&self) -> Option<serde_json::Result<String>> {
        self.page().map(|page| export::to_json(page, &self.container, &self.markers))
    }

    pub fn digest(&self) -> Option<String> {
        self.page().map(|page| export::digest(page, &self.container, &self.markers))
    }

    // Status and focus

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Pages => Focus::Editor,
            Focus::Editor => Focus::Sidebar,
            Focus::Sidebar => Focus::Pages,
        };
    }

    pub fn title(&self) -> String {
        self.page()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| "No page".to_string())
    }
}
