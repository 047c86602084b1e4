//! Page collection and its JSON persistence

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{parse_fragment, serialize_fragment, Node};
use crate::model::Page;

/// Elements whose content never belongs in an imported article body
const DROPPED_ON_IMPORT: &[&str] = &["head", "title", "script", "style", "noscript", "template"];

/// Ordered collection of pages keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageStore {
    pages: Vec<Page>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three built-in sample pages
    pub fn with_samples() -> Self {
        let mut store = Self::new();
        store.insert(Page::with_id(
            "page1".to_string(),
            "Sample Page 1".to_string(),
            "<p>This is the first sample page. It contains some text that can be highlighted and annotated.</p><p>Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.</p>".to_string(),
        ));
        store.insert(Page::with_id(
            "page2".to_string(),
            "Sample Page 2".to_string(),
            "<p>This is another example page. Feel free to select text and try out the highlighting features.</p><p>Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.</p>".to_string(),
        ));
        store.insert(Page::with_id(
            "page3".to_string(),
            "A Short Story".to_string(),
            "<p>Once upon a time, in a land far away, there lived a curious programmer who wanted to build a text annotation tool.</p><p>The programmer worked diligently, crafting HTML, CSS, and JavaScript to bring their vision to life. Many cups of coffee were consumed during this endeavor.</p><p>Finally, the tool was complete, and it allowed users to highlight text, add comments, and marvel at the power of web technologies.</p>".to_string(),
        ));
        store
    }

    /// Add a page, replacing any page with the same id; returns the id
    pub fn insert(&mut self, page: Page) -> String {
        let id = page.id.clone();
        match self.pages.iter_mut().find(|p| p.id == id) {
            Some(slot) => *slot = page,
            None => self.pages.push(page),
        }
        id
    }

    /// Create an empty page and return its id
    pub fn new_page(&mut self) -> String {
        let title = format!("Untitled Page {}", self.pages.len() + 1);
        self.insert(Page::new(title, "<p></p>".to_string()))
    }

    /// Add a page built from a fetched or saved HTML document.
    ///
    /// The title comes from `<title>`, then the first `<h1>`, then
    /// `title_hint`. The body markup is kept as is, minus head, script and
    /// style content.
    pub fn import_html(&mut self, title_hint: Option<&str>, html: &str) -> Result<String> {
        let nodes = parse_fragment(html).context("Failed to parse article markup")?;

        let title = find_text(&nodes, "title")
            .or_else(|| find_text(&nodes, "h1"))
            .or_else(|| title_hint.map(str::to_string))
            .unwrap_or_else(|| "Untitled Article".to_string());

        let body = match find_element(&nodes, "body") {
            Some(body) => body.children().to_vec(),
            None => nodes,
        };
        let body = strip_elements(body);
        let text = body.iter().map(Node::text_content).collect::<String>();
        ensure!(!text.trim().is_empty(), "Could not extract article content");

        debug!(title = %title, "Imported article");
        Ok(self.insert(Page::new(title, serialize_fragment(&body))))
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Page> {
        let pos = self.pages.iter().position(|p| p.id == id)?;
        Some(self.pages.remove(pos))
    }

    pub fn ids(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.id.clone()).collect()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let store = Self::from_json(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!(pages = store.len(), "Loaded store from {}", path.display());
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }
        let json = self.to_json().context("Failed to serialize pages")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(pages = self.len(), "Saved store to {}", path.display());
        Ok(())
    }
}

fn find_element<'a>(nodes: &'a [Node], tag: &str) -> Option<&'a Node> {
    nodes.iter().find_map(|node| match node.as_element() {
        Some(el) if el.tag == tag => Some(node),
        Some(_) => find_element(node.children(), tag),
        None => None,
    })
}

fn find_text(nodes: &[Node], tag: &str) -> Option<String> {
    let text = find_element(nodes, tag)?.text_content();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn strip_elements(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(el) if DROPPED_ON_IMPORT.contains(&el.tag.as_str()) => None,
            Node::Element(mut el) => {
                el.children = strip_elements(el.children);
                Some(Node::Element(el))
            }
            text => Some(text),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples() {
        let store = PageStore::with_samples();
        assert_eq!(store.ids(), ["page1", "page2", "page3"]);
        assert_eq!(store.get("page3").unwrap().title, "A Short Story");
        assert!(store.get("page1").unwrap().content.starts_with("<p>This is the first sample page."));
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut store = PageStore::with_samples();
        store.insert(Page::with_id("page2".to_string(), "Renamed".to_string(), String::new()));
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("page2").unwrap().title, "Renamed");
        assert!(store.remove("page2").is_some());
        assert_eq!(store.ids(), ["page1", "page3"]);
    }

    #[test]
    fn test_import_document() {
        let mut store = PageStore::new();
        let html = "<!DOCTYPE html><html><head><title>  An   Article </title><style>p { color: red }</style></head>\
                    <body><h1>Heading</h1><p>Body text.</p><script>track()</script></body></html>";
        let id = store.import_html(Some("fallback"), html).unwrap();
        let page = store.get(&id).unwrap();
        assert_eq!(page.title, "An Article");
        assert_eq!(page.content, "<h1>Heading</h1><p>Body text.</p>");
        assert!(page.annotations.is_empty());
    }

    #[test]
    fn test_import_title_fallbacks() {
        let mut store = PageStore::new();
        let id = store.import_html(None, "<h1>From heading</h1><p>x</p>").unwrap();
        assert_eq!(store.get(&id).unwrap().title, "From heading");

        let id = store.import_html(Some("notes.html"), "<p>plain</p>").unwrap();
        assert_eq!(store.get(&id).unwrap().title, "notes.html");

        assert!(store.import_html(None, "<html><head><title>Empty</title></head><body> </body></html>").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pages.json");

        let mut store = PageStore::with_samples();
        let id = store.new_page();
        store.save(&path).unwrap();

        let loaded = PageStore::load(&path).unwrap();
        assert_eq!(loaded.ids(), store.ids());
        assert_eq!(loaded.get(&id).unwrap().content, "<p></p>");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PageStore::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
