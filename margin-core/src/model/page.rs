use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Annotation;

/// A page: raw HTML content plus the highlights anchored into it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(title: String, content: String) -> Self {
        Self::with_id(format!("page-{}", Uuid::new_v4().simple()), title, content)
    }

    pub fn with_id(id: String, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            content,
            annotations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the stored markup wholesale
    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.touch();
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
        self.touch();
    }

    pub fn remove_annotation(&mut self, id: &str) -> Option<Annotation> {
        let pos = self.annotations.iter().position(|a| a.id == id)?;
        self.touch();
        Some(self.annotations.remove(pos))
    }

    pub fn find_annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn find_annotation_mut(&mut self, id: &str) -> Option<&mut Annotation> {
        let pos = self.annotations.iter().position(|a| a.id == id)?;
        self.touch();
        self.annotations.get_mut(pos)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Boundary, TreeRange};
    use crate::model::HighlightColor;

    fn annotation(id: &str) -> Annotation {
        let range = TreeRange::new(Boundary::default(), Boundary::default());
        Annotation::new(id.to_string(), HighlightColor::Blue, &range)
    }

    #[test]
    fn test_annotations_keep_insertion_order() {
        let mut page = Page::new("Title".to_string(), "<p>x</p>".to_string());
        page.add_annotation(annotation("2"));
        page.add_annotation(annotation("1"));
        let ids: Vec<_> = page.annotations.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
    }

    #[test]
    fn test_remove_annotation() {
        let mut page = Page::new("Title".to_string(), String::new());
        page.add_annotation(annotation("a"));
        assert!(page.remove_annotation("missing").is_none());
        assert_eq!(page.remove_annotation("a").map(|a| a.id), Some("a".to_string()));
        assert!(page.annotations.is_empty());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = Page::new("a".to_string(), String::new());
        let b = Page::new("b".to_string(), String::new());
        assert!(a.id.starts_with("page-"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_unknown_id_does_not_touch_page() {
        let mut page = Page::new("Title".to_string(), String::new());
        page.add_annotation(annotation("a"));
        let stamped = page.updated_at;
        assert!(page.find_annotation_mut("missing").is_none());
        assert_eq!(page.updated_at, stamped);
        assert!(page.find_annotation_mut("a").is_some());
        assert!(page.updated_at >= stamped);
    }
}
