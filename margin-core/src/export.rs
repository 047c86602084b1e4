use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::address::Address;
use crate::dom::Container;
use crate::engine::{find_marker, MarkerConfig};
use crate::model::{Annotation, HighlightColor, Page};

/// Export shape of one page and its highlights
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPage {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub annotations: Vec<ExportAnnotation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAnnotation {
    pub id: String,
    pub color: HighlightColor,
    pub comment: String,
    /// Text currently inside the marker; empty when the annotation is not shown
    pub text: String,
    pub start_address: Address,
    pub start_offset: usize,
    pub end_address: Address,
    pub end_offset: usize,
}

impl ExportAnnotation {
    pub fn new(annotation: &Annotation, container: &Container, config: &MarkerConfig) -> Self {
        let text = find_marker(container, config, &annotation.id)
            .and_then(|address| container.node(&address))
            .map(|marker| marker.text_content())
            .unwrap_or_default();
        Self {
            id: annotation.id.clone(),
            color: annotation.color,
            comment: annotation.comment.clone(),
            text,
            start_address: annotation.start_address.clone(),
            start_offset: annotation.start_offset,
            end_address: annotation.end_address.clone(),
            end_offset: annotation.end_offset,
        }
    }
}

impl ExportPage {
    /// Snapshot of `page` as rendered in `container`
    pub fn new(page: &Page, container: &Container, config: &MarkerConfig) -> Self {
        Self {
            id: page.id.clone(),
            title: page.title.clone(),
            content: page.content.clone(),
            created_at: page.created_at,
            updated_at: page.updated_at,
            annotations: page
                .annotations
                .iter()
                .map(|a| ExportAnnotation::new(a, container, config))
                .collect(),
        }
    }
}

pub fn to_json(page: &Page, container: &Container, config: &MarkerConfig) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportPage::new(page, container, config))
}

/// Plain-text summary of a page's highlights, grouped by color
pub fn digest(page: &Page, container: &Container, config: &MarkerConfig) -> String {
    let export = ExportPage::new(page, container, config);
    let mut out = String::new();

    out.push_str(&format!("## {}\n\n", export.title));
    if export.annotations.is_empty() {
        out.push_str("No highlights.\n");
        return out;
    }

    for color in HighlightColor::all() {
        let items: Vec<_> = export
            .annotations
            .iter()
            .filter(|a| a.color == *color)
            .collect();
        if items.is_empty() {
            continue;
        }

        out.push_str(&format!("### {} ({})\n\n", color, items.len()));
        for ann in items {
            if ann.text.is_empty() {
                out.push_str("> (not found in current text)\n");
            } else {
                out.push_str(&format!("> {}\n", ann.text));
            }
            if !ann.comment.is_empty() {
                out.push_str(&format!("- {}\n", ann.comment));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Boundary, TreeRange};
    use crate::engine::create_annotation;
    use crate::model::AnnotationIdGenerator;

    fn highlighted() -> (Page, Container) {
        let html = "<p>This is the first sample page.</p>";
        let mut page = Page::new("Sample".to_string(), html.to_string());
        let mut container = Container::from_html(html).unwrap();
        let range = TreeRange::new(
            Boundary::new(Address::new(vec![0, 0]), 12),
            Boundary::new(Address::new(vec![0, 0]), 24),
        );
        let mut ids = AnnotationIdGenerator::new();
        let outcome = create_annotation(
            &mut page,
            &mut container,
            &range,
            HighlightColor::Green,
            &mut ids,
            &MarkerConfig::default(),
        );
        assert!(outcome.is_created());
        page.annotations[0].comment = "key phrase".to_string();
        (page, container)
    }

    #[test]
    fn test_export_includes_rendered_text() {
        let (page, container) = highlighted();
        let json = to_json(&page, &container, &MarkerConfig::default()).unwrap();
        assert!(json.contains("\"text\": \"first sample\""));
        assert!(json.contains("\"color\": \"green\""));
        assert!(json.contains("\"startAddress\": ["));
    }

    #[test]
    fn test_unrendered_annotation_has_empty_text() {
        let (page, _) = highlighted();
        let bare = Container::from_html("<p>other</p>").unwrap();
        let export = ExportPage::new(&page, &bare, &MarkerConfig::default());
        assert_eq!(export.annotations[0].text, "");
    }

    #[test]
    fn test_digest_groups_by_color() {
        let (page, container) = highlighted();
        let digest = digest(&page, &container, &MarkerConfig::default());
        assert!(digest.starts_with("## Sample\n\n### green (1)\n\n> first sample\n- key phrase\n"));
    }

    #[test]
    fn test_export_uses_given_marker_shape() {
        let html = "<p>This is the first sample page.</p>";
        let mut page = Page::new("Sample".to_string(), html.to_string());
        let mut container = Container::from_html(html).unwrap();
        let config = MarkerConfig {
            class: "note".to_string(),
            ..MarkerConfig::default()
        };
        let range = TreeRange::new(
            Boundary::new(Address::new(vec![0, 0]), 12),
            Boundary::new(Address::new(vec![0, 0]), 24),
        );
        let mut ids = AnnotationIdGenerator::new();
        let outcome = create_annotation(
            &mut page,
            &mut container,
            &range,
            HighlightColor::Blue,
            &mut ids,
            &config,
        );
        assert!(outcome.is_created());

        let export = ExportPage::new(&page, &container, &config);
        assert_eq!(export.annotations[0].text, "first sample");
        let default_shape = ExportPage::new(&page, &container, &MarkerConfig::default());
        assert_eq!(default_shape.annotations[0].text, "");
    }
}
