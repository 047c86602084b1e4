//! Annotation engine: capture selections as addresses, wrap them in markers
//! and replay stored addresses against a reloaded tree.

pub mod marker;

pub use marker::{
    annotation_at, find_marker, find_markers, marker_ids, overlapping_marker, strip_markers,
    MarkerConfig,
};

use std::cmp::Ordering;

use tracing::{debug, error, info, warn};

use crate::dom::{compare_boundaries, range, surround, Container, TreeRange};
use crate::error::EngineError;
use crate::model::{Annotation, AnnotationIdGenerator, HighlightColor, Page};
use marker::{ancestor_marker, for_each_marker, unwrap_marker};

/// Result of a highlight request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The selection was wrapped and the record appended to the page
    Created(Annotation),
    /// Nothing changed; the reason is logged
    Ignored(EngineError),
}

impl CreateOutcome {
    pub fn annotation(&self) -> Option<&Annotation> {
        match self {
            CreateOutcome::Created(annotation) => Some(annotation),
            CreateOutcome::Ignored(_) => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// What a render pass did with each stored annotation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Ids that got a new marker
    pub rendered: Vec<String>,
    /// Ids whose marker already existed; only their label was refreshed
    pub refreshed: Vec<String>,
    /// Annotations left without a marker, with the reason
    pub skipped: Vec<EngineError>,
}

impl RenderReport {
    /// Number of annotations visible after the pass
    pub fn visible(&self) -> usize {
        self.rendered.len() + self.refreshed.len()
    }
}

/// Wrap `selection` in a new marker and append the annotation to `page`.
///
/// Addresses are captured before the tree is touched. Collapsed selections,
/// selections outside the container and selections that meet an existing
/// marker leave both the page and the tree unchanged.
pub fn create_annotation(
    page: &mut Page,
    container: &mut Container,
    selection: &TreeRange,
    color: HighlightColor,
    ids: &mut AnnotationIdGenerator,
    config: &MarkerConfig,
) -> CreateOutcome {
    let selection = selection.clone().ordered();
    if selection.is_collapsed() {
        debug!("Ignoring collapsed selection");
        return CreateOutcome::Ignored(EngineError::CollapsedSelection);
    }
    for boundary in [&selection.start, &selection.end] {
        if let Err(e) = range::validate(container, boundary) {
            debug!("Selection is outside the content: {}", e);
            return CreateOutcome::Ignored(EngineError::StructuralWrapFailure(e));
        }
    }

    let existing = ancestor_marker(container, config, &selection.start.address)
        .or_else(|| ancestor_marker(container, config, &selection.end.address))
        .or_else(|| ancestor_marker(container, config, &selection.common_ancestor()))
        .or_else(|| overlapping_marker(container, config, &selection));
    if let Some(existing) = existing {
        info!(existing = %existing, "Selection is already part of a highlight or contains one");
        return CreateOutcome::Ignored(EngineError::OverlappingSelection { existing });
    }

    let mut id = ids.next_id();
    while page.find_annotation(&id).is_some() {
        id = ids.next_id();
    }
    let annotation = Annotation::new(id, color, &selection);

    if let Err(e) = surround(container, &selection, config.build(&annotation)) {
        error!(annotation = %annotation.id, "Could not wrap selection: {}", e);
        return CreateOutcome::Ignored(EngineError::StructuralWrapFailure(e));
    }
    container.normalize();

    debug!(
        annotation = %annotation.id,
        start = %annotation.start_address,
        end = %annotation.end_address,
        "Created {} highlight",
        color
    );
    page.add_annotation(annotation.clone());
    CreateOutcome::Created(annotation)
}

/// Give every resolvable annotation of `page` exactly one marker.
///
/// Annotations are replayed in stored order, so each address is resolved
/// against the tree as it was when that annotation was captured.
pub fn render_annotations(page: &Page, container: &mut Container, config: &MarkerConfig) -> RenderReport {
    let mut report = RenderReport::default();
    if page.annotations.is_empty() {
        return report;
    }

    for annotation in &page.annotations {
        match render_one(annotation, container, config) {
            Ok(Rendered::New) => report.rendered.push(annotation.id.clone()),
            Ok(Rendered::Existing) => report.refreshed.push(annotation.id.clone()),
            Err(e) => report.skipped.push(e),
        }
    }
    container.normalize();

    debug!(
        page = %page.id,
        rendered = report.rendered.len(),
        refreshed = report.refreshed.len(),
        skipped = report.skipped.len(),
        "Rendered annotations"
    );
    report
}

enum Rendered {
    New,
    Existing,
}

fn render_one(annotation: &Annotation, container: &mut Container, config: &MarkerConfig) -> Result<Rendered, EngineError> {
    let range = annotation.range();
    let unresolvable = || EngineError::UnresolvableAddress {
        id: annotation.id.clone(),
    };

    let resolved = range::validate(container, &range.start).and(range::validate(container, &range.end));
    if resolved.is_err() || compare_boundaries(&range.start, &range.end) != Ordering::Less {
        warn!(
            annotation = %annotation.id,
            start = %annotation.start_address,
            end = %annotation.end_address,
            "Could not find nodes for annotation"
        );
        let stale = unwrap_all(container, config, &annotation.id);
        if stale > 0 {
            debug!(annotation = %annotation.id, markers = stale, "Removed stale marker of unresolvable annotation");
        }
        return Err(unresolvable());
    }

    let start_parent_is_marker = range
        .start
        .address
        .parent()
        .and_then(|parent| container.node(&parent).and_then(|node| config.marker_id(node)))
        .map(|id| id == annotation.id)
        .unwrap_or(false);
    if start_parent_is_marker || find_marker(container, config, &annotation.id).is_some() {
        for_each_marker(container, config, &annotation.id, |el| {
            config.apply_label(el, &annotation.comment)
        });
        return Ok(Rendered::Existing);
    }

    if let Some(existing) = ancestor_marker(container, config, &range.common_ancestor())
        .or_else(|| overlapping_marker(container, config, &range))
    {
        warn!(annotation = %annotation.id, existing = %existing, "Attempted to wrap an existing highlight");
        return Err(EngineError::OverlappingSelection { existing });
    }

    if let Err(e) = surround(container, &range, config.build(annotation)) {
        error!(annotation = %annotation.id, "Could not wrap annotation: {}", e);
        return Err(EngineError::StructuralWrapFailure(e));
    }
    container.normalize();
    Ok(Rendered::New)
}

/// Remove an annotation and unwrap its marker in place.
///
/// Returns the removed record, or `None` if the page has no such id.
pub fn delete_annotation(
    page: &mut Page,
    container: &mut Container,
    id: &str,
    config: &MarkerConfig,
) -> Option<Annotation> {
    let Some(annotation) = page.remove_annotation(id) else {
        debug!("{}", EngineError::MissingPageOrPageData(id.to_string()));
        return None;
    };
    let unwrapped = unwrap_all(container, config, id);
    debug!(annotation = %id, markers = unwrapped, "Deleted annotation");
    Some(annotation)
}

/// Unwrap every marker carrying `id`; returns how many were removed
fn unwrap_all(container: &mut Container, config: &MarkerConfig, id: &str) -> usize {
    let mut unwrapped = 0;
    while let Some(address) = find_marker(container, config, id) {
        if !unwrap_marker(container, config, &address) {
            break;
        }
        unwrapped += 1;
    }
    unwrapped
}

/// Finish an edit session: keep the edited markup as the page content,
/// then rebuild every marker from the stored addresses.
pub fn reconcile_after_edit(page: &mut Page, container: &mut Container, config: &MarkerConfig) -> RenderReport {
    page.set_content(container.inner_html());
    let stripped = strip_markers(container, config);
    debug!(page = %page.id, stripped, "Stripped markers after edit");
    render_annotations(page, container, config)
}

/// Unwrap markers whose id has no record on `page`; returns how many were removed.
///
/// Content saved after an edit keeps its markers, so a marker can outlive
/// the annotation it was drawn for.
pub fn strip_orphan_markers(page: &Page, container: &mut Container, config: &MarkerConfig) -> usize {
    let mut removed = 0;
    loop {
        let orphan = find_markers(container, config)
            .into_iter()
            .find(|(_, id)| page.find_annotation(id).is_none());
        let Some((address, id)) = orphan else {
            break;
        };
        if !unwrap_marker(container, config, &address) {
            break;
        }
        debug!(marker = %id, "Removed marker without annotation");
        removed += 1;
    }
    removed
}

/// Change the color of an annotation and of its marker; false if the id is unknown
pub fn change_color(
    page: &mut Page,
    container: &mut Container,
    id: &str,
    color: HighlightColor,
    config: &MarkerConfig,
) -> bool {
    let Some(annotation) = page.find_annotation_mut(id) else {
        debug!("{}", EngineError::MissingPageOrPageData(id.to_string()));
        return false;
    };
    let previous = annotation.color;
    annotation.color = color;
    for_each_marker(container, config, id, |el| {
        el.remove_class(previous.as_str());
        el.add_class(color.as_str());
    });
    debug!(annotation = %id, "Recolored {} -> {}", previous, color);
    true
}

/// Set the comment of an annotation and its marker label; false if the id is unknown
pub fn set_comment(
    page: &mut Page,
    container: &mut Container,
    id: &str,
    comment: &str,
    config: &MarkerConfig,
) -> bool {
    let Some(annotation) = page.find_annotation_mut(id) else {
        debug!("{}", EngineError::MissingPageOrPageData(id.to_string()));
        return false;
    };
    annotation.comment = comment.to_string();
    for_each_marker(container, config, id, |el| config.apply_label(el, comment));
    true
}
