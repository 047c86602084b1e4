//! Margin Core - Platform-agnostic highlight and annotation library
//!
//! This crate provides the content tree, the annotation address and render
//! engine, and the page model for the Margin highlighter. Front-ends (the
//! terminal UI in `margin-cli`) drive it through [`Session`].

pub mod address;
pub mod cursor;
pub mod dom;
pub mod engine;
pub mod error;
pub mod export;
pub mod layout;
pub mod model;
pub mod session;
pub mod store;

pub use address::{compute_address, resolve_address, Address};
pub use cursor::CursorState;
pub use dom::{Boundary, Container, Element, Node, TreeRange};
pub use engine::{
    create_annotation, delete_annotation, reconcile_after_edit, render_annotations,
    CreateOutcome, MarkerConfig, RenderReport,
};
pub use error::{EngineError, MarkupError, RangeError};
pub use export::{digest, to_json, ExportAnnotation, ExportPage};
pub use layout::TextLayout;
pub use model::{Annotation, AnnotationIdGenerator, HighlightColor, Page};
pub use session::{Focus, Mode, Session};
pub use store::PageStore;
