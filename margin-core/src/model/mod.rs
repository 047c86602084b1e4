pub mod annotation;
pub mod page;

pub use annotation::{Annotation, AnnotationIdGenerator, HighlightColor};
pub use page::Page;
