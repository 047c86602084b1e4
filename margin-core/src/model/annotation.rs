use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::dom::{Boundary, TreeRange};

/// Highlight color palette
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
}

impl HighlightColor {
    pub fn all() -> &'static [HighlightColor] {
        &[
            HighlightColor::Yellow,
            HighlightColor::Green,
            HighlightColor::Blue,
            HighlightColor::Pink,
        ]
    }

    /// Class name carried by markers of this color
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HighlightColor::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown highlight color: {}", s))
    }
}

/// A highlight anchored by two positional addresses.
///
/// Field aliases accept the `startContainerPath`/`endContainerPath` names of
/// pages saved by the browser version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub color: HighlightColor,
    #[serde(default)]
    pub comment: String,
    #[serde(alias = "startContainerPath")]
    pub start_address: Address,
    pub start_offset: usize,
    #[serde(alias = "endContainerPath")]
    pub end_address: Address,
    pub end_offset: usize,
}

impl Annotation {
    pub fn new(id: String, color: HighlightColor, range: &TreeRange) -> Self {
        Self {
            id,
            color,
            comment: String::new(),
            start_address: range.start.address.clone(),
            start_offset: range.start.offset,
            end_address: range.end.address.clone(),
            end_offset: range.end.offset,
        }
    }

    pub fn start(&self) -> Boundary {
        Boundary::new(self.start_address.clone(), self.start_offset)
    }

    pub fn end(&self) -> Boundary {
        Boundary::new(self.end_address.clone(), self.end_offset)
    }

    pub fn range(&self) -> TreeRange {
        TreeRange::new(self.start(), self.end())
    }
}

/// Wall-clock millisecond ids, bumped when the clock has not advanced
#[derive(Debug, Default)]
pub struct AnnotationIdGenerator {
    last: i64,
}

impl AnnotationIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last = if now > self.last { now } else { self.last + 1 };
        self.last.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut ids = AnnotationIdGenerator::new();
        let a: i64 = ids.next_id().parse().unwrap();
        let b: i64 = ids.next_id().parse().unwrap();
        let c: i64 = ids.next_id().parse().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_color_parse() {
        assert_eq!("Pink".parse::<HighlightColor>(), Ok(HighlightColor::Pink));
        assert!("mauve".parse::<HighlightColor>().is_err());
        assert_eq!(HighlightColor::default(), HighlightColor::Yellow);
    }

    #[test]
    fn test_annotation_json_shape() {
        let range = TreeRange::new(
            Boundary::new(Address::new(vec![0, 0]), 12),
            Boundary::new(Address::new(vec![0, 0]), 24),
        );
        let ann = Annotation::new("1700000000000".to_string(), HighlightColor::Yellow, &range);
        let json = serde_json::to_string(&ann).unwrap();

        assert!(json.contains("\"color\":\"yellow\""));
        assert!(json.contains("\"comment\":\"\""));
        assert!(json.contains("\"startAddress\":[0,0]"));
        assert!(json.contains("\"endOffset\":24"));
    }

    #[test]
    fn test_reads_browser_field_names() {
        let json = r#"{"id":"1","color":"green","startContainerPath":[1,0],"startOffset":2,"endContainerPath":[1,0],"endOffset":5}"#;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.start_address, Address::new(vec![1, 0]));
        assert_eq!(ann.comment, "");
        assert_eq!(ann.range().end.offset, 5);
    }
}
