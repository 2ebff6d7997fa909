//! The one pending text selection of the canvas.

use canvas_core::range::TextRange;
use canvas_core::transport::HighlightedText;
use canvas_doc::SelectionMapping;

/// A non-empty range of one version's canonical text, with the text it
/// covered when it was captured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub range: TextRange,
    pub text: String,
    pub version_index: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    current: Option<Selection>,
}

impl SelectionState {
    /// Apply a mapper result. A range becomes the selection; a collapsed
    /// selection or a miss clears it.
    pub fn update(
        &mut self,
        mapping: SelectionMapping,
        canonical: &str,
        version_index: u32,
    ) -> Option<&Selection> {
        self.current = match mapping {
            SelectionMapping::Range(range) => range.slice(canonical).map(|text| Selection {
                range,
                text: text.to_owned(),
                version_index,
            }),
            SelectionMapping::Collapsed { .. } | SelectionMapping::Miss(_) => None,
        };
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Whether the selection still covers the same text of the same version.
    pub fn matches(&self, canonical: &str, version_index: u32) -> bool {
        self.current.as_ref().is_some_and(|s| {
            s.version_index == version_index && s.range.slice(canonical) == Some(s.text.as_str())
        })
    }

    pub fn highlighted(&self) -> Option<HighlightedText> {
        self.current.as_ref().map(|s| HighlightedText {
            range: s.range,
            text: s.text.clone(),
        })
    }
}
