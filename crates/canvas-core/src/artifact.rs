use serde::{Deserialize, Serialize};

use crate::ids::ArtifactId;

/// The two shapes a content version can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Code,
    Text,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Kind-specific body of a version. Serialized with a `"type"` tag so a
/// version reads `{"index":1,"type":"code","title":..,"language":..,"code":..}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPayload {
    Code {
        language: String,
        code: String,
    },
    Text {
        #[serde(rename = "fullMarkdown")]
        full_markdown: String,
    },
}

impl ContentPayload {
    pub fn code(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Code {
            language: language.into(),
            code: code.into(),
        }
    }

    pub fn text(full_markdown: impl Into<String>) -> Self {
        Self::Text {
            full_markdown: full_markdown.into(),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Code { .. } => ContentKind::Code,
            Self::Text { .. } => ContentKind::Text,
        }
    }

    /// The plain text every offset is measured against.
    pub fn canonical_text(&self) -> &str {
        match self {
            Self::Code { code, .. } => code,
            Self::Text { full_markdown } => full_markdown,
        }
    }
}

/// One snapshot of an artifact. `index` is its identity, not its position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub index: u32,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub payload: ContentPayload,
}

impl ContentVersion {
    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }

    pub fn canonical_text(&self) -> &str {
        self.payload.canonical_text()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ArtifactId>,
    #[serde(default)]
    pub title: String,
    pub contents: Vec<ContentVersion>,
    pub current_index: u32,
}

/// Ways a snapshot can break the one-current-version invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactViolation {
    #[error("artifact has no versions")]
    Empty,
    #[error("duplicate version index {0}")]
    DuplicateIndex(u32),
    #[error("current index {0} does not match any version")]
    DanglingCurrent(u32),
}

impl Artifact {
    /// A fresh artifact whose only version is current.
    pub fn with_first_version(title: impl Into<String>, version: ContentVersion) -> Self {
        let current_index = version.index;
        Self {
            id: None,
            title: title.into(),
            contents: vec![version],
            current_index,
        }
    }

    /// Check that `current_index` names exactly one existing version.
    pub fn validate(&self) -> Result<(), ArtifactViolation> {
        if self.contents.is_empty() {
            return Err(ArtifactViolation::Empty);
        }
        let mut seen = std::collections::HashSet::with_capacity(self.contents.len());
        for version in &self.contents {
            if !seen.insert(version.index) {
                return Err(ArtifactViolation::DuplicateIndex(version.index));
            }
        }
        if !seen.contains(&self.current_index) {
            return Err(ArtifactViolation::DanglingCurrent(self.current_index));
        }
        Ok(())
    }

    pub fn version(&self, index: u32) -> Option<&ContentVersion> {
        self.contents.iter().find(|v| v.index == index)
    }

    pub fn current(&self) -> Option<&ContentVersion> {
        self.version(self.current_index)
    }

    pub fn current_mut(&mut self) -> Option<&mut ContentVersion> {
        let index = self.current_index;
        self.contents.iter_mut().find(|v| v.index == index)
    }

    /// Version indices in ascending order.
    pub fn indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self.contents.iter().map(|v| v.index).collect();
        indices.sort_unstable();
        indices
    }

    pub fn max_index(&self) -> Option<u32> {
        self.contents.iter().map(|v| v.index).max()
    }

    /// `(language, code)` of the current version if it is code.
    pub fn current_code(&self) -> Option<(&str, &str)> {
        match &self.current()?.payload {
            ContentPayload::Code { language, code } => Some((language, code)),
            ContentPayload::Text { .. } => None,
        }
    }

    /// Markdown of the current version if it is text.
    pub fn current_markdown(&self) -> Option<&str> {
        match &self.current()?.payload {
            ContentPayload::Text { full_markdown } => Some(full_markdown),
            ContentPayload::Code { .. } => None,
        }
    }
}
