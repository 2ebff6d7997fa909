use tracing::debug;

use canvas_core::artifact::{Artifact, ContentPayload, ContentVersion};

use crate::error::VersionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveState {
    #[default]
    Saved,
    Unsaved,
}

/// Versions of the live artifact and which one is current.
///
/// Any content mutation flips the store to [`SaveState::Unsaved`]; only
/// [`mark_saved`](Self::mark_saved) flips it back. Moving the current
/// pointer is not a content mutation.
#[derive(Clone, Debug, Default)]
pub struct ArtifactVersionStore {
    artifact: Option<Artifact>,
    save_state: SaveState,
}

impl ArtifactVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted artifact. The result counts as saved.
    pub fn seed(&mut self, artifact: Option<Artifact>) -> Result<(), VersionError> {
        if let Some(a) = &artifact {
            a.validate()?;
        }
        self.artifact = artifact;
        self.save_state = SaveState::Saved;
        Ok(())
    }

    /// Replace the whole artifact with a snapshot from the stream.
    pub fn replace(&mut self, mut snapshot: Artifact) -> Result<(), VersionError> {
        snapshot.validate()?;
        if snapshot.id.is_none() {
            snapshot.id = self.artifact.as_ref().and_then(|a| a.id.clone());
        }
        debug!(
            versions = snapshot.contents.len(),
            current = snapshot.current_index,
            "artifact replaced"
        );
        self.artifact = Some(snapshot);
        self.save_state = SaveState::Unsaved;
        Ok(())
    }

    /// Append a version with the next index and make it current. Creates the
    /// artifact if there is none yet.
    pub fn create_version(
        &mut self,
        payload: ContentPayload,
        title: &str,
    ) -> Result<&ContentVersion, VersionError> {
        let index = match self.artifact.as_ref().and_then(Artifact::max_index) {
            Some(max) => max.checked_add(1).ok_or(VersionError::IndexExhausted)?,
            None => 1,
        };
        let version = ContentVersion {
            index,
            title: title.to_owned(),
            payload,
        };
        self.save_state = SaveState::Unsaved;
        let artifact = match self.artifact.take() {
            Some(mut artifact) => {
                artifact.contents.push(version);
                artifact.current_index = index;
                artifact
            }
            None => Artifact::with_first_version(title, version),
        };
        let artifact = self.artifact.insert(artifact);
        Ok(&artifact.contents[artifact.contents.len() - 1])
    }

    /// Replace the current version's payload. Kinds must match.
    pub fn update_current(&mut self, payload: ContentPayload) -> Result<(), VersionError> {
        let current = self
            .artifact
            .as_mut()
            .ok_or(VersionError::NoArtifact)?
            .current_mut()
            .ok_or(VersionError::NoArtifact)?;
        if current.kind() != payload.kind() {
            return Err(VersionError::TypeMismatch {
                expected: current.kind(),
                found: payload.kind(),
            });
        }
        current.payload = payload;
        self.save_state = SaveState::Unsaved;
        Ok(())
    }

    /// Step to the adjacent version by index order. Returns false at either
    /// end; never wraps.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let Some(artifact) = self.artifact.as_mut() else {
            return false;
        };
        let indices = artifact.indices();
        let Some(pos) = indices.iter().position(|i| *i == artifact.current_index) else {
            return false;
        };
        let target = match direction {
            Direction::Previous => pos.checked_sub(1),
            Direction::Next => (pos + 1 < indices.len()).then_some(pos + 1),
        };
        match target {
            Some(t) => {
                artifact.current_index = indices[t];
                true
            }
            None => false,
        }
    }

    pub fn select_version(&mut self, index: u32) -> Result<(), VersionError> {
        let artifact = self.artifact.as_mut().ok_or(VersionError::NoArtifact)?;
        if artifact.version(index).is_none() {
            return Err(VersionError::VersionNotFound(index));
        }
        artifact.current_index = index;
        Ok(())
    }

    pub fn has_previous(&self) -> bool {
        self.position().is_some_and(|(pos, _)| pos > 0)
    }

    pub fn has_next(&self) -> bool {
        self.position().is_some_and(|(pos, len)| pos + 1 < len)
    }

    fn position(&self) -> Option<(usize, usize)> {
        let artifact = self.artifact.as_ref()?;
        let indices = artifact.indices();
        let pos = indices.iter().position(|i| *i == artifact.current_index)?;
        Some((pos, indices.len()))
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn current(&self) -> Option<&ContentVersion> {
        self.artifact.as_ref()?.current()
    }

    pub fn current_content(&self) -> Option<&ContentPayload> {
        self.current().map(|v| &v.payload)
    }

    pub fn current_code(&self) -> Option<(&str, &str)> {
        self.artifact.as_ref()?.current_code()
    }

    pub fn current_markdown(&self) -> Option<&str> {
        self.artifact.as_ref()?.current_markdown()
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn is_saved(&self) -> bool {
        self.save_state == SaveState::Saved
    }

    pub fn mark_saved(&mut self) {
        self.save_state = SaveState::Saved;
    }

    pub fn clear(&mut self) {
        self.artifact = None;
        self.save_state = SaveState::Saved;
    }
}
