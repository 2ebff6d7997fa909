pub mod annotations;
pub mod error;
pub mod offset;
pub mod render;
pub mod templates;
pub mod versions;

pub use annotations::{AnchorStatus, AnnotationStore};
pub use error::{AnnotationError, VersionError};
pub use offset::{DomPoint, LiveSelection, MissReason, OffsetMapper, SelectionMapping};
pub use render::{NodeId, NodeKind, RenderTree};
pub use templates::{ProgrammingLanguage, QuickStart};
pub use versions::{ArtifactVersionStore, Direction, SaveState};
