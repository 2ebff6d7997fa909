use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// One decoded unit of the response stream.
///
/// Wire form is a JSON object tagged by `"type"`:
/// `{"type":"token","content":"He"}`, `{"type":"artifact","artifact":{..}}`
/// or `{"type":"error","message":".."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameEvent {
    Token {
        #[serde(alias = "delta")]
        content: String,
    },
    Artifact {
        artifact: Artifact,
    },
    Error {
        message: String,
    },
}

impl FrameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::Artifact { .. } => "artifact",
            Self::Error { .. } => "error",
        }
    }
}
