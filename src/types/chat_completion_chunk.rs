use serde::Deserialize;

use crate::types::ErrorDetail;

/// One `data:` event of a streaming chat completion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion identifier shared by all chunks of one reply.
    #[serde(default)]
    pub id: Option<String>,

    /// Model that produced the chunk.
    #[serde(default)]
    pub model: Option<String>,

    /// Incremental choices. Azure sends an initial chunk with none.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Set when the server reports a failure inside the stream.
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// A single choice within a [`ChatCompletionChunk`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkChoice {
    /// Choice index; the chat only requests one.
    #[serde(default)]
    pub index: u32,

    /// The incremental content.
    #[serde(default)]
    pub delta: Option<ChunkDelta>,

    /// Why generation stopped, on the last chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message content.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkDelta {
    /// Present on the first chunk only.
    #[serde(default)]
    pub role: Option<String>,

    /// Text fragment.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// The non-empty text fragment carried by the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }
}
