//! Shared domain and provider wire types.

mod media;
mod provider;

pub use media::{Artifact, ArtifactKind, MediaReference, Transcript, VideoDigest};
pub use provider::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ProviderErrorDetail,
    TranscriptionResponse,
};
