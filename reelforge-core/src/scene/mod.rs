mod kind;
mod raw;
mod resolved;
pub mod text;

pub use kind::{SceneKind, SceneType};
pub use raw::{
    EXPLICIT_MEDIA_KEYS, PropertyBag, RawScene, Transition, has_explicit_media,
};
pub use resolved::ResolvedScene;

use serde::{Deserialize, Serialize};

/// One subtitle line spanning exactly one scene, `[start_frame, end_frame)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleCue {
    pub text: String,
    pub start_frame: u32,
    pub end_frame: u32,
}
