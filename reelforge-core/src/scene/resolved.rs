use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use super::kind::SceneKind;
use super::raw::{PropertyBag, Transition};
use crate::media::{MediaKind, ResolvedMedia};

/// A scene ready for the renderer. Built once per enrichment pass and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScene {
    pub kind: SceneKind,
    pub duration_in_frames: u32,
    pub text: Option<String>,
    /// Public URL of the cached narration file.
    pub audio: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub points: Vec<String>,
    pub items: Vec<Value>,
    pub transition: Option<Transition>,
    pub media: Option<ResolvedMedia>,
    /// Type-specific and pass-through properties.
    pub props: PropertyBag,
}

impl ResolvedScene {
    /// Narration text that should surface as a subtitle cue.
    pub fn caption(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Flat renderer props: `type`, `durationInFrames`, the common fields
    /// and resolved media written to the slot this kind reads.
    pub fn to_props(&self) -> PropertyBag {
        let mut out = self.props.clone();
        out.insert("type".into(), json!(self.kind.as_str()));
        out.insert("durationInFrames".into(), json!(self.duration_in_frames));

        let strings = [
            ("text", &self.text),
            ("audio", &self.audio),
            ("title", &self.title),
            ("subtitle", &self.subtitle),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                out.insert(key.into(), json!(value));
            }
        }
        if !self.points.is_empty() {
            out.insert("points".into(), json!(self.points));
        }
        if !self.items.is_empty() {
            out.insert("items".into(), Value::Array(self.items.clone()));
        }
        if let Some(transition) = self.transition {
            out.insert("transition".into(), json!(transition));
        }
        if let Some(media) = &self.media {
            place_media(&mut out, self.kind, media);
        }
        out
    }
}

fn place_media(out: &mut PropertyBag, kind: SceneKind, media: &ResolvedMedia) {
    let media_type = match media.kind {
        MediaKind::Video => "video",
        MediaKind::Image => "image",
    };
    match kind {
        SceneKind::CaptionedVideo | SceneKind::PhoneMockup => {
            out.insert("src".into(), json!(media.url));
            out.insert("mediaType".into(), json!(media_type));
        }
        SceneKind::SmartExplainer if media.kind == MediaKind::Image => {
            out.insert("image".into(), json!(media.url));
        }
        _ => {
            let key = match media.kind {
                MediaKind::Video => "backgroundVideo",
                MediaKind::Image => "backgroundImage",
            };
            out.insert(key.into(), json!(media.url));
        }
    }
}

impl Serialize for ResolvedScene {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_props().serialize(serializer)
    }
}
