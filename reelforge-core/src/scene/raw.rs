use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::SceneType;

/// Open property bag for fields the pipeline does not interpret.
pub type PropertyBag = Map<String, Value>;

/// Fields that already point the renderer at a media source.
pub const EXPLICIT_MEDIA_KEYS: [&str; 7] = [
    "src",
    "videoUrl",
    "imageUrl",
    "backgroundImage",
    "backgroundVideo",
    "image",
    "coverImg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    None,
    Slide,
    Fade,
}

impl Transition {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Transition::None),
            "slide" => Some(Transition::Slide),
            "fade" => Some(Transition::Fade),
            _ => None,
        }
    }
}

/// A scene as submitted: a type tag, the handful of fields enrichment
/// reads, and everything else untouched in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScene {
    pub scene_type: SceneType,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub text: Option<String>,
    pub points: Vec<String>,
    pub items: Vec<Value>,
    pub image_query: Option<String>,
    /// Skip stock search and go straight to image generation.
    pub ai_image: bool,
    pub voice: Option<String>,
    pub audio: Option<String>,
    pub duration_in_frames: Option<u32>,
    pub transition: Option<Transition>,
    pub extra: PropertyBag,
}

impl RawScene {
    pub fn new(scene_type: SceneType) -> Self {
        Self {
            scene_type,
            title: None,
            subtitle: None,
            text: None,
            points: Vec::new(),
            items: Vec::new(),
            image_query: None,
            ai_image: false,
            voice: None,
            audio: None,
            duration_in_frames: None,
            transition: None,
            extra: PropertyBag::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Read a scene from submitted JSON. Accepts the flat shape
    /// (`{type, title, ...}`) and the nested one (`{type, props: {...}}`);
    /// flat fields win. Never fails: anything unusable becomes an unknown
    /// scene with an empty bag.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut outer) = value else {
            return Self::new(SceneType::Unknown(String::new()));
        };

        let mut fields = match outer.remove("props") {
            Some(Value::Object(props)) => props,
            _ => PropertyBag::new(),
        };
        fields.extend(outer);

        let tag = match fields.remove("type") {
            Some(Value::String(tag)) => tag,
            _ => String::new(),
        };

        let mut scene = Self::new(SceneType::parse(&tag));
        scene.title = take_string(&mut fields, "title");
        scene.subtitle = take_string(&mut fields, "subtitle");
        scene.text = take_string(&mut fields, "text");
        scene.points = take_string_list(&mut fields, "points");
        scene.items = match fields.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        scene.image_query = take_string(&mut fields, "imageQuery");
        scene.ai_image = matches!(
            fields.remove("aiImage"),
            Some(Value::Bool(true))
        );
        scene.voice = take_string(&mut fields, "voice");
        scene.audio = take_string(&mut fields, "audio");
        scene.duration_in_frames = fields
            .remove("durationInFrames")
            .and_then(|value| positive_frames(&value));
        scene.transition = fields
            .remove("transition")
            .and_then(|value| value.as_str().and_then(Transition::parse));
        scene.extra = fields;
        scene
    }

    pub fn layout(&self) -> Option<&str> {
        self.extra.get("layout").and_then(Value::as_str)
    }

    pub fn has_explicit_media(&self) -> bool {
        has_explicit_media(&self.extra)
    }

    /// Items as display strings: plain strings, or an object's `title`.
    pub fn item_labels(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Value::String(label) => Some(label.clone()),
                Value::Object(map) => {
                    map.get("title").and_then(Value::as_str).map(String::from)
                }
                _ => None,
            })
            .filter(|label| !label.trim().is_empty())
            .collect()
    }
}

/// Whether any media slot in `props` already holds a non-empty URL.
pub fn has_explicit_media(props: &PropertyBag) -> bool {
    EXPLICIT_MEDIA_KEYS.iter().any(|key| {
        props
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|url| !url.trim().is_empty())
    })
}

fn take_string(fields: &mut PropertyBag, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn take_string_list(fields: &mut PropertyBag, key: &str) -> Vec<String> {
    match fields.remove(key) {
        Some(Value::Array(values)) => values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    }
}

/// Positive whole frame counts only; numeric strings are tolerated.
fn positive_frames(value: &Value) -> Option<u32> {
    let frames = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !frames.is_finite() || frames < 1.0 || frames > f64::from(u32::MAX) {
        return None;
    }
    Some(frames.round() as u32)
}
