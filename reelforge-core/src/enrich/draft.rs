//! The per-scene builder. Each step takes the draft by value and returns
//! the next one, so steps can be exercised and reordered independently;
//! `finish` seals it into an immutable [`ResolvedScene`].

use serde_json::{Value, json};

use super::narration::NarrationAudio;
use crate::config::EnrichmentConfig;
use crate::media::ResolvedMedia;
use crate::scene::text::{
    derive_narration, fallback_words, search_phrases, short_phrases,
};
use crate::scene::{
    PropertyBag, RawScene, ResolvedScene, SceneKind, SceneType, Transition,
    has_explicit_media,
};

const DEFAULT_COLORS: [&str; 3] = ["#FFFFFF", "#FFD166", "#06D6A0"];
const DEFAULT_STACK_ITEMS: [&str; 3] = ["Step 1", "Step 2", "Step 3"];
const MAX_STACK_ITEMS: usize = 6;

#[derive(Debug, Clone)]
pub(crate) struct SceneDraft {
    scene_type: SceneType,
    title: Option<String>,
    subtitle: Option<String>,
    text: Option<String>,
    points: Vec<String>,
    items: Vec<Value>,
    /// Display labels of the submitted items, used for narration.
    item_labels: Vec<String>,
    image_query: Option<String>,
    ai_image: bool,
    voice: Option<String>,
    audio: Option<String>,
    narration_seconds: Option<f64>,
    /// Narration was attached during this pass.
    narrated: bool,
    explicit_duration: Option<u32>,
    duration: Option<u32>,
    transition: Option<Transition>,
    props: PropertyBag,
    media: Option<ResolvedMedia>,
    media_exhausted: bool,
}

impl SceneDraft {
    pub(crate) fn from_raw(raw: RawScene) -> Self {
        let item_labels = raw.item_labels();
        Self {
            scene_type: raw.scene_type,
            title: raw.title,
            subtitle: raw.subtitle,
            text: raw.text,
            points: raw.points,
            items: raw.items,
            item_labels,
            image_query: raw.image_query,
            ai_image: raw.ai_image,
            voice: raw.voice,
            audio: raw.audio,
            narration_seconds: None,
            narrated: false,
            explicit_duration: raw.duration_in_frames,
            duration: None,
            transition: raw.transition,
            props: raw.extra,
            media: None,
            media_exhausted: false,
        }
    }

    pub(crate) fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub(crate) fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub(crate) fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub(crate) fn duration(&self) -> Option<u32> {
        self.duration
    }

    pub(crate) fn wants_generated_image(&self) -> bool {
        self.ai_image
    }

    fn layout(&self) -> Option<&str> {
        self.props.get("layout").and_then(Value::as_str)
    }

    /// Step 1: fill missing narration from title, subtitle, points, items.
    pub(crate) fn with_derived_text(mut self) -> Self {
        if self.text.is_none() {
            self.text = derive_narration(
                self.title.as_deref(),
                self.subtitle.as_deref(),
                &self.points,
                &self.item_labels,
            );
        }
        self
    }

    /// Step 2: safe values for fields specific kinds cannot render without.
    pub(crate) fn with_type_defaults(mut self, config: &EnrichmentConfig) -> Self {
        let Some(kind) = self.scene_type.kind() else {
            return self;
        };
        match kind {
            SceneKind::PhysicsStack if self.items.is_empty() => {
                self.items = self
                    .stack_labels()
                    .into_iter()
                    .take(MAX_STACK_ITEMS)
                    .map(Value::String)
                    .collect();
            }
            SceneKind::ProductShowcase3D => {
                clamp_number(&mut self.props, "boxSize", 2.0, 1.0, 5.0);
                clamp_number(&mut self.props, "rotationSpeed", 1.0, 0.0, 5.0);
                default_string(&mut self.props, "environmentPreset", "city");
            }
            SceneKind::KineticText => self.ensure_word_list(config),
            SceneKind::SmartExplainer => {
                default_string(&mut self.props, "layout", "Title");
                if self.layout() == Some("BulletList") && self.points.is_empty()
                {
                    self.points = self
                        .text
                        .as_deref()
                        .map(short_phrases)
                        .unwrap_or_default();
                }
            }
            SceneKind::IntroTitle | SceneKind::CyberIntro
                if self.title.is_none() =>
            {
                self.title = self
                    .text
                    .as_deref()
                    .and_then(|text| short_phrases(text).into_iter().next());
            }
            _ => {}
        }
        self
    }

    fn stack_labels(&self) -> Vec<String> {
        if !self.points.is_empty() {
            return self.points.clone();
        }
        let from_text = self
            .text
            .as_deref()
            .map(short_phrases)
            .unwrap_or_default();
        if !from_text.is_empty() {
            return from_text;
        }
        if let Some(title) = &self.title {
            return vec![title.clone()];
        }
        DEFAULT_STACK_ITEMS.iter().map(|s| s.to_string()).collect()
    }

    fn ensure_word_list(&mut self, config: &EnrichmentConfig) {
        let has_words = self
            .props
            .get("texts")
            .and_then(Value::as_array)
            .is_some_and(|texts| !texts.is_empty());
        if !has_words {
            let words = fallback_words(
                self.title.as_deref(),
                self.subtitle.as_deref(),
                self.text.as_deref(),
                config.max_fallback_words,
                self.scene_type.as_str(),
            );
            self.props.insert("texts".into(), json!(words));
        }
        if !self.props.contains_key("colors") {
            self.props.insert("colors".into(), json!(DEFAULT_COLORS));
        }
    }

    /// Step 3: attach narration produced for this scene.
    pub(crate) fn with_narration(mut self, audio: NarrationAudio) -> Self {
        self.audio = Some(audio.url);
        self.narration_seconds = audio.seconds;
        self.narrated = true;
        self
    }

    /// Step 4: settle the frame count. Narration length wins when it was
    /// just attached, when recomputation is forced, or when no duration was
    /// given; an explicit duration survives otherwise.
    pub(crate) fn with_reconciled_duration(
        mut self,
        config: &EnrichmentConfig,
        compute_duration: bool,
    ) -> Self {
        let recompute =
            self.narrated || compute_duration || self.explicit_duration.is_none();
        let from_audio = if recompute {
            self.narration_seconds
                .and_then(|secs| config.frames_for_seconds(secs))
        } else {
            None
        };
        self.duration = Some(
            from_audio
                .or(self.explicit_duration)
                .unwrap_or(config.default_frames),
        );
        self
    }

    /// Whether step 5 should run: no media attached, and either the kind
    /// needs a background or the scene carries a search hint.
    pub(crate) fn needs_media_lookup(&self) -> bool {
        if has_explicit_media(&self.props) {
            return false;
        }
        let needs_background = self
            .scene_type
            .kind()
            .is_some_and(|kind| kind.needs_background(self.layout()));
        needs_background || self.image_query.is_some() || self.ai_image
    }

    pub(crate) fn search_phrases(&self) -> Vec<String> {
        search_phrases(
            self.image_query.as_deref(),
            self.title.as_deref(),
            self.text.as_deref(),
        )
    }

    /// Step 5 outcome: `None` means every cascade stage came up empty.
    pub(crate) fn with_media(mut self, media: Option<ResolvedMedia>) -> Self {
        self.media_exhausted = media.is_none();
        self.media = media;
        self
    }

    fn resolved_kind(&self) -> SceneKind {
        if self.media_exhausted {
            return SceneKind::FALLBACK;
        }
        match (self.scene_type.kind(), &self.media) {
            (Some(kind), _) => kind,
            (None, Some(_)) => SceneKind::CaptionedVideo,
            (None, None) => SceneKind::FALLBACK,
        }
    }

    pub(crate) fn finish(mut self, config: &EnrichmentConfig) -> ResolvedScene {
        let kind = self.resolved_kind();
        if kind == SceneKind::FALLBACK {
            self.ensure_word_list(config);
        }
        ResolvedScene {
            kind,
            duration_in_frames: self.duration.unwrap_or(config.default_frames),
            text: self.text,
            audio: self.audio,
            title: self.title,
            subtitle: self.subtitle,
            points: self.points,
            items: self.items,
            transition: self.transition,
            media: self.media,
            props: self.props,
        }
    }

    /// Last-resort scene for a pass that failed outright: media-dependent
    /// scenes become the text fallback and the duration is defaulted when
    /// missing.
    pub(crate) fn recover(mut self, config: &EnrichmentConfig) -> ResolvedScene {
        let media_dependent = !has_explicit_media(&self.props)
            && self
                .scene_type
                .kind()
                .is_none_or(|kind| kind.needs_background(self.layout()));
        self.media = None;
        self.media_exhausted = media_dependent;
        if self.duration.is_none() {
            self.duration = self.explicit_duration;
        }
        self.finish(config)
    }
}

/// Numeric field clamped into `[min, max]`; non-numeric values are replaced.
fn clamp_number(
    props: &mut PropertyBag,
    key: &str,
    default: f64,
    min: f64,
    max: f64,
) {
    let value = props
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map_or(default, |v| v.clamp(min, max));
    props.insert(key.into(), json!(value));
}

fn default_string(props: &mut PropertyBag, key: &str, default: &str) {
    let present = props
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !present {
        props.insert(key.into(), json!(default));
    }
}
