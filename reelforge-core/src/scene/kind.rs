use std::fmt;

use serde::{Deserialize, Serialize};

/// Scene types the frame renderers know how to draw.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum SceneKind {
    IntroTitle,
    KineticText,
    Comparison,
    KnowledgeCard,
    TechCode,
    LottieSticker,
    Audiogram,
    WordStream,
    SplitScreen,
    CaptionedVideo,
    PhoneMockup,
    CyberIntro,
    SmartExplainer,
    PhysicsStack,
    ThreeDText,
    ProductShowcase3D,
    DataChart,
    Gallery,
    SocialStory,
    ParticleFlow,
    PodcastAudio,
}

impl SceneKind {
    pub const ALL: [SceneKind; 21] = [
        SceneKind::IntroTitle,
        SceneKind::KineticText,
        SceneKind::Comparison,
        SceneKind::KnowledgeCard,
        SceneKind::TechCode,
        SceneKind::LottieSticker,
        SceneKind::Audiogram,
        SceneKind::WordStream,
        SceneKind::SplitScreen,
        SceneKind::CaptionedVideo,
        SceneKind::PhoneMockup,
        SceneKind::CyberIntro,
        SceneKind::SmartExplainer,
        SceneKind::PhysicsStack,
        SceneKind::ThreeDText,
        SceneKind::ProductShowcase3D,
        SceneKind::DataChart,
        SceneKind::Gallery,
        SceneKind::SocialStory,
        SceneKind::ParticleFlow,
        SceneKind::PodcastAudio,
    ];

    /// The text-only type every unrenderable scene degrades to.
    pub const FALLBACK: SceneKind = SceneKind::KineticText;

    pub fn as_str(self) -> &'static str {
        match self {
            SceneKind::IntroTitle => "IntroTitle",
            SceneKind::KineticText => "KineticText",
            SceneKind::Comparison => "Comparison",
            SceneKind::KnowledgeCard => "KnowledgeCard",
            SceneKind::TechCode => "TechCode",
            SceneKind::LottieSticker => "LottieSticker",
            SceneKind::Audiogram => "Audiogram",
            SceneKind::WordStream => "WordStream",
            SceneKind::SplitScreen => "SplitScreen",
            SceneKind::CaptionedVideo => "CaptionedVideo",
            SceneKind::PhoneMockup => "PhoneMockup",
            SceneKind::CyberIntro => "CyberIntro",
            SceneKind::SmartExplainer => "SmartExplainer",
            SceneKind::PhysicsStack => "PhysicsStack",
            SceneKind::ThreeDText => "ThreeDText",
            SceneKind::ProductShowcase3D => "ProductShowcase3D",
            SceneKind::DataChart => "DataChart",
            SceneKind::Gallery => "Gallery",
            SceneKind::SocialStory => "SocialStory",
            SceneKind::ParticleFlow => "ParticleFlow",
            SceneKind::PodcastAudio => "PodcastAudio",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Whether the renderer draws nothing useful without a media source.
    /// `SmartExplainer` only needs one for its split-image layout.
    pub fn needs_background(self, layout: Option<&str>) -> bool {
        match self {
            SceneKind::CaptionedVideo | SceneKind::PhoneMockup => true,
            SceneKind::SmartExplainer => layout == Some("SplitImage"),
            _ => false,
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scene's `type` tag: either one the renderers know, or an extension tag
/// carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneType {
    Known(SceneKind),
    Unknown(String),
}

impl SceneType {
    pub fn parse(tag: &str) -> Self {
        match SceneKind::from_tag(tag.trim()) {
            Some(kind) => SceneType::Known(kind),
            None => SceneType::Unknown(tag.to_string()),
        }
    }

    pub fn kind(&self) -> Option<SceneKind> {
        match self {
            SceneType::Known(kind) => Some(*kind),
            SceneType::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SceneType::Known(kind) => kind.as_str(),
            SceneType::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
