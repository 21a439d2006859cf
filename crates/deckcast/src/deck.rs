use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Slide identifier: a number, or a bare token such as `video` for the demo clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum SlideId {
    Number(u32),
    Token(String),
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideId::Number(n) => write!(f, "{n}"),
            SlideId::Token(t) => write!(f, "{t}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Image,
    Video,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartSegment {
    pub label: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub center: Option<PathBuf>,
    pub segments: Vec<ChartSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCard {
    pub image: PathBuf,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhyThem {
    #[serde(default)]
    pub image: Option<PathBuf>,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
}

/// A pricing plan feature: either plain text or text with a disabled flag.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Feature {
    Plain(String),
    Detailed {
        text: String,
        #[serde(default)]
        disabled: bool,
    },
}

impl Feature {
    pub fn text(&self) -> &str {
        match self {
            Feature::Plain(s) => s,
            Feature::Detailed { text, .. } => text,
        }
    }

    pub fn disabled(&self) -> bool {
        matches!(self, Feature::Detailed { disabled: true, .. })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub credits: Option<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pricing {
    pub who_pays: String,
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Competitor {
    pub name: String,
    #[serde(default)]
    pub logo: Option<PathBuf>,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub now: Vec<String>,
    #[serde(default)]
    pub next: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slide {
    pub id: SlideId,

    #[serde(default)]
    pub image: Option<PathBuf>,

    #[serde(default)]
    pub video: Option<PathBuf>,

    /// Clip length in seconds. Unknown length disables end-of-clip auto-advance.
    #[serde(default)]
    pub video_duration_secs: Option<f32>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Marks a slide as multi-step in the presenter overview even when it
    /// carries no secondary blocks.
    #[serde(default)]
    pub stepped: bool,

    #[serde(default)]
    pub top_messages: Vec<String>,

    #[serde(default)]
    pub tools: Vec<PathBuf>,

    #[serde(default)]
    pub chart: Option<Chart>,

    #[serde(default)]
    pub users: Vec<UserCard>,

    #[serde(default)]
    pub why_them: Option<WhyThem>,

    #[serde(default)]
    pub pricing: Option<Pricing>,

    #[serde(default)]
    pub competitors: Vec<Competitor>,

    #[serde(default)]
    pub timeline: Option<Timeline>,

    #[serde(default)]
    pub founder: Vec<String>,
}

impl Slide {
    pub fn kind(&self) -> SlideKind {
        if self.video.is_some() {
            SlideKind::Video
        } else {
            SlideKind::Image
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// True if the slide carries any second-layer content block.
    pub fn has_secondary(&self) -> bool {
        !self.top_messages.is_empty()
            || !self.tools.is_empty()
            || self.chart.is_some()
            || !self.users.is_empty()
            || self.pricing.is_some()
            || !self.competitors.is_empty()
            || self.timeline.is_some()
            || !self.founder.is_empty()
    }

    /// True only for slides with a third disclosure layer.
    pub fn has_tertiary(&self) -> bool {
        self.why_them.is_some()
    }

    /// Whether the presenter overview should mark this slide as having
    /// further reveal steps.
    pub fn has_more_steps(&self) -> bool {
        self.stepped || self.has_secondary() || self.has_tertiary()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeckMeta {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub venue: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub byline: Option<String>,
}

/// An ordered, immutable slide catalog loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub meta: DeckMeta,
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn from_str(content: &str) -> Result<Self> {
        let deck: Deck = serde_yaml::from_str(content)?;
        if deck.slides.is_empty() {
            anyhow::bail!("deck has no slides");
        }
        Ok(deck)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        Self::from_str(&content)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_deck_parses() {
        let content = include_str!("../../../sample-decks/demo.yaml");
        let deck = Deck::from_str(content).unwrap();
        assert_eq!(deck.meta.title.as_deref(), Some("Fieldray"));
        assert_eq!(deck.slides.len(), 11);
    }

    #[test]
    fn test_demo_deck_video_slide() {
        let content = include_str!("../../../sample-decks/demo.yaml");
        let deck = Deck::from_str(content).unwrap();
        let video: Vec<&Slide> = deck
            .slides
            .iter()
            .filter(|s| s.kind() == SlideKind::Video)
            .collect();
        assert_eq!(video.len(), 1);
        assert_eq!(video[0].id, SlideId::Token("video".to_string()));
        assert!(video[0].video_duration_secs.is_some());
    }

    #[test]
    fn test_demo_deck_reveal_layers() {
        let content = include_str!("../../../sample-decks/demo.yaml");
        let deck = Deck::from_str(content).unwrap();
        let tertiary: Vec<&Slide> = deck.slides.iter().filter(|s| s.has_tertiary()).collect();
        assert_eq!(tertiary.len(), 1);
        assert!(tertiary[0].has_secondary(), "why-them slide also has user cards");
        assert!(!deck.slides[0].has_more_steps());
    }

    #[test]
    fn test_numeric_and_token_ids() {
        let deck = Deck::from_str(
            "slides:\n  - id: 4\n    title: Plain\n  - id: video\n    video: demo.mp4\n",
        )
        .unwrap();
        assert_eq!(deck.slides[0].id, SlideId::Number(4));
        assert_eq!(deck.slides[1].id, SlideId::Token("video".to_string()));
        assert_eq!(deck.slides[1].kind(), SlideKind::Video);
    }

    #[test]
    fn test_secondary_detection() {
        let deck = Deck::from_str(
            "slides:\n  - id: 1\n    top_messages: [one, two]\n  - id: 2\n    title: Bare\n",
        )
        .unwrap();
        assert!(deck.slides[0].has_secondary());
        assert!(!deck.slides[0].has_tertiary());
        assert!(!deck.slides[1].has_secondary());
    }

    #[test]
    fn test_feature_forms() {
        let deck = Deck::from_str(
            "slides:\n  - id: 1\n    pricing:\n      who_pays: Teams\n      plans:\n        - name: Free\n          price: \"0\"\n          features:\n            - Everything basic\n            - text: Advanced export\n              disabled: true\n",
        )
        .unwrap();
        let plan = &deck.slides[0].pricing.as_ref().unwrap().plans[0];
        assert_eq!(plan.features[0].text(), "Everything basic");
        assert!(!plan.features[0].disabled());
        assert!(plan.features[1].disabled());
    }

    #[test]
    fn test_empty_deck_rejected() {
        assert!(Deck::from_str("slides: []").is_err());
    }

    #[test]
    fn test_stepped_flag_marks_more_steps() {
        let deck =
            Deck::from_str("slides:\n  - id: 1\n    stepped: true\n    title: Pipeline\n").unwrap();
        assert!(deck.slides[0].has_more_steps());
        assert!(!deck.slides[0].has_secondary());
    }
}
