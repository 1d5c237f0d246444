use std::fmt;
use std::str::FromStr;

pub const LOGO_AVATAR: &str = "images/amiko_logo.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emotion {
    #[default]
    Neutral,
    Sad,
    Stressed,
    Happy,
}

// Checked in order; the first group with a hit wins.
const RULES: [(Emotion, &[&str]); 3] = [
    (Emotion::Sad, &["triste", "deprim", "llor"]),
    (Emotion::Stressed, &["ansio", "estres", "nervi"]),
    (Emotion::Happy, &["feliz", "content", "bien"]),
];

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Stressed => "stressed",
            Emotion::Happy => "happy",
        }
    }

    pub fn avatar_path(&self) -> String {
        format!("images/amiko_{}.png", self.as_str())
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Emotion::Neutral),
            "sad" => Ok(Emotion::Sad),
            "stressed" => Ok(Emotion::Stressed),
            "happy" => Ok(Emotion::Happy),
            other => Err(format!("Unknown emotion: '{}'", other)),
        }
    }
}

pub fn detect_emotion(text: &str) -> Emotion {
    let lowered = text.to_lowercase();
    if lowered.is_empty() {
        return Emotion::Neutral;
    }
    RULES
        .iter()
        .find(|(_, stems)| stems.iter().any(|stem| lowered.contains(stem)))
        .map(|(emotion, _)| *emotion)
        .unwrap_or(Emotion::Neutral)
}
