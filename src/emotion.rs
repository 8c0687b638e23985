//! The closed set of emotion labels and the static text/colour tables keyed by them.
//!
//! Each table is an exhaustive `match`, so a label without an entry does not compile.

/// Emotion categories in the classifier's output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Emotion::Happy => "😊",
            Emotion::Sad => "😢",
            Emotion::Angry => "😠",
            Emotion::Fear => "😨",
            Emotion::Disgust => "🤢",
            Emotion::Neutral => "😐",
            Emotion::Surprise => "😲",
        }
    }

    /// CSS background colour for the result card.
    pub fn theme_color(self) -> &'static str {
        match self {
            Emotion::Happy => "#FFF9C4",
            Emotion::Sad => "#BBDEFB",
            Emotion::Angry => "#FFCDD2",
            Emotion::Fear => "#E1BEE7",
            Emotion::Disgust => "#C8E6C9",
            Emotion::Neutral => "#EEEEEE",
            Emotion::Surprise => "#FFE0B2",
        }
    }

    pub fn quote(self) -> &'static str {
        match self {
            Emotion::Happy => "Happiness comes from your actions.",
            Emotion::Sad => "Tough times don’t last.",
            Emotion::Angry => "Anger harms the holder.",
            Emotion::Fear => "Fear is temporary.",
            Emotion::Disgust => "Protect your peace.",
            Emotion::Neutral => "Calm brings clarity.",
            Emotion::Surprise => "Unexpected can be good.",
        }
    }

    pub fn tip(self) -> &'static str {
        match self {
            Emotion::Happy => "Share positivity.",
            Emotion::Sad => "Talk to someone you trust.",
            Emotion::Angry => "Pause and breathe.",
            Emotion::Fear => "Face fears slowly.",
            Emotion::Disgust => "Practice self-care.",
            Emotion::Neutral => "Reflect and recharge.",
            Emotion::Surprise => "Stay open-minded.",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_label_order_matches_classifier() {
        let labels: Vec<_> = Emotion::ALL.iter().map(|e| e.label()).collect();
        assert_eq!(
            labels,
            ["angry", "disgust", "fear", "happy", "neutral", "sad", "surprise"]
        );
        assert_eq!(Emotion::from_index(3), Some(Emotion::Happy));
        assert_eq!(Emotion::from_index(7), None);
    }

    #[test]
    fn test_every_label_has_metadata() {
        for e in Emotion::ALL {
            assert!(!e.emoji().is_empty(), "{} has no emoji", e);
            assert!(!e.quote().is_empty(), "{} has no quote", e);
            assert!(!e.tip().is_empty(), "{} has no tip", e);

            let color = e.theme_color();
            assert_eq!(color.len(), 7, "{} theme color {}", e, color);
            assert!(color.starts_with('#'));
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_tables_have_one_entry_per_label() {
        let quotes: HashSet<_> = Emotion::ALL.iter().map(|e| e.quote()).collect();
        let tips: HashSet<_> = Emotion::ALL.iter().map(|e| e.tip()).collect();
        let emojis: HashSet<_> = Emotion::ALL.iter().map(|e| e.emoji()).collect();
        let colors: HashSet<_> = Emotion::ALL.iter().map(|e| e.theme_color()).collect();
        assert_eq!(quotes.len(), 7);
        assert_eq!(tips.len(), 7);
        assert_eq!(emojis.len(), 7);
        assert_eq!(colors.len(), 7);
    }
}
