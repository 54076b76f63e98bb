//! Emotion Model
//!
//! The closed set of moods that drives both engines, and a dense lookup
//! table keyed by it. Any table lookup for a missing emotion answers with the
//! `Neutral` entry; this is the documented default, never an error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the 20 fixed mood tags
///
/// Declaration order is significant: it is the cycling order for taps.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Sleepy,
    Angry,
    Curious,
    Bored,
    Scared,
    Calm,
    Love,
    Excited,
    Confused,
    Surprised,
    Annoyed,
    Shy,
    Proud,
    Silly,
    Determined,
    Worried,
    Playful,
}

impl Emotion {
    pub const COUNT: usize = 20;

    /// Every emotion in declaration order
    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Sleepy,
        Emotion::Angry,
        Emotion::Curious,
        Emotion::Bored,
        Emotion::Scared,
        Emotion::Calm,
        Emotion::Love,
        Emotion::Excited,
        Emotion::Confused,
        Emotion::Surprised,
        Emotion::Annoyed,
        Emotion::Shy,
        Emotion::Proud,
        Emotion::Silly,
        Emotion::Determined,
        Emotion::Worried,
        Emotion::Playful,
    ];

    /// Position in declaration order
    pub fn index(self) -> usize {
        self as usize
    }

    /// The following emotion, wrapping from the last back to `Neutral`
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Sleepy => "sleepy",
            Emotion::Angry => "angry",
            Emotion::Curious => "curious",
            Emotion::Bored => "bored",
            Emotion::Scared => "scared",
            Emotion::Calm => "calm",
            Emotion::Love => "love",
            Emotion::Excited => "excited",
            Emotion::Confused => "confused",
            Emotion::Surprised => "surprised",
            Emotion::Annoyed => "annoyed",
            Emotion::Shy => "shy",
            Emotion::Proud => "proud",
            Emotion::Silly => "silly",
            Emotion::Determined => "determined",
            Emotion::Worried => "worried",
            Emotion::Playful => "playful",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no emotion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown emotion: {0:?}")]
pub struct ParseEmotionError(pub String);

impl FromStr for Emotion {
    type Err = ParseEmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseEmotionError(s.to_string()))
    }
}

/// Per-emotion lookup table with a `Neutral` fallback
///
/// The neutral entry is stored separately so a table can never be missing it.
#[derive(Debug, Clone)]
pub struct EmotionTable<T> {
    neutral: T,
    entries: [Option<T>; Emotion::COUNT],
}

impl<T> EmotionTable<T> {
    /// Build a complete table, one entry per emotion
    pub fn full(mut make: impl FnMut(Emotion) -> T) -> Self {
        let neutral = make(Emotion::Neutral);
        let entries = core::array::from_fn(|i| {
            let emotion = Emotion::ALL[i];
            (emotion != Emotion::Neutral).then(|| make(emotion))
        });
        Self { neutral, entries }
    }

    /// Build a sparse table; emotions not listed answer with `neutral`
    pub fn partial(neutral: T, explicit: impl IntoIterator<Item = (Emotion, T)>) -> Self {
        let mut entries: [Option<T>; Emotion::COUNT] = core::array::from_fn(|_| None);
        let mut neutral = neutral;
        for (emotion, value) in explicit {
            if emotion == Emotion::Neutral {
                neutral = value;
            } else {
                entries[emotion.index()] = Some(value);
            }
        }
        Self { neutral, entries }
    }

    /// Entry for `emotion`, or the neutral entry when it has none
    pub fn get(&self, emotion: Emotion) -> &T {
        self.entries[emotion.index()]
            .as_ref()
            .unwrap_or(&self.neutral)
    }

    /// Whether `emotion` has its own entry
    pub fn contains(&self, emotion: Emotion) -> bool {
        emotion == Emotion::Neutral || self.entries[emotion.index()].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_in_declaration_order() {
        assert_eq!(Emotion::ALL.len(), 20);
        for (i, emotion) in Emotion::ALL.iter().enumerate() {
            assert_eq!(emotion.index(), i);
        }
        assert_eq!(Emotion::ALL[0], Emotion::Neutral);
        assert_eq!(Emotion::ALL[19], Emotion::Playful);
    }

    #[test]
    fn test_next_wraps() {
        assert_eq!(Emotion::Neutral.next(), Emotion::Happy);
        assert_eq!(Emotion::Worried.next(), Emotion::Playful);
        assert_eq!(Emotion::Playful.next(), Emotion::Neutral);

        // A full cycle visits every emotion once
        let mut e = Emotion::Neutral;
        for _ in 0..Emotion::COUNT {
            e = e.next();
        }
        assert_eq!(e, Emotion::Neutral);
    }

    #[test]
    fn test_parse_and_display() {
        for emotion in Emotion::ALL {
            let parsed: Emotion = emotion.to_string().parse().unwrap();
            assert_eq!(parsed, emotion);
        }
        assert_eq!(" ANGRY ".parse::<Emotion>(), Ok(Emotion::Angry));
        assert_eq!(
            "grumpy".parse::<Emotion>(),
            Err(ParseEmotionError("grumpy".to_string()))
        );
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Emotion::Determined).unwrap();
        assert_eq!(json, "\"determined\"");
        let back: Emotion = serde_json::from_str("\"shy\"").unwrap();
        assert_eq!(back, Emotion::Shy);
    }

    #[test]
    fn test_full_table_has_every_entry() {
        let table = EmotionTable::full(|e| e.index() * 10);
        for emotion in Emotion::ALL {
            assert!(table.contains(emotion));
            assert_eq!(*table.get(emotion), emotion.index() * 10);
        }
    }

    #[test]
    fn test_partial_table_falls_back_to_neutral() {
        let table = EmotionTable::partial("neutral", [(Emotion::Happy, "happy")]);
        assert_eq!(*table.get(Emotion::Happy), "happy");
        for emotion in Emotion::ALL {
            if emotion != Emotion::Happy {
                assert_eq!(*table.get(emotion), "neutral");
            }
        }
        assert!(table.contains(Emotion::Neutral));
        assert!(!table.contains(Emotion::Sad));
    }

    #[test]
    fn test_partial_table_neutral_override() {
        let table = EmotionTable::partial(0, [(Emotion::Neutral, 7)]);
        assert_eq!(*table.get(Emotion::Calm), 7);
    }
}
