// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexicon-based sentiment scoring.
//!
//! This is intentionally a rough signal used to weight memories, not a
//! replacement for a full sentiment model. Output mirrors the familiar
//! four-score shape: positive/negative/neutral fractions plus a compound
//! polarity in [-1, 1] normalized with `s / sqrt(s^2 + 15)`.

use kioku_core::EmotionAnalysis;

const POSITIVE_WORDS: &[&str] = &[
    "great", "love", "excited", "happy", "amazing", "solved", "success",
    "excellent", "wonderful", "fantastic", "glad", "pleased", "proud",
    "brilliant", "perfect", "works", "fixed", "done", "achieved", "helpful",
    "thanks", "awesome", "enjoy", "like", "good", "nice", "yes",
];

const NEGATIVE_WORDS: &[&str] = &[
    "frustrated", "confused", "error", "failed", "worried", "stuck",
    "broken", "terrible", "awful", "wrong", "bad", "hate", "annoying",
    "difficult", "struggle", "issue", "bug", "crash", "problem",
    "cannot", "unable", "fail", "loss", "lost", "sad", "angry",
];

const NEGATIONS: &[&str] = &["not", "no", "never", "without"];

/// Normalization constant from the VADER compound-score formula.
const NORM_ALPHA: f32 = 15.0;

/// Score `text` for sentiment polarity.
///
/// Returns the all-neutral zero-weight result for empty or
/// whitespace-only input. Never errors.
pub fn analyze_emotion(text: &str) -> EmotionAnalysis {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return EmotionAnalysis::neutral_default();
    }

    let mut valence: f32 = 0.0;
    let mut positive_hits = 0usize;
    let mut negative_hits = 0usize;

    for (i, word) in words.iter().enumerate() {
        // 2-word lookback for negation so "not a problem" scores positively.
        let negated = (i > 0 && NEGATIONS.contains(&words[i - 1]))
            || (i > 1 && NEGATIONS.contains(&words[i - 2]));

        if POSITIVE_WORDS.contains(word) {
            if negated {
                valence -= 0.5;
                negative_hits += 1;
            } else {
                valence += 1.0;
                positive_hits += 1;
            }
        } else if NEGATIVE_WORDS.contains(word) {
            if negated {
                valence += 0.5;
                positive_hits += 1;
            } else {
                valence -= 1.0;
                negative_hits += 1;
            }
        }
    }

    // Exclamation marks amplify whatever polarity is present.
    let exclamations = text.chars().filter(|&c| c == '!').count() as f32;
    if valence > 0.0 {
        valence += (exclamations * 0.25).min(1.0);
    } else if valence < 0.0 {
        valence -= (exclamations * 0.25).min(1.0);
    }

    let total = words.len() as f32;
    let positive = (positive_hits as f32 / total).min(1.0);
    let negative = (negative_hits as f32 / total).min(1.0);
    let neutral = (1.0 - positive - negative).max(0.0);
    let compound = valence / (valence * valence + NORM_ALPHA).sqrt();

    EmotionAnalysis {
        positive,
        negative,
        neutral,
        compound,
        emotion_weight: compound.abs(),
    }
}
