// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-based event classification.
//!
//! A placeholder heuristic: each category carries a keyword list, the text
//! is matched by case-insensitive substring, and the score is the fraction
//! of the list that matched. A trailing space on a keyword marks it as a
//! standalone word that must sit on word boundaries.

/// Category table in fixed declaration order.
///
/// Ties between equal scores are resolved by this order (first maximal
/// entry wins). The order itself is the documented tie-break rule, not an
/// accident of map iteration.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("question", &["what", "how", "why", "which", "when", "where", "?"]),
    ("task", &["help me", "please", "could you", "can you", "i need"]),
    ("conversation", &["hello", "hi ", "goodbye", "bye", "thank", "chat"]),
    ("information", &["tell me", "information", "details", "data", "describe"]),
    ("creative", &["write", "create", "design", "idea", "compose", "imagine"]),
    ("analysis", &["analyze", "compare", "evaluate", "assess", "explain"]),
    ("emotional", &["feel", "feeling", "mood", "happy", "sad", "worried"]),
];

/// Category assigned when nothing matches.
pub const GENERAL_CATEGORY: &str = "general";

/// Classify `text` into an event category with a confidence score.
///
/// Score per category = matched keywords / keyword-list length; the
/// winning category is the highest score, confidence capped at 1.0.
/// No match (including empty text) yields `("general", 0.5)`. Never
/// errors.
pub fn classify_event(text: &str) -> (String, f32) {
    let lower = text.to_lowercase();

    let mut best: Option<(&str, f32)> = None;
    for (category, keywords) in CATEGORIES {
        let matched = keywords.iter().filter(|k| keyword_matches(&lower, k)).count();
        if matched == 0 {
            continue;
        }
        let score = matched as f32 / keywords.len() as f32;
        // Strictly-greater keeps the first maximal entry on ties.
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((category, score));
        }
    }

    match best {
        Some((category, score)) => (category.to_string(), score.min(1.0)),
        None => (GENERAL_CATEGORY.to_string(), 0.5),
    }
}

/// Substring match, except keywords with a trailing space are matched as
/// standalone words so "hi" hits "oh hi" and "hi!" but not "this".
fn keyword_matches(lower: &str, keyword: &str) -> bool {
    match keyword.strip_suffix(' ') {
        Some(word) => lower.match_indices(word).any(|(i, _)| {
            let boundary_before = lower[..i]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric());
            let boundary_after = lower[i + word.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric());
            boundary_before && boundary_after
        }),
        None => lower.contains(keyword),
    }
}
