use structure_agent_core::flows::{ClassificationReport, ConfirmationClassifier};

const CONFIRMATION_WORDS: &[&str] = &[
    "yes",
    "yep",
    "yeah",
    "sure",
    "ok",
    "okay",
    "confirm",
    "confirmed",
    "approved",
    "proceed",
    "run",
    "start",
];
const CONFIRMATION_PHRASES: &[&str] =
    &["sounds good", "looks good", "go ahead", "run it", "do it", "ship it", "green light"];
const CONFIRMATION_GLYPHS: &[&str] = &["\u{1f44d}", "\u{2705}", "\u{2714}\u{fe0f}", "\u{2714}"];
/// Shorthands that only count when they are the entire message, so an axis
/// edit such as `y = 2` is never read as a confirmation.
const CONFIRMATION_SHORTHANDS: &[&str] = &["y", "k"];

const DENIAL_WORDS: &[&str] = &["no", "wait", "hold", "stop", "cancel", "dont"];
const DENIAL_PHRASES: &[&str] = &["not yet", "do not"];

#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordConfirmationClassifier;

impl KeywordConfirmationClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ConfirmationClassifier for KeywordConfirmationClassifier {
    fn classify(&self, message: &str) -> ClassificationReport {
        let normalized = normalize_text(message);
        let tokens = tokenize(&normalized);
        let joined = format!(" {} ", tokens.join(" "));

        let matched_confirmation = tokens.iter().any(|token| CONFIRMATION_WORDS.contains(&token.as_str()))
            || contains_phrase(&joined, CONFIRMATION_PHRASES)
            || CONFIRMATION_GLYPHS.iter().any(|glyph| normalized.contains(glyph))
            || (tokens.len() == 1 && CONFIRMATION_SHORTHANDS.contains(&tokens[0].as_str()));
        let matched_denial = tokens.iter().any(|token| DENIAL_WORDS.contains(&token.as_str()))
            || contains_phrase(&joined, DENIAL_PHRASES);

        ClassificationReport::from_matches(matched_confirmation, matched_denial)
    }
}

fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|character| !matches!(character, '\'' | '\u{2018}' | '\u{2019}'))
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|character: char| character.is_ascii_punctuation()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(joined_tokens: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| joined_tokens.contains(&format!(" {phrase} ")))
}
