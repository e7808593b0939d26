//! Topic gatekeeper
//!
//! Cheap heuristic filter that rejects obviously non-musical or degenerate
//! prompts before any model call is spent on them. Deliberately conservative:
//! a prompt passes unless it both lacks every music keyword and trips one of
//! the off-topic heuristics. This is a pre-filter, not a security boundary.

use crate::config::GatekeeperRules;
use crate::core::error::PipelineError;

const REJECTION_MESSAGE: &str =
    "That doesn't look like a music request. Try describing the songs, genre, or mood you want.";

/// Prompt gatekeeper with injectable rule sets
pub struct Gatekeeper {
    rules: GatekeeperRules,
}

impl Gatekeeper {
    pub fn new(rules: GatekeeperRules) -> Self {
        Self { rules }
    }

    /// Accept or reject a raw user prompt. Pure over (rules, prompt), so the
    /// same prompt always yields the same decision.
    pub fn check(&self, prompt: &str) -> Result<(), PipelineError> {
        let normalized = prompt.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(PipelineError::InvalidPrompt(REJECTION_MESSAGE.to_string()));
        }

        if self.has_music_keyword(&normalized) {
            return Ok(());
        }

        let starts_with_opener = self
            .rules
            .question_openers
            .iter()
            .any(|opener| normalized.starts_with(opener.as_str()));

        let is_gibberish = normalized.chars().count() < self.rules.gibberish_len
            && !normalized.contains(char::is_whitespace);

        let too_short = normalized.chars().count() < self.rules.min_prompt_len;

        if starts_with_opener || is_gibberish || too_short {
            return Err(PipelineError::InvalidPrompt(REJECTION_MESSAGE.to_string()));
        }

        Ok(())
    }

    fn has_music_keyword(&self, normalized: &str) -> bool {
        self.rules
            .music_keywords
            .iter()
            .any(|kw| contains_word(normalized, kw))
    }
}

/// Keyword match on word boundaries, so "pop" does not match "popcorn"
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(idx) = haystack[start..].find(needle) {
        let at = start + idx;
        let end = at + needle.len();

        let before_ok = at == 0
            || !haystack[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());

        if before_ok && after_ok {
            return true;
        }
        start = at + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gatekeeper() -> Gatekeeper {
        Gatekeeper::new(GatekeeperRules::default())
    }

    #[test]
    fn test_accepts_music_prompts() {
        let gk = gatekeeper();
        assert!(gk.check("make me a chill playlist for studying").is_ok());
        assert!(gk.check("add some jazz tracks").is_ok());
        assert!(gk.check("lagu galau buat malam hari").is_ok());
        assert!(gk.check("energetic workout mix").is_ok());
    }

    #[test]
    fn test_rejects_generic_questions() {
        let gk = gatekeeper();
        // off-topic chatter must be rejected before any model call
        assert!(matches!(
            gk.check("tell me a joke"),
            Err(PipelineError::InvalidPrompt(_))
        ));
        assert!(gk.check("what is the capital of France").is_err());
        assert!(gk.check("how to cook pasta").is_err());
    }

    #[test]
    fn test_rejects_gibberish() {
        let gk = gatekeeper();
        assert!(gk.check("asdfghjkl").is_err());
        assert!(gk.check("xq").is_err());
        assert!(gk.check("").is_err());
    }

    #[test]
    fn test_rejects_short_keyword_free() {
        let gk = gatekeeper();
        assert!(gk.check("do stuff").is_err());
    }

    #[test]
    fn test_keyword_overrides_opener() {
        let gk = gatekeeper();
        // a question opener with a music keyword is still in-domain
        assert!(gk.check("what is a good playlist for rainy days").is_ok());
    }

    #[test]
    fn test_word_boundary_matching() {
        let gk = gatekeeper();
        // "pop" inside "popcorn" must not count as a music keyword
        assert!(gk.check("tell me about popcorn machines").is_err());
        assert!(gk.check("some pop from the 90s please").is_ok());
    }

    #[test]
    fn test_idempotence() {
        let gk = gatekeeper();
        for _ in 0..3 {
            assert!(gk.check("tell me a joke").is_err());
            assert!(gk.check("sad acoustic songs").is_ok());
        }
    }
}
