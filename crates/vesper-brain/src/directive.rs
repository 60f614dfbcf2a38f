/// Control outcome of a conversational turn. Drives orchestrator
/// transitions and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantDirective {
    Continue,
    Reset,
    Shutdown,
}

const SHUTDOWN_PHRASES: &[&str] = &[
    "goodbye",
    "shut down",
    "exit",
    "quit",
    "power off",
    "go to sleep",
];

const RESET_PHRASES: &[&str] = &[
    "reset conversation",
    "clear history",
    "start over",
    "new conversation",
];

/// Match the whole utterance against the fixed control sets,
/// case-insensitively with trailing punctuation stripped. Checked
/// before any remote call so control commands never depend on the
/// reasoning service being reachable. Phrases embedded mid-sentence
/// are deliberately not matched.
pub fn parse_control(text: &str) -> Option<AssistantDirective> {
    let normalized = normalize(text);
    if SHUTDOWN_PHRASES.contains(&normalized.as_str()) {
        return Some(AssistantDirective::Shutdown);
    }
    if RESET_PHRASES.contains(&normalized.as_str()) {
        return Some(AssistantDirective::Reset);
    }
    None
}

fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_phrases_match_case_insensitively() {
        for phrase in ["Goodbye", "GOODBYE.", "shut down!", "  go to sleep  "] {
            assert_eq!(
                parse_control(phrase),
                Some(AssistantDirective::Shutdown),
                "{phrase}"
            );
        }
    }

    #[test]
    fn reset_phrases_match() {
        assert_eq!(
            parse_control("Reset conversation."),
            Some(AssistantDirective::Reset)
        );
        assert_eq!(parse_control("start over"), Some(AssistantDirective::Reset));
    }

    #[test]
    fn ordinary_speech_is_not_a_control() {
        assert_eq!(parse_control("turn on the lights"), None);
        assert_eq!(parse_control(""), None);
    }

    #[test]
    fn mid_sentence_phrases_do_not_match() {
        assert_eq!(parse_control("please don't shut down the lights"), None);
        assert_eq!(parse_control("say goodbye to Ada for me"), None);
    }
}
