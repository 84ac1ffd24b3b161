//! Input sanitization shared between the tool surface and the state
//! service.

use csm_domain::constants::MAX_PROMPT_LENGTH;
use csm_domain::error::{Error, Result};

const CONTROL_CHARS: [char; 1] = ['\u{7f}'];

/// Sanitizes a user-supplied prompt: strips ASCII control characters,
/// rejects shell-metacharacter injection attempts, then truncates to
/// [`MAX_PROMPT_LENGTH`].
pub fn sanitize_prompt(prompt: &str) -> Result<String> {
    if prompt.is_empty() {
        return Err(Error::validation("prompt must not be empty"));
    }

    let stripped: String = prompt
        .chars()
        .filter(|c| {
            let code = *c as u32;
            let is_control = (code <= 0x1f && *c != '\n' && *c != '\t') || CONTROL_CHARS.contains(c);
            !is_control
        })
        .collect();

    if contains_injection_characters(&stripped) {
        return Err(Error::validation(
            "prompt contains disallowed shell metacharacters",
        ));
    }

    Ok(stripped.chars().take(MAX_PROMPT_LENGTH).collect())
}

fn contains_injection_characters(s: &str) -> bool {
    s.chars()
        .any(|c| matches!(c, ';' | '&' | '|' | '`' | '$' | '\n'))
}

/// Rejects paths containing traversal sequences.
pub fn validate_no_path_traversal(path: &str) -> Result<()> {
    if path.contains("../") || path.contains("..\\") || path.to_lowercase().contains("%2e%2e") {
        return Err(Error::validation("path traversal sequence rejected"));
    }
    if path.len() > csm_domain::constants::MAX_PATH_LENGTH {
        return Err(Error::validation("path exceeds maximum length"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_prompt() {
        assert!(sanitize_prompt("").is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        for bad in ["rm -rf /; echo done", "a && b", "a | b", "`whoami`", "$HOME"] {
            assert!(sanitize_prompt(bad).is_err(), "expected rejection for {bad:?}");
        }
    }

    #[test]
    fn strips_control_characters() {
        let cleaned = sanitize_prompt("hello\u{0}world").unwrap();
        assert_eq!(cleaned, "helloworld");
    }

    #[test]
    fn truncates_to_max_length() {
        let long = "a".repeat(MAX_PROMPT_LENGTH + 500);
        let cleaned = sanitize_prompt(&long).unwrap();
        assert_eq!(cleaned.len(), MAX_PROMPT_LENGTH);
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(validate_no_path_traversal("../etc/passwd").is_err());
        assert!(validate_no_path_traversal("%2e%2e/etc/passwd").is_err());
        assert!(validate_no_path_traversal("normal/path.txt").is_ok());
    }
}
