//! Secret redaction for log output.
//!
//! Bot API request URLs embed the token (`/bot<token>/sendMessage`), and
//! transport errors tend to echo the URL back. Anything derived from a
//! request passes through [`SecretRedactor::redact`] before it is logged.

use std::borrow::Cow;

use regex::Regex;

/// Stand-in for every scrubbed secret.
const REDACTED: &str = "[REDACTED]";

/// Token shapes scrubbed regardless of configuration.
static SECRET_PATTERNS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    [
        // Telegram bot tokens: `<bot id>:<35 char secret>`
        r"\d{6,12}:[A-Za-z0-9_-]{30,}",
        // Bearer tokens in headers
        r"(?i)bearer\s+([a-zA-Z0-9_.=-]+)",
        // Generic tokens in key=value format
        r#"(?i)(access[_-]?token|auth[_-]?token|bot[_-]?token)['"]?\s*[:=]\s*['"]?([a-zA-Z0-9_.:=-]{20,})['"]?"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Scrubs credentials out of text bound for the log.
///
/// # Example
///
/// ```
/// use giveaway_core::log::SecretRedactor;
///
/// let redactor = SecretRedactor::new();
/// let input = "POST https://api.telegram.org/bot123456789:AAE-wEUTf6twUrFTgMxLjshmSzrriWf9Ubc/sendMessage";
/// let output = redactor.redact(input);
/// assert!(output.contains("[REDACTED]"));
/// assert!(!output.contains("AAE-wEUT"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecretRedactor {
    /// Exact secrets known at runtime.
    literals: Vec<Regex>,
}

impl SecretRedactor {
    /// Redactor with only the built-in token patterns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also redact every occurrence of `secret` verbatim.
    ///
    /// Empty secrets are ignored.
    #[must_use]
    pub fn with_literal(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            if let Ok(regex) = Regex::new(&regex::escape(secret)) {
                self.literals.push(regex);
            }
        }
        self
    }

    /// Replaces every literal and pattern match with `[REDACTED]`.
    ///
    /// Borrows the input unchanged when nothing matches.
    #[must_use]
    pub fn redact<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(input);

        for pattern in self.literals.iter().chain(SECRET_PATTERNS.iter()) {
            if pattern.is_match(&result) {
                result = Cow::Owned(pattern.replace_all(&result, REDACTED).into_owned());
            }
        }

        result
    }
}

/// [`SecretRedactor::redact`] with the built-in patterns only.
#[must_use]
pub fn redact(input: &str) -> Cow<'_, str> {
    SecretRedactor::new().redact(input)
}
