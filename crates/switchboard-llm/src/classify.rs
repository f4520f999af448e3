//! Retryable-error classification.
//!
//! A fixed, ordered list of pattern rules decides whether an error message
//! describes a transient condition (rate limiting, overloaded upstream,
//! timeouts, network failures, exhausted quota). Anything that matches no
//! rule is fatal. The rules only look at text, so the same decision is made
//! no matter which vendor produced the message.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ProviderError;

/// The transient condition a retryable error was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// Vendor-side rate limiting.
    RateLimited,
    /// HTTP "Too Many Requests" wording.
    TooManyRequests,
    /// HTTP 429/502/503 or an overloaded upstream.
    ServerUnavailable,
    /// The request or a body read timed out.
    Timeout,
    /// DNS resolution or TCP connection failure.
    Connection,
    /// Account or project quota exhausted.
    QuotaExhausted,
}

/// HTTP statuses that are retryable regardless of the response body.
pub const RETRYABLE_STATUS: [u16; 3] = [429, 502, 503];

struct Rule {
    kind: RetryKind,
    pattern: Regex,
    /// Matches a bare status code; skipped for response bodies.
    status_code: bool,
}

const RULE_TABLE: &[(RetryKind, &str, bool)] = &[
    (RetryKind::RateLimited, r"(?i)rate[\s_-]?limit", false),
    (RetryKind::TooManyRequests, r"(?i)too many requests", false),
    (RetryKind::ServerUnavailable, r"\b(?:429|502|503)\b", true),
    (
        RetryKind::ServerUnavailable,
        r"(?i)bad gateway|service unavailable|overloaded",
        false,
    ),
    (
        RetryKind::Timeout,
        r"(?i)\btime[\s_-]?out\b|timed out|ETIMEDOUT|ESOCKETTIMEDOUT|deadline exceeded",
        false,
    ),
    (
        RetryKind::Connection,
        r"(?i)ECONNREFUSED|ECONNRESET|ENOTFOUND|EAI_AGAIN|EHOSTUNREACH|ENETUNREACH|connection (?:refused|reset|closed|aborted)|error trying to connect|dns error|failed to lookup address|network error|broken pipe",
        false,
    ),
    (
        RetryKind::QuotaExhausted,
        r"(?i)quota|resource[\s_]exhausted",
        false,
    ),
];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .filter_map(|(kind, pattern, status_code)| {
            Regex::new(pattern).ok().map(|pattern| Rule {
                kind: *kind,
                pattern,
                status_code: *status_code,
            })
        })
        .collect()
});

fn first_match(message: &str, with_status_codes: bool) -> Option<RetryKind> {
    RULES
        .iter()
        .filter(|rule| with_status_codes || !rule.status_code)
        .find(|rule| rule.pattern.is_match(message))
        .map(|rule| rule.kind)
}

/// Return the first rule that matches `message`, in rule order.
pub fn classify(message: &str) -> Option<RetryKind> {
    first_match(message, true)
}

/// Classify an HTTP error response.
///
/// The status code decides on its own; numbers inside the body do not.
/// The body's wording is still checked, so a 400 saying "quota exceeded"
/// is retryable.
pub fn classify_status(status: u16, body: &str) -> Option<RetryKind> {
    first_match(body, false).or_else(|| {
        RETRYABLE_STATUS
            .contains(&status)
            .then_some(RetryKind::ServerUnavailable)
    })
}

/// Whether an error message describes a transient, failover-eligible failure.
pub fn is_retryable_message(message: &str) -> bool {
    classify(message).is_some()
}

/// Whether a [`ProviderError`] may trigger failover to the next provider.
///
/// Cancellation and readiness errors are never retryable: the first is the
/// caller's decision and the second never reached the network.
pub fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Cancelled | ProviderError::NotReady(_) | ProviderError::NoProviders => {
            false
        }
        ProviderError::HttpStatus { status, body } => classify_status(*status, body).is_some(),
        other => is_retryable_message(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_compiles() {
        assert_eq!(RULES.len(), RULE_TABLE.len());
    }

    #[test]
    fn rate_limit_wordings() {
        assert_eq!(classify("Rate limit reached for gpt-4o"), Some(RetryKind::RateLimited));
        assert_eq!(classify("rate_limit_error"), Some(RetryKind::RateLimited));
        assert_eq!(
            classify("Too Many Requests, slow down"),
            Some(RetryKind::TooManyRequests)
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(classify("HTTP 429: {}"), Some(RetryKind::ServerUnavailable));
        assert_eq!(classify("HTTP 502: upstream"), Some(RetryKind::ServerUnavailable));
        assert_eq!(classify("HTTP 503: "), Some(RetryKind::ServerUnavailable));
        assert_eq!(
            classify("provider error: Overloaded"),
            Some(RetryKind::ServerUnavailable)
        );
    }

    #[test]
    fn rule_order_wins() {
        // Mentions both a rate limit and 429; the earlier rule decides.
        assert_eq!(
            classify("HTTP 429: rate limit exceeded"),
            Some(RetryKind::RateLimited)
        );
    }

    #[test]
    fn other_status_codes_are_fatal() {
        assert!(!is_retryable_message("HTTP 400: bad request"));
        assert!(!is_retryable_message("HTTP 401: invalid api key"));
        assert!(!is_retryable_message("HTTP 404: model not found"));
        assert!(!is_retryable_message("HTTP 5030: weird"));
    }

    #[test]
    fn timeouts() {
        assert_eq!(classify("request timed out"), Some(RetryKind::Timeout));
        assert_eq!(classify("connect ETIMEDOUT 1.2.3.4:443"), Some(RetryKind::Timeout));
        assert_eq!(classify("Gateway Timeout"), Some(RetryKind::Timeout));
        assert_eq!(classify("DEADLINE EXCEEDED"), Some(RetryKind::Timeout));
    }

    #[test]
    fn connection_failures() {
        assert_eq!(
            classify("getaddrinfo ENOTFOUND api.example.com"),
            Some(RetryKind::Connection)
        );
        assert_eq!(
            classify("error trying to connect: tcp connect error: Connection refused"),
            Some(RetryKind::Connection)
        );
        assert_eq!(classify("dns error: no record"), Some(RetryKind::Connection));
    }

    #[test]
    fn quota() {
        assert_eq!(
            classify("You exceeded your current quota"),
            Some(RetryKind::QuotaExhausted)
        );
        assert_eq!(classify("RESOURCE_EXHAUSTED"), Some(RetryKind::QuotaExhausted));
    }

    #[test]
    fn unmatched_is_fatal() {
        assert!(!is_retryable_message("invalid request: messages must not be empty"));
        assert!(!is_retryable_message(""));
    }

    #[test]
    fn provider_errors_classified_by_text() {
        assert!(is_retryable(&ProviderError::HttpStatus {
            status: 503,
            body: String::new(),
        }));
        assert!(is_retryable(&ProviderError::Timeout("read".into())));
        assert!(is_retryable(&ProviderError::Vendor("overloaded_error".into())));
        assert!(!is_retryable(&ProviderError::HttpStatus {
            status: 401,
            body: "bad key".into(),
        }));
        assert!(!is_retryable(&ProviderError::InvalidResponse("no choices".into())));
    }

    #[test]
    fn status_digits_in_body_do_not_count() {
        let err = ProviderError::HttpStatus {
            status: 400,
            body: r#"{"error":{"message":"max_tokens must be <= 503","param":"max_tokens"}}"#.into(),
        };
        assert!(!is_retryable(&err));
        assert_eq!(classify_status(400, "request id 429-502"), None);
    }

    #[test]
    fn status_decides_for_http_errors() {
        assert_eq!(classify_status(503, ""), Some(RetryKind::ServerUnavailable));
        assert_eq!(classify_status(429, "{}"), Some(RetryKind::ServerUnavailable));
        assert_eq!(
            classify_status(429, "rate limit exceeded"),
            Some(RetryKind::RateLimited)
        );
        assert_eq!(
            classify_status(400, "You exceeded your current quota"),
            Some(RetryKind::QuotaExhausted)
        );
        assert_eq!(classify_status(500, "internal error"), None);
    }

    #[test]
    fn config_and_cancel_never_retryable() {
        assert!(!is_retryable(&ProviderError::Cancelled));
        assert!(!is_retryable(&ProviderError::NotReady("rate limit".into())));
        assert!(!is_retryable(&ProviderError::NoProviders));
    }
}
