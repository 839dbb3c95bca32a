use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

/// Value a verification token is overwritten with once consumed. Non-empty,
/// and never equal to a freshly issued token, so a used link stops resolving.
pub(crate) const VERIFICATION_TOKEN_CONSUMED: &str = "consumed";

/// Deterministic default avatar for a new account: the Gravatar endpoint
/// keyed by the hash of the normalized email.
pub(crate) fn default_avatar_url(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("https://www.gravatar.com/avatar/{digest}?s=200&r=pg&d=retro")
}

/// Fresh opaque verification token, generated per registration call.
pub(crate) fn new_verification_token() -> String {
    Uuid::new_v4().to_string()
}

/// Subject and HTML body of the verification email for a given token.
pub(crate) fn verification_email(base_url: &str, verification_token: &str) -> (String, String) {
    let subject = "Verify email".to_string();
    let html = format!(
        r#"<a target="_blank" href="{base_url}/verify/{verification_token}">Click to verify your email</a>"#
    );
    (subject, html)
}

#[cfg(test)]
mod service_tests {
    use super::*;

    #[test]
    fn avatar_url_is_deterministic_and_normalized() {
        let a = default_avatar_url("alice@example.com");
        let b = default_avatar_url("  Alice@Example.COM ");
        assert_eq!(a, b);
        assert!(a.starts_with("https://www.gravatar.com/avatar/"));
        assert!(a.ends_with("?s=200&r=pg&d=retro"));
    }

    #[test]
    fn different_emails_get_different_avatars() {
        assert_ne!(
            default_avatar_url("alice@example.com"),
            default_avatar_url("bob@example.com")
        );
    }

    #[test]
    fn verification_tokens_are_fresh_per_call() {
        let a = new_verification_token();
        let b = new_verification_token();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert_ne!(a, VERIFICATION_TOKEN_CONSUMED);
    }

    #[test]
    fn verification_email_embeds_the_link() {
        let (subject, html) = verification_email("https://app.example.com", "tok-123");
        assert_eq!(subject, "Verify email");
        assert!(html.contains("https://app.example.com/verify/tok-123"));
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
    }
}
