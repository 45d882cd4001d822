use std::fmt;

/// Opaque credential issued by the identity provider.
///
/// The token is never cached by this crate; it is fetched from the
/// [`SessionProvider`](crate::auth::SessionProvider) for every request.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns `None` for an empty or blank token
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(SessionToken::new("").is_none());
        assert!(SessionToken::new("   ").is_none());
    }

    #[test]
    fn debug_is_redacted() {
        let token = SessionToken::new("secret-jwt").unwrap();
        assert_eq!(format!("{token:?}"), "SessionToken(***)");
        assert_eq!(token.bearer(), "Bearer secret-jwt");
    }
}
