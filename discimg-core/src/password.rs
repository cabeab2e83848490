//! Password-prompt callback

/// Invoked by an encrypted fragment when it needs a password it does not
/// already have (no password supplied up front, and salt-derivation did
/// not apply or did not validate). Returning `None` means "give up";
/// callers that have no interactive prompt to offer should pass a closure
/// that always returns `None`.
pub trait PasswordPrompt {
    fn prompt(&self, reason: &str) -> Option<String>;
}

impl<F: Fn(&str) -> Option<String>> PasswordPrompt for F {
    fn prompt(&self, reason: &str) -> Option<String> {
        self(reason)
    }
}

/// A prompt that never has a password to offer.
pub struct NoPassword;

impl PasswordPrompt for NoPassword {
    fn prompt(&self, _reason: &str) -> Option<String> {
        None
    }
}
