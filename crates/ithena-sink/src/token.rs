//! Auth token provider: read/delete only. Logging in is handled by a
//! separate OAuth device-authorization flow outside this crate; this crate
//! only consumes the two operations the audit pipeline and `auth
//! status`/`auth deauth` need.

use crate::error::SinkError;

const SERVICE: &str = "ithena-cli";
const KEY: &str = "authToken";

/// Read/delete access to the OS secret store entry backing wrapper auth.
pub trait TokenProvider: Send + Sync {
    /// Returns the current token, or `None` if absent or unreadable.
    fn current_token(&self) -> Option<String>;

    /// Deletes the stored token. A missing entry is success.
    ///
    /// # Errors
    /// Returns [`SinkError::Token`] if the OS secret store reports an error
    /// other than "no such entry".
    fn delete_token(&self) -> Result<(), SinkError>;
}

/// [`TokenProvider`] backed by the OS keyring under service `"ithena-cli"`,
/// key `"authToken"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringTokenProvider;

impl TokenProvider for KeyringTokenProvider {
    fn current_token(&self) -> Option<String> {
        let entry = keyring::Entry::new(SERVICE, KEY).ok()?;
        entry.get_password().ok()
    }

    fn delete_token(&self) -> Result<(), SinkError> {
        let entry = keyring::Entry::new(SERVICE, KEY).map_err(|e| SinkError::Token(e.to_string()))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SinkError::Token(e.to_string())),
        }
    }
}

/// In-memory token provider for tests in this and downstream crates.
#[doc(hidden)]
pub mod testing {
    use super::TokenProvider;
    use crate::error::SinkError;
    use std::sync::Mutex;

    /// A [`TokenProvider`] backed by an in-memory `Option<String>`, for tests.
    #[derive(Default)]
    pub struct FakeTokenProvider(Mutex<Option<String>>);

    impl FakeTokenProvider {
        /// Builds a provider with no stored token.
        #[must_use]
        pub fn empty() -> Self {
            Self(Mutex::new(None))
        }

        /// Builds a provider with `token` already stored.
        #[must_use]
        pub fn with_token(token: impl Into<String>) -> Self {
            Self(Mutex::new(Some(token.into())))
        }
    }

    impl TokenProvider for FakeTokenProvider {
        fn current_token(&self) -> Option<String> {
            self.0.lock().ok().and_then(|guard| guard.clone())
        }

        fn delete_token(&self) -> Result<(), SinkError> {
            if let Ok(mut guard) = self.0.lock() {
                *guard = None;
            }
            Ok(())
        }
    }
}
