use std::{
    env,
    fmt,
    fmt::{Debug, Display},
};

/// Holds a sensitive value (provider API keys, webhook signing secrets) so that it never ends up in logs by accident.
///
/// Secrets do not implement `PartialEq`. Compare the signatures made with them in constant time instead.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// Reads a secret from the environment. Unset and blank variables both give `None`.
    pub fn from_env(name: &str) -> Option<Self> {
        env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).map(Self::new)
    }

    /// True if the secret holds a non-empty value.
    pub fn is_set(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// A redacted form that still lets an operator tell two keys apart, e.g. `whsec_****c123`.
    ///
    /// Only the provider's key prefix (up to the last `_`) and the final four characters are shown, and only for
    /// keys long enough that this gives nothing useful away.
    pub fn hint(&self) -> String {
        let value = self.value.trim();
        let chars = value.chars().count();
        if chars < 16 {
            return "****".to_string();
        }
        let prefix = value.rfind('_').filter(|&i| i < 8).map(|i| &value[..=i]).unwrap_or_default();
        let suffix = value.chars().skip(chars - 4).collect::<String>();
        format!("{prefix}****{suffix}")
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
