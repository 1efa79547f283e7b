//! Submitter identity used to scope batches.

use sha2::{Digest, Sha256};
use std::fmt;

/// Logical submitter key derived from a credential and an application name.
///
/// Only a digest is kept so that credentials never end up in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(credential: &str, app_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(credential.as_bytes());
        hasher.update([0]);
        hasher.update(app_name.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A short prefix is enough to tell submitters apart in logs
        f.write_str(&self.0[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_deterministic() {
        assert_eq!(Identity::new("key", "app"), Identity::new("key", "app"));
    }

    #[test]
    fn test_identity_depends_on_both_parts() {
        let base = Identity::new("key", "app");
        assert_ne!(base, Identity::new("other", "app"));
        assert_ne!(base, Identity::new("key", "other"));
        // The separator keeps "ke"+"yapp" apart from "key"+"app"
        assert_ne!(base, Identity::new("ke", "yapp"));
    }

    #[test]
    fn test_identity_does_not_leak_credential() {
        let identity = Identity::new("super-secret", "app");
        assert!(!identity.as_str().contains("super-secret"));
        assert_eq!(identity.to_string().len(), 12);
    }
}
