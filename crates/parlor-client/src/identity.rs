//! Session identity generation.

use std::fmt;

use uuid::Uuid;

/// Opaque, process-unique identifier for one connection attempt.
///
/// Generated fresh for every attempt and discarded on reset; an identifier is
/// never reused after its connection closes. Uniqueness comes from the v4
/// UUID's random source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let first = SessionId::generate();
        let second = SessionId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn display_matches_uuid_format() {
        let id = SessionId::generate().to_string();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }
}
