//! Identity of the running service instance.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier distinguishing this running copy of the service, used to tag
/// metrics. Resolved once at server construction and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    pub id: String,
}

impl InstanceMetadata {
    /// Use `passed_id` verbatim when it is non-empty, otherwise generate a
    /// random UUID v4. Whitespace counts as content.
    pub fn resolve(passed_id: Option<&str>) -> Self {
        match passed_id.filter(|id| !id.is_empty()) {
            Some(id) => Self { id: id.to_string() },
            None => Self::generate(),
        }
    }

    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_id_is_used_verbatim() {
        let meta = InstanceMetadata::resolve(Some("Worker-7 "));
        assert_eq!(meta.id, "Worker-7 ");
    }

    #[test]
    fn empty_id_is_replaced() {
        let meta = InstanceMetadata::resolve(Some(""));
        assert_eq!(meta.id.len(), 36);
    }

    #[test]
    fn whitespace_id_is_kept_verbatim() {
        let meta = InstanceMetadata::resolve(Some("  "));
        assert_eq!(meta.id, "  ");
    }

    #[test]
    fn generated_ids_differ() {
        let a = InstanceMetadata::resolve(None);
        let b = InstanceMetadata::resolve(None);
        assert!(!a.id.is_empty());
        assert_ne!(a, b);
    }
}
