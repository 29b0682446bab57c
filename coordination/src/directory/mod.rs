//! Guardian directory boundary
//!
//! The directory maps a subject to the ordered set of guardians who should
//! hear about escalations. It is owned outside the coordinator and may change
//! while escalations are running; the coordinator reads it only when the
//! guardian-push stage fires.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Shared reference to a guardian directory
pub type SharedGuardianDirectory = Arc<dyn GuardianDirectory>;

/// Lookup and update of subject → guardians
#[async_trait]
pub trait GuardianDirectory: Send + Sync {
    /// Guardians of `subject_id`, in notification order
    async fn guardians_of(&self, subject_id: &str) -> Vec<String>;

    /// Replace the guardian list of `subject_id`
    async fn set_guardians(&self, subject_id: &str, guardian_ids: Vec<String>);
}

/// Directory backed by an in-process map
#[derive(Default)]
pub struct InMemoryGuardianDirectory {
    guardians: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryGuardianDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this directory
    pub fn shared(self) -> SharedGuardianDirectory {
        Arc::new(self)
    }
}

#[async_trait]
impl GuardianDirectory for InMemoryGuardianDirectory {
    async fn guardians_of(&self, subject_id: &str) -> Vec<String> {
        self.guardians
            .read()
            .await
            .get(subject_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn set_guardians(&self, subject_id: &str, guardian_ids: Vec<String>) {
        // Keep first occurrence of each guardian, preserving order
        let mut seen = std::collections::HashSet::new();
        let ordered: Vec<String> = guardian_ids
            .into_iter()
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        let mut guardians = self.guardians.write().await;
        if ordered.is_empty() {
            guardians.remove(subject_id);
        } else {
            guardians.insert(subject_id.to_string(), ordered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_subject_has_no_guardians() {
        let directory = InMemoryGuardianDirectory::new();
        assert!(directory.guardians_of("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_set_guardians_dedupes_and_keeps_order() {
        let directory = InMemoryGuardianDirectory::new();
        directory
            .set_guardians(
                "user-1",
                vec!["g-2".into(), "g-1".into(), "g-2".into(), "".into()],
            )
            .await;
        assert_eq!(directory.guardians_of("user-1").await, vec!["g-2", "g-1"]);
    }

    #[tokio::test]
    async fn test_set_guardians_replaces_and_clears() {
        let directory = InMemoryGuardianDirectory::new().shared();
        directory.set_guardians("user-1", vec!["g-1".into()]).await;
        directory.set_guardians("user-1", vec!["g-3".into()]).await;
        assert_eq!(directory.guardians_of("user-1").await, vec!["g-3"]);

        directory.set_guardians("user-1", Vec::new()).await;
        assert!(directory.guardians_of("user-1").await.is_empty());
    }
}
