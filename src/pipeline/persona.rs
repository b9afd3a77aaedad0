//! Grade level -> system-prompt fragment, with fallback.
//!
//! Resolution is a pure read and never fails: an unknown grade falls back
//! to the configured default persona, and a missing default falls back to
//! a hard-coded generic description.

use std::sync::Arc;

use crate::storage::PersonaStore;

/// Used when even the default persona is absent from the store.
pub const GENERIC_FALLBACK: &str =
    "Mentor vibe. Use detailed facts, proper terminology, and social analogies.";

pub struct PersonaResolver {
    store: Arc<dyn PersonaStore>,
    default_grade: String,
}

impl PersonaResolver {
    pub fn new(store: Arc<dyn PersonaStore>, default_grade: impl Into<String>) -> Self {
        Self {
            store,
            default_grade: default_grade.into(),
        }
    }

    pub async fn resolve(&self, grade_level: &str) -> String {
        if let Ok(Some(description)) = self.store.get(grade_level).await {
            return description;
        }

        tracing::debug!(
            "[PersonaResolver] '{}' unknown, falling back to '{}'",
            grade_level,
            self.default_grade
        );

        match self.store.get(&self.default_grade).await {
            Ok(Some(description)) => description,
            _ => GENERIC_FALLBACK.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryPersonaStore;

    async fn store_with(entries: &[(&str, &str)]) -> Arc<InMemoryPersonaStore> {
        let store = Arc::new(InMemoryPersonaStore::new());
        for (grade, description) in entries {
            store.upsert(grade, description).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn known_grade_resolves_to_its_description() {
        let store = store_with(&[("Grade 7", "mentor"), ("TVET", "vocational")]).await;
        let resolver = PersonaResolver::new(store, "Grade 7");

        assert_eq!(resolver.resolve("TVET").await, "vocational");
    }

    #[tokio::test]
    async fn unknown_grade_falls_back_to_default() {
        let store = store_with(&[("Grade 7", "mentor")]).await;
        let resolver = PersonaResolver::new(store, "Grade 7");

        assert_eq!(resolver.resolve("Grade 99").await, "mentor");
    }

    #[tokio::test]
    async fn missing_default_falls_back_to_generic() {
        let store = store_with(&[]).await;
        let resolver = PersonaResolver::new(store, "Grade 7");

        assert_eq!(resolver.resolve("anything").await, GENERIC_FALLBACK);
    }
}
