use std::sync::Arc;

const UNKNOWN: &str = "Unknown";

/// Ordered label id to display name table. Index 0 is reserved for
/// "Unknown" and is what any out-of-range id resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLabels {
    names: Arc<[String]>,
}

impl IdentityLabels {
    /// Build the table, inserting "Unknown" at index 0 if the list does not
    /// already start with it
    pub fn new(mut names: Vec<String>) -> Self {
        if names.first().map(String::as_str) != Some(UNKNOWN) {
            names.insert(0, UNKNOWN.to_string());
        }
        Self {
            names: names.into(),
        }
    }

    pub fn name(&self, label: i32) -> &str {
        usize::try_from(label)
            .ok()
            .and_then(|index| self.names.get(index))
            .unwrap_or(&self.names[0])
    }

    pub fn unknown(&self) -> &str {
        &self.names[0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for IdentityLabels {
    fn default() -> Self {
        Self::new(vec![
            UNKNOWN.to_string(),
            "Person1".to_string(),
            "Person2".to_string(),
        ])
    }
}
