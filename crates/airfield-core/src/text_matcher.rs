use crate::task::TrackedTask;

/// Case-insensitive substring matcher over a task's searchable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// The normalized query.
    #[must_use]
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Whether any searchable field of the task contains the query.
    pub fn matches<T: TrackedTask>(&self, task: &T) -> bool {
        task.search_fields()
            .into_iter()
            .any(|field| self.matches_field(field))
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}
