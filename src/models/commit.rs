use serde::Serialize;

/// Number of characters kept for the abbreviated commit id.
pub const SHORT_ID_LEN: usize = 7;

/// The `HEAD` commit as reported by version control.
///
/// Derived once per reload and never mutated afterwards; a new reload
/// produces a new value. `short_id` is always the first [`SHORT_ID_LEN`]
/// characters of `full_id`, which [`RepositoryCommit::new`] guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryCommit {
    pub short_id: String,
    pub full_id: String,
    pub author: String,
    pub message: String,
}

impl RepositoryCommit {
    /// Build a commit record, deriving the short id from the full id.
    pub fn new(
        full_id: impl Into<String>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let full_id = full_id.into();
        let short_id = full_id.chars().take(SHORT_ID_LEN).collect();
        Self {
            short_id,
            full_id,
            author: author.into(),
            message: message.into(),
        }
    }

    /// Render the commit the way chat banners show it:
    /// `` `abc1234` (author: subject) ``.
    pub fn with_author(&self) -> String {
        format!("`{}` ({}: {})", self.short_id, self.author, self.message)
    }
}
