use thiserror::Error;

pub type Result<T> = std::result::Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid column definitions: {0}")]
    InvalidDefinitions(#[from] serde_json::Error),

    #[error("invalid grid options: {source}")]
    InvalidOptions { source: serde_json::Error },

    #[error("column not found: {id}")]
    ColumnNotFound { id: String },

    #[error("column group not found: {id}")]
    GroupNotFound { id: String },
}

impl GridError {
    #[must_use]
    pub fn column_not_found(id: impl Into<String>) -> Self {
        Self::ColumnNotFound { id: id.into() }
    }

    #[must_use]
    pub fn group_not_found(id: impl Into<String>) -> Self {
        Self::GroupNotFound { id: id.into() }
    }

    /// Whether the error names an id the model does not know.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ColumnNotFound { .. } | Self::GroupNotFound { .. })
    }
}
