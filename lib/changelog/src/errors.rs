use scm::errors::ScmError;
use thiserror::Error;

#[remain::sorted]
#[derive(Debug, Error)]
pub enum ChangelogErrors {
    #[error("future tag cannot be same as an existing tag: {0}")]
    FutureTagExists(String),

    #[error("from-tag can be one of [{}]", .candidates.join(", "))]
    InvalidFromTag { candidates: Vec<String> },

    #[error("to-tag can be one of [{}]", .candidates.join(", "))]
    InvalidToTag { candidates: Vec<String> },

    /// Error that may occur while I/O operations.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    PersistError(#[from] tempfile::PersistError),

    /// Failures of the remote repository, passed through as is.
    #[error(transparent)]
    ScmError(#[from] ScmError),

    #[error(transparent)]
    TemplateError(#[from] minijinja::Error),
}

pub type ChangelogResult<T> = Result<T, ChangelogErrors>;

#[cfg(test)]
mod tests {
    use scm::errors::ScmError;

    use crate::errors::ChangelogErrors;

    #[test]
    fn range_errors_list_candidates() {
        let err = ChangelogErrors::InvalidFromTag {
            candidates: vec!["v0.1.3".to_string(), "v0.1.2".to_string()],
        };
        assert_eq!("from-tag can be one of [v0.1.3, v0.1.2]", err.to_string());

        let err = ChangelogErrors::InvalidToTag { candidates: vec![] };
        assert_eq!("to-tag can be one of []", err.to_string());
    }

    #[test]
    fn scm_errors_are_transparent() {
        let err = ChangelogErrors::from(ScmError::NotFound("first commit".to_string()));
        assert_eq!("first commit not found", err.to_string());
    }
}
