use std::path::PathBuf;

use changelog::errors::ChangelogErrors;
use scm::errors::ScmError;
use thiserror::Error;

#[remain::sorted]
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    ChangelogError(#[from] ChangelogErrors),

    #[error("configuration error: {0}")]
    ConfigError(#[from] Box<figment::Error>),

    #[error("configuration file {} not found", .0.display())]
    MissingConfig(PathBuf),

    #[error("SCM error: {0}")]
    ScmError(#[from] ScmError),
}

impl From<figment::Error> for CliError {
    fn from(e: figment::Error) -> Self {
        CliError::ConfigError(Box::new(e))
    }
}

pub(crate) type CliResult<T> = Result<T, CliError>;
