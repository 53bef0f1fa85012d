use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    /// A referenced image or manifest could not be resolved under the resource root.
    #[error("Unable to read local file {0}")]
    NotFound(String),

    /// Anything the storage or training service reported, message kept verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("no run state found at {0}")]
    NoState(String),

    #[error("run state is missing '{0}'")]
    MissingState(&'static str),

    #[error("invalid run state: {0}")]
    InvalidState(String),

    #[error("manifest {path} is invalid: {}", .errors.join("; "))]
    InvalidManifest { path: String, errors: Vec<String> },

    #[error(transparent)]
    Manifest(#[from] groundtruth::ManifestError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DemoError>;

impl<E, R> From<SdkError<E, R>> for DemoError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        let message = err
            .as_service_error()
            .and_then(|e| e.message())
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
        DemoError::Remote(message)
    }
}
