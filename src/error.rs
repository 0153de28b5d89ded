//! Typed failures a caller may want to tell apart from tool errors.
//!
//! Everything else in the pass propagates as plain `anyhow` errors carrying
//! the underlying message.
use std::path::PathBuf;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// The manifest could not be read or did not have the expected shape.
    #[error("{repo}: missing or invalid manifest {}", path.display())]
    InvalidManifest {
        repo: String,
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },

    /// The registry never reported a usable latest version.
    #[error("{repo}: could not resolve latest version of {package}")]
    GeneratorVersionNotFound {
        repo: String,
        package: String,
        #[source]
        source: BoxedSource,
    },
}

impl PassError {
    pub fn invalid_manifest(repo: &str, path: PathBuf, source: anyhow::Error) -> Self {
        Self::InvalidManifest {
            repo: repo.to_string(),
            path,
            source: source.into(),
        }
    }

    pub fn version_not_found(repo: &str, package: &str, source: anyhow::Error) -> Self {
        Self::GeneratorVersionNotFound {
            repo: repo.to_string(),
            package: package.to_string(),
            source: source.into(),
        }
    }
}
