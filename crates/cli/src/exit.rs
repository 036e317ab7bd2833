//! Stable process exit codes for the `updelta` binary.

use crate::pipeline::PipelineError;

/// Exit code classes reported by the client.
///
/// The numeric values are part of the tool's contract with calling
/// scripts and never change between releases.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitCode {
    /// The run completed.
    Success,
    /// Bad command line.
    Usage,
    /// The build configuration could not be loaded.
    Config,
    /// A release package could not be downloaded.
    Fetch,
    /// A disk image could not be attached or detached.
    Mount,
    /// The local diff, staging, or packaging step failed.
    Build,
    /// The built package could not be published to the share.
    Publish,
}

impl ExitCode {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Usage => 1,
            Self::Config => 2,
            Self::Publish => 10,
            Self::Fetch => 20,
            Self::Mount => 21,
            Self::Build => 22,
        }
    }
}

impl From<&PipelineError> for ExitCode {
    fn from(error: &PipelineError) -> Self {
        match error {
            PipelineError::Config(_) => Self::Config,
            PipelineError::Fetch(_) => Self::Fetch,
            PipelineError::Mount(_) => Self::Mount,
            PipelineError::Diff(_)
            | PipelineError::Archive(_)
            | PipelineError::Clear { .. }
            | PipelineError::CreateDir { .. } => Self::Build,
            PipelineError::Publish(_) => Self::Publish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Usage.code(), 1);
        assert_eq!(ExitCode::Config.code(), 2);
        assert_eq!(ExitCode::Publish.code(), 10);
        assert_eq!(ExitCode::Fetch.code(), 20);
        assert_eq!(ExitCode::Mount.code(), 21);
        assert_eq!(ExitCode::Build.code(), 22);
    }

    #[test]
    fn pipeline_errors_map_to_their_class() {
        let error = PipelineError::Clear {
            path: "build".into(),
            source: std::io::Error::other("boom"),
        };
        assert_eq!(ExitCode::from(&error), ExitCode::Build);
    }
}
