use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Build(#[from] caribdata_core::BuildError),

    #[error("run finished with {0} recorded fetch errors")]
    PartialFailure(usize),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Build(error) => match error {
                caribdata_core::BuildError::ConfigRead { .. }
                | caribdata_core::BuildError::ConfigParse { .. }
                | caribdata_core::BuildError::ConfigInvalid(_) => 2,
                _ => 10,
            },
            Self::PartialFailure(_) => 5,
        }
    }
}
