use thiserror::Error;

/// Error type shared by every component of the FAT engine.
///
/// Recoverable corruption (bad signature, out-of-range successor,
/// cross-chain, bad terminator, lost chain, FSInfo inconsistency) is not
/// a variant here: it is reported through the oracle and folded into the
/// `Status` flag set callers combine instead. This enum carries only the
/// conditions that abort a run outright.
#[derive(Debug, Error)]
pub enum FsckError {
    /// Allocation failure, mapping/read failure, or I/O error during write.
    /// The caller must abort the run and release owned resources.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Invalid cluster index passed to an accessor, or an unknown cluster
    /// mask. Indicates either a programmer error or unrecoverable structural
    /// damage that the caller cannot safely continue past.
    #[error("fatal corruption: {0}")]
    FatalCorruption(String),

    /// A mutator was invoked while the descriptor is in read-only mode.
    #[error("{0} (NO WRITE)")]
    ReadOnly(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FsckResult<T> = Result<T, FsckError>;
