use thiserror::Error;

/// Failure kinds surfaced by the engine. Namespace errors carry the
/// offending path.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{0}: No such file or directory.")]
    NoSuchFileOrDirectory(String),
    #[error("{0}: Not a directory.")]
    NotADirectory(String),
    #[error("{0}: Is a directory.")]
    IsADirectory(String),
    #[error("{0}: Cannot create directory: File exists.")]
    FileExists(String),
    #[error("{0}: Permission denied.")]
    Permission(String),
    #[error("{0}: Invalid mode.")]
    InvalidMode(String),
    #[error("{0}: File too large.")]
    FileTooLarge(String),
    #[error("File system is full.")]
    FilesystemFull,
    #[error("invalid block size {block_size}, expected 512, 1024, 2048 or 4096")]
    InvalidBlockSize { block_size: u16 },
    #[error("invalid superblock")]
    InvalidSuperblock,
    #[error("truncated on-image record")]
    Truncated,
    #[error("malformed entry name on image")]
    InvalidName,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, FsError>;
