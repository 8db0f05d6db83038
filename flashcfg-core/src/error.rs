//! Configuration store errors

use core::fmt;

use flashcfg_hal::FsError;

/// Configuration store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Filesystem could not be mounted, even after the recovery attempt
    Mount(FsError),
    /// Backing file could not be created
    FileCreate(FsError),
    /// Backing file could not be opened (for reading or writing)
    FileOpen(FsError),
    /// Backing file does not hold a JSON object
    Parse,
    /// Document could not be serialized
    Serialize,
    /// Serialized document was not (fully) written
    Write,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Mount(e) => write!(f, "failed to mount filesystem: {:?}", e),
            ConfigError::FileCreate(e) => write!(f, "failed to create config file: {:?}", e),
            ConfigError::FileOpen(e) => write!(f, "failed to open config file: {:?}", e),
            ConfigError::Parse => f.write_str("failed to parse config file"),
            ConfigError::Serialize => f.write_str("failed to serialize config"),
            ConfigError::Write => f.write_str("failed to write to config file"),
        }
    }
}
