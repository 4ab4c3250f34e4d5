use std::fmt;
use std::io;

/// Every way the emulator can fail.
///
/// Load-time errors ([`Error::InvalidHeader`], [`Error::TruncatedRom`],
/// [`Error::UnsupportedMapper`]) are reported before any session state is
/// mutated. [`Error::CpuHalt`] is fatal at runtime and moves a running
/// session into its error state. [`Error::CorruptState`] always means a
/// corrupt or incompatible save-state file.
#[derive(Debug)]
pub enum Error {
    /// The ROM file does not start with the `NES\x1A` signature.
    InvalidHeader,
    /// The ROM file ended before the region named here.
    TruncatedRom(&'static str),
    /// The ROM requests a mapper this library does not implement.
    UnsupportedMapper(u16),
    /// The CPU fetched a halt (STP) or otherwise unexecutable opcode.
    CpuHalt { opcode: u8, pc: u16 },
    /// A state load read past the end of a serialized component.
    CorruptState,
    /// A file operation failed while saving or loading.
    Io(io::Error),
    /// The session has not been started.
    NotRunning,
    /// The session already has a worker thread running.
    AlreadyStarted,
    /// The session hit a fatal error and can only be re-created.
    ErrorState,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHeader => write!(f, "Invalid ROM header"),
            Error::TruncatedRom(section) => {
                write!(f, "ROM file is truncated (unable to read {})", section)
            }
            Error::UnsupportedMapper(n) => write!(f, "Mapper {} is unsupported", n),
            Error::CpuHalt { opcode, pc } => write!(
                f,
                "Executed halt instruction {:#04X} at {:#06X}",
                opcode, pc
            ),
            Error::CorruptState => write!(f, "Save state is corrupt or incompatible"),
            Error::Io(e) => write!(f, "File error: {}", e),
            Error::NotRunning => write!(f, "The emulator has not been started"),
            Error::AlreadyStarted => write!(f, "The emulator has already been started"),
            Error::ErrorState => {
                write!(f, "The emulator is in an error state and cannot continue")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}
