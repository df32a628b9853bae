//! Stream selectors carried in the frame header.

/// Standard input echoed back by the source.
pub const STDIN: u8 = 0;

/// Primary output.
pub const STDOUT: u8 = 1;

/// Secondary output.
pub const STDERR: u8 = 2;

/// Out-of-band errors raised by the source itself.
pub const SYSTEMERR: u8 = 3;

/// Decoded form of a stream selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
    SystemErr,
}

impl StreamKind {
    /// Parse a selector byte. Returns `None` for unknown selectors.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            STDIN => Some(Self::Stdin),
            STDOUT => Some(Self::Stdout),
            STDERR => Some(Self::Stderr),
            SYSTEMERR => Some(Self::SystemErr),
            _ => None,
        }
    }

    /// The wire selector for this stream.
    pub fn selector(self) -> u8 {
        match self {
            Self::Stdin => STDIN,
            Self::Stdout => STDOUT,
            Self::Stderr => STDERR,
            Self::SystemErr => SYSTEMERR,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::SystemErr => "systemerr",
        }
    }

    /// Returns true if payloads on this stream belong to the primary substream.
    ///
    /// Echoed stdin is routed together with stdout.
    pub fn is_primary(self) -> bool {
        matches!(self, Self::Stdin | Self::Stdout)
    }
}
