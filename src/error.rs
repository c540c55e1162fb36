use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

/// Errors surfaced by message parsing, value unpacking and post-decode
/// operations.
///
/// Decode failures are fatal to the message being decoded; the stream
/// loop in [`crate::read_messages`] stops at the first failing message
/// and hands back whatever was decoded before it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GribError {
    /// An I/O failure other than a clean end of input.
    ReadError(String),
    /// The indicator section does not start with the `GRIB` magic.
    NotGrib,
    /// The edition byte is not 2.
    UnsupportedEdition(u8),
    /// A grid definition, product definition or data representation
    /// template number this crate does not implement.
    UnsupportedTemplate { section: u8, number: u16 },
    /// Fewer bytes available than a field declares; carries the offset
    /// at which input ran out.
    InputTruncated(usize),
    /// A section number outside the expected 1..8 sequence.
    MalformedSection(u8),
    /// Declared packing parameters inconsistent with the data actually
    /// present (group widths/lengths vs. section length, point counts).
    CorruptData(String),
    /// A post-decode operation applied to a message that cannot
    /// support it (e.g. geographic filtering of a non-lat/lon grid).
    OperationError(String),
}

impl Error for GribError {}

impl Display for GribError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::ReadError(s) => write!(f, "read error: {s}"),
            Self::NotGrib => write!(f, "not GRIB data"),
            Self::UnsupportedEdition(e) => write!(f, "unsupported GRIB edition: {e}"),
            Self::UnsupportedTemplate { section, number } => {
                write!(f, "unsupported template {number} in section {section}")
            }
            Self::InputTruncated(pos) => write!(f, "input truncated at offset {pos}"),
            Self::MalformedSection(n) => write!(f, "malformed section: {n}"),
            Self::CorruptData(s) => write!(f, "corrupt data: {s}"),
            Self::OperationError(s) => write!(f, "{s}"),
        }
    }
}

impl From<io::Error> for GribError {
    fn from(e: io::Error) -> Self {
        Self::ReadError(e.to_string())
    }
}
