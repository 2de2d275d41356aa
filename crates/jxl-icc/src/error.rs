#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Bitstream(jxl_bitio::Error),
    Decoder(jxl_entropy::Error),
    InvalidIccStream(&'static str),
    ProfileTooLarge {
        size: u64,
    },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            Self::Decoder(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitstream(err) => write!(f, "error from bitstream: {}", err),
            Self::Decoder(err) => write!(f, "error from entropy decoder: {}", err),
            Self::InvalidIccStream(msg) => write!(f, "invalid ICC stream: {}", msg),
            Self::ProfileTooLarge { size } => {
                write!(f, "ICC profile is too large: {} bytes", size)
            },
        }
    }
}

impl From<jxl_bitio::Error> for Error {
    fn from(err: jxl_bitio::Error) -> Self {
        Self::Bitstream(err)
    }
}

impl From<jxl_entropy::Error> for Error {
    fn from(err: jxl_entropy::Error) -> Self {
        Self::Decoder(err)
    }
}

impl Error {
    /// Whether the error says the stream ended before a read completed.
    ///
    /// The streaming ICC reader returns such errors after rolling back to
    /// the last checkpoint; feeding a longer bitstream resumes decoding.
    pub fn unexpected_eof(&self) -> bool {
        match self {
            Self::Bitstream(err) => err.unexpected_eof(),
            Self::Decoder(err) => err.unexpected_eof(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
