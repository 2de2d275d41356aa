#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Bitstream(jxl_bitio::Error),
    Lz77NotAllowed,
    InvalidIntegerConfig,
    InvalidAnsHistogram,
    InvalidAnsStream,
    InvalidCluster,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitstream(err) => write!(f, "error from bitstream: {}", err),
            Self::Lz77NotAllowed => write!(f, "LZ77-enabled stream when it is not allowed"),
            Self::InvalidIntegerConfig => write!(f, "invalid hybrid integer configuration"),
            Self::InvalidAnsHistogram => write!(f, "invalid ANS distribution"),
            Self::InvalidAnsStream => write!(f, "ANS stream verification failed"),
            Self::InvalidCluster => write!(f, "invalid distribution clustering"),
        }
    }
}

impl From<jxl_bitio::Error> for Error {
    fn from(err: jxl_bitio::Error) -> Self {
        Self::Bitstream(err)
    }
}

impl Error {
    /// Whether the error says the stream ended before a read completed.
    pub fn unexpected_eof(&self) -> bool {
        matches!(self, Self::Bitstream(e) if e.unexpected_eof())
    }
}
