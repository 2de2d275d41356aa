#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Decoder(jxl_entropy::Error),
    TooManySplines(usize),
    TooManyControlPoints(usize),
    SplineAreaTooLarge,
    EmptySpline,
    DuplicateControlPoints,
    InvalidStartingPoint,
    NoSplines,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decoder(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decoder(err) => write!(f, "error from entropy decoder: {}", err),
            Self::TooManySplines(num) => write!(f, "too many splines: {}", num),
            Self::TooManyControlPoints(num) => {
                write!(f, "too many spline control points: {}", num)
            },
            Self::SplineAreaTooLarge => write!(f, "estimated spline area is too large"),
            Self::EmptySpline => write!(f, "spline has no control points"),
            Self::DuplicateControlPoints => {
                write!(f, "consecutive control points are equal after rounding")
            },
            Self::InvalidStartingPoint => {
                write!(f, "starting point is out of the encodable range")
            },
            Self::NoSplines => write!(f, "spline collection is empty"),
        }
    }
}

impl From<jxl_entropy::Error> for Error {
    fn from(err: jxl_entropy::Error) -> Self {
        Self::Decoder(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
