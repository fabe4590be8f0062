use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Xml(String),
    Io(std::io::Error),
    Closed,
    NoSnapshot,
    MissingData(String),
    InvalidMeasurement { point_log_id: String, value: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Xml(msg) => write!(f, "malformed XML: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Closed => write!(f, "connection closed"),
            Error::NoSnapshot => write!(f, "no domain objects fetched yet"),
            Error::MissingData(what) => write!(f, "missing data: {what}"),
            Error::InvalidMeasurement {
                point_log_id,
                value,
            } => write!(f, "point log {point_log_id}: not a number: {value:?}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
