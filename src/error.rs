use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// A vendor-reported or requested mode outside the known set.
    UnsupportedMode {
        mode: String,
        supported: Vec<&'static str>,
    },
    UnsupportedOperation(&'static str),
    UnknownThermostat(u64),
    UnknownZone(u64),
    MissingField(String),
    NotSupported(&'static str),
    InvalidValue(String),
    InvalidSetpoints(String),
    /// Service call data rejected by its schema.
    Validation(String),
    NoSnapshot,
    /// The mobile API redirected to its login page.
    SessionExpired,
    UnknownService(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::UnsupportedMode { mode, supported } => write!(
                f,
                "operation mode {mode} not in the supported operations list {supported:?}"
            ),
            Error::UnsupportedOperation(op) => write!(f, "{op} is not supported by this device"),
            Error::UnknownThermostat(id) => write!(f, "unknown thermostat: {id}"),
            Error::UnknownZone(id) => write!(f, "unknown zone: {id}"),
            Error::MissingField(path) => write!(f, "missing field in house data: {path}"),
            Error::NotSupported(what) => write!(f, "this thermostat does not support {what}"),
            Error::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            Error::InvalidSetpoints(msg) => write!(f, "invalid setpoints: {msg}"),
            Error::Validation(msg) => write!(f, "invalid service data: {msg}"),
            Error::NoSnapshot => write!(f, "no house data fetched yet"),
            Error::SessionExpired => write!(f, "session expired (redirected to login)"),
            Error::UnknownService(name) => write!(f, "unknown service: {name}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
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

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
