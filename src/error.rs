use std::fmt;
use std::io;

#[derive(Debug)]
pub enum StokesError {
    Io(io::Error),
    Table(String),
    Param(String),
}

impl fmt::Display for StokesError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StokesError::Io(ref err) => write!(f, "IO error: {}", err),
            StokesError::Table(ref msg) => write!(f, "Table error: {}", msg),
            StokesError::Param(ref msg) => write!(f, "Parameter error: {}", msg),
        }
    }
}

impl std::error::Error for StokesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            StokesError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StokesError {
    fn from(err: io::Error) -> StokesError {
        StokesError::Io(err)
    }
}
