use std::sync::Mutex;

use quick_from::QuickFrom;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(QuickFrom, Debug)]
pub enum Error {
    /// Registration body is missing a field or a field is out of bounds.
    InvalidCredentials(&'static str),
    /// Link body is missing a field or a field is out of bounds.
    InvalidLink(&'static str),
    DuplicateName(String),
    TokenDurationTooBig,
    UserNameNotFound(String),
    UserIdNotFound(i64),
    FailedLogin,
    Unauthorized,
    BadRequest,
    RouteNotFound,
    MethodNotAllowed,
    Internal,

    #[quick_from]
    Sqlite(rusqlite::Error),

    #[quick_from]
    Time(std::time::SystemTimeError),

    #[quick_from]
    Jwt(jsonwebtoken::errors::Error),

    #[quick_from]
    Argon2(argon2::Error),
}

/// Coarse classification of an [`Error`], the part a client is allowed to
/// learn about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    Unauthorized,
    NotFound,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            InvalidCredentials(_) | InvalidLink(_) | BadRequest => {
                ErrorKind::InvalidInput
            },
            DuplicateName(_) => ErrorKind::Conflict,
            FailedLogin | Unauthorized => ErrorKind::Unauthorized,
            RouteNotFound | MethodNotAllowed => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }
}

/// Lets an [`Error`] travel through a warp rejection, which only hands out
/// shared references.
#[derive(Debug)]
pub struct ErrorCell(Mutex<Option<Error>>);

impl ErrorCell {
    pub fn new(err : Error) -> Self {
        Self(Mutex::new(Some(err)))
    }

    pub fn take(&self) -> Option<Error> {
        self.0.lock().ok().and_then(|mut err| err.take())
    }
}
