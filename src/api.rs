use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

use crate::crypto::TokenIssuer;
use crate::database::Db;
use crate::error::{Error, ErrorCell, ErrorKind};
use crate::{auth, links};

const MAX_BODY_BYTES : u64 = 16 * 1024;

pub struct ServerInner {
    pub db :     Db,
    pub tokens : TokenIssuer,
}

pub type Server = Arc<ServerInner>;

type HandlerResult = Result<reply::WithStatus<reply::Json>, Rejection>;

#[derive(Serialize)]
struct Msg {
    msg : &'static str,
}

fn with_server(
    server : &Server,
) -> impl Filter<Extract = (Server,), Error = Infallible> + Clone {
    let server = Arc::clone(server);
    warp::any().map(move || Arc::clone(&server))
}

/// Extracts the bearer token from the `Authorization` header.
fn with_token() -> impl Filter<Extract = (String,), Error = Rejection> + Clone
{
    warp::header::optional::<String>("authorization").and_then(
        |header : Option<String>| async move {
            header
                .as_deref()
                .and_then(bearer_token)
                .map(str::to_string)
                .ok_or_else(|| Rejection::from(Error::Unauthorized))
        },
    )
}

// Auth schemes are case-insensitive (RFC 7235).
fn bearer_token(header : &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T : for<'de> Deserialize<'de> + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

#[derive(Deserialize)]
struct Credentials {
    username : Option<String>,
    password : Option<String>,
}

#[derive(Default, Deserialize)]
struct NewLink {
    title : Option<String>,
    url :   Option<String>,
}

/// A link body where no body at all reads as one with no fields.
fn link_body() -> impl Filter<Extract = (NewLink,), Error = Rejection> + Clone
{
    let empty = warp::header::optional::<u64>("content-length")
        .and(warp::header::optional::<String>("transfer-encoding"))
        .and_then(|len : Option<u64>, chunked : Option<String>| async move {
            match (len, chunked) {
                (None | Some(0), None) => Ok(NewLink::default()),
                _ => Err(warp::reject()),
            }
        });

    empty.or(json_body()).unify()
}

#[derive(Serialize)]
struct AccessToken {
    access_token : String,
}

pub fn routes(
    server : &Server,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    post_register(server)
        .or(post_login(server))
        .unify()
        .or(get_links(server))
        .unify()
        .or(post_links(server))
        .unify()
        .recover(recover)
        .with(warp::log::custom(|info| {
            tracing::info!(
                "{} {} {} in {:?}",
                info.status(),
                info.method(),
                info.path(),
                info.elapsed()
            );
        }))
}

fn post_register(
    server : &Server,
) -> impl Filter<Extract = (reply::WithStatus<reply::Json>,), Error = Rejection>
       + Clone {
    warp::path!("register")
        .and(warp::post())
        .and(with_server(server))
        .and(json_body())
        .and_then(|server : Server, body : Credentials| async move {
            auth::register(
                &server.db,
                body.username.as_deref().unwrap_or_default(),
                body.password.as_deref().unwrap_or_default(),
            )
            .await?;

            let res = Msg {
                msg : "User created",
            };
            HandlerResult::Ok(reply::with_status(
                reply::json(&res),
                StatusCode::CREATED,
            ))
        })
}

fn post_login(
    server : &Server,
) -> impl Filter<Extract = (reply::WithStatus<reply::Json>,), Error = Rejection>
       + Clone {
    warp::path!("login")
        .and(warp::post())
        .and(with_server(server))
        .and(json_body())
        .and_then(|server : Server, body : Credentials| async move {
            let token = auth::login(
                &server.db,
                &server.tokens,
                body.username.as_deref().unwrap_or_default(),
                body.password.as_deref().unwrap_or_default(),
            )
            .await?;

            let res = AccessToken {
                access_token : token,
            };
            HandlerResult::Ok(reply::with_status(
                reply::json(&res),
                StatusCode::OK,
            ))
        })
}

fn get_links(
    server : &Server,
) -> impl Filter<Extract = (reply::WithStatus<reply::Json>,), Error = Rejection>
       + Clone {
    warp::path!("api" / "links")
        .and(warp::get())
        .and(with_server(server))
        .and(with_token())
        .and_then(|server : Server, token : String| async move {
            let links =
                links::list_links(&server.db, &server.tokens, &token).await?;

            HandlerResult::Ok(reply::with_status(
                reply::json(&links),
                StatusCode::OK,
            ))
        })
}

fn post_links(
    server : &Server,
) -> impl Filter<Extract = (reply::WithStatus<reply::Json>,), Error = Rejection>
       + Clone {
    warp::path!("api" / "links")
        .and(warp::post())
        .and(with_server(server))
        .and(with_token())
        .and(link_body())
        .and_then(
            |server : Server, token : String, body : NewLink| async move {
                let link = links::add_link(
                    &server.db,
                    &server.tokens,
                    &token,
                    body.title.as_deref().unwrap_or_default(),
                    body.url.as_deref().unwrap_or_default(),
                )
                .await?;

                HandlerResult::Ok(reply::with_status(
                    reply::json(&link),
                    StatusCode::CREATED,
                ))
            },
        )
}

async fn recover(err : Rejection) -> Result<Response, Infallible> {
    let err = if let Some(cell) = err.find::<ErrorCell>() {
        cell.take().unwrap_or(Error::Internal)
    } else if err.is_not_found() {
        Error::RouteNotFound
    // A sibling route on the same path also rejects with
    // MethodNotAllowed, so the more specific causes go first.
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::PayloadTooLarge>().is_some()
        || err.find::<warp::reject::LengthRequired>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        Error::BadRequest
    } else if let Some(header) = err.find::<warp::reject::InvalidHeader>() {
        if header.name().eq_ignore_ascii_case("authorization") {
            Error::Unauthorized
        } else {
            Error::BadRequest
        }
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        Error::MethodNotAllowed
    } else {
        tracing::error!("unhandled rejection: {:?}", err);
        Error::Internal
    };

    Ok(err.into_response())
}

impl Reject for ErrorCell {}

impl From<Error> for Rejection {
    fn from(err : Error) -> Rejection {
        warp::reject::custom(ErrorCell::new(err))
    }
}

impl Reply for Error {
    fn into_response(self) -> Response {
        use Error::*;

        let (status, msg) = match &self {
            InvalidCredentials(msg) => (StatusCode::BAD_REQUEST, *msg),
            InvalidLink(msg) => (StatusCode::UNPROCESSABLE_ENTITY, *msg),
            DuplicateName(_) => (StatusCode::BAD_REQUEST, "Username exists"),
            BadRequest => (StatusCode::BAD_REQUEST, "Malformed request body"),
            FailedLogin => {
                (StatusCode::UNAUTHORIZED, "Bad username or password")
            },
            Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Missing or invalid token")
            },
            RouteNotFound => (StatusCode::NOT_FOUND, "Route not found"),
            MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
            },
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        if self.kind() == ErrorKind::Internal {
            tracing::error!("{:?}", &self);
        } else {
            tracing::warn!("{:?}", &self);
        }

        reply::with_status(reply::json(&Msg { msg }), status).into_response()
    }
}
