use rusqlite::{ffi, Connection};
use tokio::sync::Mutex;

use crate::{models, Error, Result};

const SCHEMA : &str = include_str!("schema.sql");

const SQLITE_CONSTRAINT_CHECK : i64 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY : i64 = 787;
const SQLITE_CONSTRAINT_UNIQUE : i64 = 2067;

fn error_code_match(
    err : &rusqlite::Error,
    code : ffi::ErrorCode,
    ext : i64,
) -> bool {
    matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == code
                && i64::from(e.extended_code) == ext)
}

macro_rules! db_method {
        ($name:ident (
            &$self:ident,
            $conn:ident,
            $($pname:ident : $ptype:ty),*
        ) -> $ret:ty $body:block ) => {
            pub async fn $name (&$self, $( $pname : $ptype, )* ) -> $ret {
                let $conn = $self.conn.lock().await;
                tokio::task::block_in_place(|| $body)
            }
        }
    }

/// The credential store. A single connection behind an async mutex, so
/// writes are serialized and uniqueness is left to SQLite's constraints.
///
/// Every method runs its statement under `block_in_place` and therefore
/// needs the multi-threaded runtime.
pub struct Db {
    conn : Mutex<Connection>,
}

impl Db {
    /// Opens (or creates) the store at `p` and applies the schema.
    pub fn new<P : AsRef<std::path::Path>>(p : P) -> Result<Self> {
        Self::from_connection(Connection::open(p)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn : Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", &"ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn : Mutex::new(conn),
        })
    }

    db_method! {insert_user(
        &self,
        conn,
        username : &str,
        password : &str
    ) -> Result<i64> {
        conn
            .prepare_cached(
                "INSERT INTO users (username, password) VALUES (?, ?)"
            )?
            .execute(rusqlite::params![username, password])
            .map_err(|err| {
                if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    SQLITE_CONSTRAINT_UNIQUE
                ) {
                    Error::DuplicateName(username.to_string())
                } else if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    SQLITE_CONSTRAINT_CHECK
                ) {
                    Error::InvalidCredentials("Invalid username or password")
                } else {
                    err.into()
                }
            })?;

        Ok(conn.last_insert_rowid())
    }}

    db_method! {get_user(&self, conn, user_id : i64) -> Result<models::User> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, username, password FROM users WHERE users.id = ?"
        )?;

        let mut rows = stmt.query(rusqlite::params![user_id])?;

        let row = rows.next()?
            .ok_or(Error::UserIdNotFound(user_id))?;

        row_parse(row)
    }}

    db_method! {get_user_by_name(
        &self,
        conn,
        username : &str
    ) -> Result<models::User> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, username, password FROM users WHERE users.username = ?"
        )?;

        let mut rows = stmt.query(rusqlite::params![username])?;

        let row = rows.next()?
            .ok_or_else(|| Error::UserNameNotFound(username.to_string()))?;

        row_parse(row)
    }}

    // Owned links go with the user through ON DELETE CASCADE.
    db_method! {delete_user(&self, conn, user_id : i64) -> Result<()> {
        let n = conn
            .prepare_cached("DELETE FROM users WHERE users.id = ?")?
            .execute(rusqlite::params![user_id])?;

        if n == 0 {
            return Err(Error::UserIdNotFound(user_id));
        }

        Ok(())
    }}

    db_method! {insert_link(
        &self,
        conn,
        user_id : i64,
        title : &str,
        url : &str
    ) -> Result<models::Link> {
        conn
            .prepare_cached(
                "INSERT INTO links (title, url, user_id) VALUES (?, ?, ?)"
            )?
            .execute(rusqlite::params![title, url, user_id])
            .map_err(|err| {
                if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    SQLITE_CONSTRAINT_FOREIGNKEY
                ) {
                    Error::UserIdNotFound(user_id)
                } else if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    SQLITE_CONSTRAINT_CHECK
                ) {
                    Error::InvalidLink("Invalid title or url")
                } else {
                    err.into()
                }
            })?;

        Ok(models::Link {
            id :      conn.last_insert_rowid(),
            title :   title.to_string(),
            url :     url.to_string(),
            user_id,
        })
    }}

    db_method! {get_links(
        &self,
        conn,
        user_id : i64
    ) -> Result<Vec<models::Link>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, url, user_id FROM links \
             WHERE links.user_id = ? ORDER BY links.id"
        )?;

        let mut rows = stmt
            .query(rusqlite::params![user_id])?;

        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(row_parse::<models::Link>(row)?);
        }

        Ok(links)
    }}
}

fn row_parse<T : FromRow>(row : &rusqlite::Row<'_>) -> Result<T> {
    T::from_row(row)
}

trait FromRow: Sized {
    fn from_row(row : &rusqlite::Row<'_>) -> Result<Self>;
}

macro_rules! impl_from_row {
        ($ty:ty { $($field:ident),* }) => {
            impl FromRow for $ty {
                fn from_row(row : &rusqlite::Row<'_>) -> Result<$ty> {
                    Ok(Self{
                    $(
                        $field : row.get(stringify!($field))?,
                    )*
                    })
                }
            }
        }
    }

impl_from_row! {models::User {
    id, username, password
}}

impl_from_row! {models::Link {
    id, title, url, user_id
}}
