use serde::Serialize;

/// A registered account. `password` holds the encoded argon2 hash and must
/// never reach a response body, hence no `Serialize`.
#[derive(Debug)]
pub struct User {
    pub id :       i64,
    pub username : String,
    pub password : String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id :      i64,
    pub title :   String,
    pub url :     String,
    #[serde(skip_serializing)]
    pub user_id : i64,
}
