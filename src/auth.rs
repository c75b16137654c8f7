use crate::crypto::{self, TokenIssuer};
use crate::database::Db;
use crate::{models, Error, Result};

pub const MAX_USERNAME_LEN : usize = 80;

/// Creates an account. Duplicate names are caught by the store's UNIQUE
/// constraint, so two racing registrations cannot both succeed.
pub async fn register(db : &Db, username : &str, password : &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(Error::InvalidCredentials("Missing data"));
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::InvalidCredentials("Username too long"));
    }

    // SQLite's length() stops at the first NUL.
    if username.contains('\0') || password.contains('\0') {
        return Err(Error::InvalidCredentials("Invalid username or password"));
    }

    let encoded = tokio::task::block_in_place(|| {
        crypto::encode_password(password.as_bytes())
    })?;

    let id = db.insert_user(username, &encoded).await?;
    tracing::info!("registered user {} ({})", id, username);

    Ok(())
}

/// Exchanges credentials for a bearer token.
///
/// An unknown name and a wrong password both fail with
/// [`Error::FailedLogin`], and both pay for one argon2 hash.
pub async fn login(
    db : &Db,
    tokens : &TokenIssuer,
    username : &str,
    password : &str,
) -> Result<String> {
    let user = match db.get_user_by_name(username).await {
        Ok(u) => u,
        Err(Error::UserNameNotFound(_)) => {
            tokio::task::block_in_place(|| {
                crypto::encode_password(password.as_bytes())
            })?;
            return Err(Error::FailedLogin);
        },
        Err(err) => return Err(err),
    };

    let ok = tokio::task::block_in_place(|| {
        crypto::verify_password(&user.password, password.as_bytes())
    })?;

    if !ok {
        return Err(Error::FailedLogin);
    }

    tokens.issue(user.id)
}

/// Resolves a bearer token to its owner. Tokens outliving their user are
/// treated like any other bad token.
pub async fn authenticate(
    db : &Db,
    tokens : &TokenIssuer,
    token : &str,
) -> Result<models::User> {
    let user_id = tokens.verify(token)?;

    match db.get_user(user_id).await {
        Ok(user) => Ok(user),
        Err(Error::UserIdNotFound(_)) => Err(Error::Unauthorized),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ErrorKind;

    fn setup() -> (Db, TokenIssuer) {
        (
            Db::open_in_memory().unwrap(),
            TokenIssuer::new("secret", "links.test", Duration::from_secs(900)),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn register_then_login() {
        let (db, tokens) = setup();

        register(&db, "alice", "pw1").await.unwrap();
        let token = login(&db, &tokens, "alice", "pw1").await.unwrap();

        let user = authenticate(&db, &tokens, &token).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_ne!(user.password, "pw1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn register_rejects_empty_fields() {
        let (db, _) = setup();

        for (name, pass) in [("", "pw"), ("alice", ""), ("", "")] {
            let err = register(&db, name, pass).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }

        for (name, pass) in [("\0x", "pw"), ("alice", "p\0w")] {
            let err = register(&db, name, pass).await.unwrap_err();
            assert!(matches!(err, Error::InvalidCredentials(_)));
        }

        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        let err = register(&db, &long, "pw").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn register_twice_conflicts() {
        let (db, _) = setup();

        register(&db, "alice", "pw1").await.unwrap();
        let err = register(&db, "alice", "pw2").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn login_failures_are_indistinguishable() {
        let (db, tokens) = setup();
        register(&db, "alice", "pw1").await.unwrap();

        let wrong_pass = login(&db, &tokens, "alice", "nope").await;
        let no_user = login(&db, &tokens, "bob", "pw1").await;

        assert!(matches!(wrong_pass, Err(Error::FailedLogin)));
        assert!(matches!(no_user, Err(Error::FailedLogin)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_user_still_pays_for_a_hash() {
        let (db, tokens) = setup();
        register(&db, "alice", "pw1").await.unwrap();

        let start = std::time::Instant::now();
        let _ = login(&db, &tokens, "alice", "nope").await;
        let wrong_pass = start.elapsed();

        let start = std::time::Instant::now();
        let _ = login(&db, &tokens, "bob", "nope").await;
        let no_user = start.elapsed();

        assert!(
            no_user * 4 >= wrong_pass,
            "unknown user took {:?}, wrong password {:?}",
            no_user,
            wrong_pass
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn token_for_deleted_user_is_unauthorized() {
        let (db, tokens) = setup();
        register(&db, "alice", "pw1").await.unwrap();
        let token = login(&db, &tokens, "alice", "pw1").await.unwrap();

        let user = db.get_user_by_name("alice").await.unwrap();
        db.delete_user(user.id).await.unwrap();

        assert!(matches!(
            authenticate(&db, &tokens, &token).await,
            Err(Error::Unauthorized)
        ));
    }
}
