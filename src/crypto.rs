use std::time;

use jsonwebtoken as jwt;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Hashes `pass` with argon2id under a fresh random salt. The result is the
/// PHC-encoded string, which carries its own salt and parameters.
pub fn encode_password(pass : &[u8]) -> Result<String> {
    let mut salt = [0; 32];
    thread_rng().fill(&mut salt[..]);

    let config = argon2::Config {
        variant : argon2::Variant::Argon2id,
        ..Default::default()
    };

    Ok(argon2::hash_encoded(pass, &salt, &config)?)
}

pub fn verify_password(encoded : &str, pass : &[u8]) -> Result<bool> {
    Ok(argon2::verify_encoded(encoded, pass)?)
}

#[derive(Serialize, Deserialize)]
struct Claims {
    iss : String,
    aud : String,
    sub : String,
    iat : u64,
    exp : u64,
}

/// Mints and checks the bearer tokens handed out by `/login`.
///
/// Tokens are HS256 JWTs whose subject is the user id. They carry no server
/// side state and cannot be revoked before `exp`.
pub struct TokenIssuer {
    secret :      Vec<u8>,
    server_name : String,
    ttl :         time::Duration,
}

impl TokenIssuer {
    pub fn new(
        secret : impl Into<Vec<u8>>,
        server_name : impl Into<String>,
        ttl : time::Duration,
    ) -> Self {
        Self {
            secret :      secret.into(),
            server_name : server_name.into(),
            ttl,
        }
    }

    pub fn issue(&self, user_id : i64) -> Result<String> {
        let now = time::SystemTime::now();

        let iat = now.duration_since(time::UNIX_EPOCH)?.as_secs();

        let exp = now
            .checked_add(self.ttl)
            .ok_or(Error::TokenDurationTooBig)?
            .duration_since(time::UNIX_EPOCH)?
            .as_secs();

        let claims = Claims {
            iss : self.server_name.clone(),
            aud : self.server_name.clone(),
            sub : user_id.to_string(),
            iat,
            exp,
        };

        Ok(jwt::encode(
            &jwt::Header::new(jwt::Algorithm::HS256),
            &claims,
            &jwt::EncodingKey::from_secret(&self.secret),
        )?)
    }

    /// Returns the user id a token was issued for. Every way a token can be
    /// wrong collapses into [`Error::Unauthorized`].
    pub fn verify(&self, token : &str) -> Result<i64> {
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.set_issuer(&[&self.server_name]);
        validation.set_audience(&[&self.server_name]);

        let claims = jwt::decode::<Claims>(
            token,
            &jwt::DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|err| {
            tracing::debug!("rejected token: {:?}", err.kind());
            Error::Unauthorized
        })?
        .claims;

        claims.sub.parse::<i64>().map_err(|_| Error::Unauthorized)
    }
}
