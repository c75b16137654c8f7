use crate::crypto::TokenIssuer;
use crate::database::Db;
use crate::{auth, models, Error, Result};

pub const MAX_TITLE_LEN : usize = 100;
pub const MAX_URL_LEN : usize = 255;

pub async fn list_links(
    db : &Db,
    tokens : &TokenIssuer,
    token : &str,
) -> Result<Vec<models::Link>> {
    let user = auth::authenticate(db, tokens, token).await?;

    db.get_links(user.id).await
}

/// Stores a link for the token's owner. The token is checked before the
/// fields, so a bad token is always reported as such.
pub async fn add_link(
    db : &Db,
    tokens : &TokenIssuer,
    token : &str,
    title : &str,
    url : &str,
) -> Result<models::Link> {
    let user = auth::authenticate(db, tokens, token).await?;

    validate(title, url)?;

    let link = db.insert_link(user.id, title, url).await?;
    tracing::debug!("user {} added link {}", user.id, link.id);

    Ok(link)
}

fn validate(title : &str, url : &str) -> Result<()> {
    if title.is_empty() || url.is_empty() {
        return Err(Error::InvalidLink("Missing title or url"));
    }

    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidLink("Title too long"));
    }

    if url.chars().count() > MAX_URL_LEN {
        return Err(Error::InvalidLink("Url too long"));
    }

    if title.contains('\0') || url.contains('\0') {
        return Err(Error::InvalidLink("Invalid title or url"));
    }

    Ok(())
}
