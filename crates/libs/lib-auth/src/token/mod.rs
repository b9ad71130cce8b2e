//! # Bearer Token Payloads
//!
//! Reads the claims segment of a JWT carried in an `Authorization` header.
//!
//! Signatures are **not** verified here. Tokens are expected to have been
//! checked by the API gateway in front of the service; this module only
//! decodes what the gateway let through.

use jsonwebtoken::{encode, EncodingKey, Header};
use lib_utils::b64::b64u_decode;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// Length of the `"Bearer "` scheme prefix.
const SCHEME_PREFIX_LEN: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bearer token required")]
    BearerRequired,

    #[error("jwt token required")]
    JwtRequired,

    #[error("token payload is not valid base64url: {0}")]
    Decode(#[from] lib_utils::b64::Error),

    #[error("token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Identity claims. Issuers disagree on the key, so both `id` and `user_id`
/// are accepted. A missing or `null` key reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub user_id: i64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_default())
}

impl UserClaims {
    /// `id` when set, else `user_id`; zero means unset.
    pub fn subject(&self) -> Option<i64> {
        [self.id, self.user_id].into_iter().find(|id| *id != 0)
    }
}

/// Decode the payload of a `Bearer <header>.<payload>.<signature>` value.
///
/// The first seven characters are taken to be the scheme and skipped without
/// inspection.
pub fn parse_jwt_payload<T: DeserializeOwned>(authorization: &str) -> Result<T> {
    let token = authorization
        .get(SCHEME_PREFIX_LEN..)
        .ok_or(Error::BearerRequired)?;

    let segments: Vec<&str> = token.splitn(3, '.').collect();
    if segments.len() < 3 {
        return Err(Error::JwtRequired);
    }

    let payload = b64u_decode(segments[1])?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Sign `claims` with HS256.
///
/// Services never need this at runtime; it exists so tests can impersonate
/// users with well-formed tokens.
pub fn encode_jwt<T: Serialize>(claims: &T, secret: &str) -> Result<String> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}
