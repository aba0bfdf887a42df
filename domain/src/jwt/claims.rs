//! Claims carried by the bearer tokens that gate write endpoints.
//!
//! Tokens are issued elsewhere; this service only verifies them and reads
//! whether the holder may administer the corpus.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user id assigned by the issuer
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// Expiry as seconds since the Unix epoch
    pub exp: usize,
}
