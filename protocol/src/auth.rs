//! Backend session credentials.
//!
//! Session issuance (challenge signing, token exchange) happens outside this
//! crate. What arrives here is an opaque bearer token tied to the signer
//! address it was issued for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::primitives::Address;

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Header carrying the signer address the token was issued for.
pub const SIGNER_ADDRESS_HEADER: &str = "Signeraddress";

/// An authenticated backend session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Signer address the session belongs to.
    pub address: Address,
    /// Opaque bearer token.
    pub token: String,
}

impl Session {
    /// Wraps an issued token.
    pub fn new(address: Address, token: impl Into<String>) -> Self {
        Self {
            address,
            token: token.into(),
        }
    }

    /// Request headers identifying this session. The token is sent raw, with
    /// no `Bearer` prefix.
    pub fn headers(&self) -> [(&'static str, String); 2] {
        [
            (AUTHORIZATION_HEADER, self.token.clone()),
            (SIGNER_ADDRESS_HEADER, self.address.to_string()),
        ]
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_token_and_address() {
        let session = Session::new(Address::new([0x42; 32]), "tok_123");
        let headers = session.headers();
        assert_eq!(headers[0], (AUTHORIZATION_HEADER, "tok_123".to_string()));
        assert_eq!(headers[1].0, SIGNER_ADDRESS_HEADER);
        assert!(headers[1].1.starts_with("0x42"));
    }

    #[test]
    fn debug_hides_token() {
        let session = Session::new(Address::ZERO, "secret");
        assert!(!format!("{:?}", session).contains("secret"));
    }
}
