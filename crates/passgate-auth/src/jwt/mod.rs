//! Access-token encoding/verification and refresh-token generation.

pub mod claims;
pub mod codec;

pub use claims::AccessClaims;
pub use codec::{IssuedTokens, TokenCodec, TokenError};
