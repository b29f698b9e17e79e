/// Authentication module
///
/// Token signing/verification, password comparison, login and
/// refresh-token renewal.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{
    AccessClaims, RefreshClaims, RegisteredClaims, TokenKind, TokenPair, VerifiableClaims,
};
pub use jwt::TokenCodec;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::{refresh_cookie, Reissued, RefreshHandler};
pub use session::{Credentials, Session, SessionIssuer};
