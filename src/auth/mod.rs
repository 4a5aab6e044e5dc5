/// Authentication module
///
/// JWT issuing/validation, password hashing, refresh token hashing and the
/// service that ties them to the stores.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::{Claims, TokenType};
pub use jwt::TokenCodec;
pub use password::{validate_password, BcryptPasswordHasher, PasswordHasher};
pub use refresh_token::hash_token;
pub use service::{AuthService, TokenPair};
