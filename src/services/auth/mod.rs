pub mod password;
pub mod principal;
pub mod token_codec;

pub use password::PasswordHasher;
pub use principal::{Principal, PrincipalLookup, UserDirectory};
pub use token_codec::TokenCodec;
