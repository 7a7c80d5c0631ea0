mod crypto;
mod jwt;
mod strength;

pub use crypto::*;
pub use jwt::*;
pub use strength::*;
