/// Agora Crypto Library
///
/// One-way password hashing for stored user credentials (Argon2id).
/// Plaintext passwords never leave this crate in any reversible form.

pub mod password;

pub use password::{hash_password, verify_password};
