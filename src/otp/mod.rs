//! # Signer One-Time Codes
//!
//! Six-digit codes are never stored; the signer row keeps
//! `HMAC-SHA256(salt, code)` as hex next to a random per-code salt.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub mod service;

pub use service::SignerOtpService;

type HmacSha256 = Hmac<Sha256>;

pub const CODE_DIGITS: usize = 6;
const SALT_BYTES: usize = 16;

/// Uniformly random zero-padded six-digit code.
pub fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:06}")
}

/// Fresh random salt, hex encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// Hex HMAC-SHA256 of `code` keyed by `salt`.
pub fn hash_code(salt: &str, code: &str) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())?;
    mac.update(code.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `code` against a stored hash.
pub fn verify_code(salt: &str, code: &str, stored_hash: &str) -> bool {
    let Ok(stored) = hex::decode(stored_hash) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(salt.as_bytes()) else {
        return false;
    };
    mac.update(code.as_bytes());
    let expected = mac.finalize().into_bytes();

    ConstantTimeEq::ct_eq(expected.as_slice(), stored.as_slice()).into()
}
