//! Random serial numbers and random private keys for test certificates.

use p256::ecdsa::SigningKey as P256SigningKey;
use rand_core::{OsRng, RngCore};

use crate::error::{Result, TestCertError};
use crate::key::KeyPair;

/// Exclusive upper bound of generated serial numbers.
pub const SERIAL_LIMIT: u64 = i64::MAX as u64;

fn random_source_error(err: rand_core::Error) -> TestCertError {
    TestCertError::RandomSourceError(err.to_string())
}

/// Draws a uniformly random serial number in `[0, 2^63 - 1)` from the
/// operating system's entropy source.
pub fn rand_serial() -> Result<u64> {
    let mut rng = OsRng;
    loop {
        let mut bytes = [0u8; 8];
        rng.try_fill_bytes(&mut bytes).map_err(random_source_error)?;
        let candidate = u64::from_be_bytes(bytes) & SERIAL_LIMIT;
        if candidate < SERIAL_LIMIT {
            return Ok(candidate);
        }
    }
}

/// Generates a fresh ECDSA P-256 key pair from the operating system's entropy
/// source.
pub fn rand_key() -> Result<KeyPair> {
    let mut rng = OsRng;
    loop {
        let mut bytes = [0u8; 32];
        rng.try_fill_bytes(&mut bytes).map_err(random_source_error)?;
        // Zero and out-of-range scalars are rejected and redrawn.
        if let Ok(signing_key) = P256SigningKey::from_slice(&bytes) {
            return Ok(signing_key.into());
        }
    }
}
