// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Random identifier generation.
//!
//! Produces collision-resistant string identifiers for sessions, records,
//! and anonymous users. Identifiers are drawn from a fixed alphabet using a
//! cryptographically strong random source and are never the all-`'0'`
//! string, which downstream consumers reserve as a sentinel.

use rand::RngCore;

use crate::error::IdentifierError;

/// Hex alphabet used for session and record identifiers.
pub const HEX_ALPHABET: &[u8] = b"0123456789abcdef";

/// URL-safe alphabet used for anonymous user identifiers.
pub const URL_SAFE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Length of session identifiers.
pub const SESSION_ID_LEN: usize = 32;

/// Length of record identifiers.
pub const RECORD_ID_LEN: usize = 32;

/// Length of anonymous user identifiers.
pub const USER_ID_LEN: usize = 24;

/// Generate an identifier of exactly `length` characters from `alphabet`.
///
/// Fails only on a zero length, which is a caller bug.
pub fn generate(alphabet: &[u8], length: usize) -> Result<String, IdentifierError> {
    if length == 0 {
        return Err(IdentifierError::InvalidLength(length));
    }
    Ok(generate_unchecked(alphabet, length))
}

/// Fresh session identifier (32 hex chars).
pub fn session_id() -> String {
    generate_unchecked(HEX_ALPHABET, SESSION_ID_LEN)
}

/// Fresh record identifier (32 hex chars).
pub fn record_id() -> String {
    generate_unchecked(HEX_ALPHABET, RECORD_ID_LEN)
}

/// Fresh anonymous user identifier (24 URL-safe chars).
pub fn user_id() -> String {
    generate_unchecked(URL_SAFE_ALPHABET, USER_ID_LEN)
}

fn generate_unchecked(alphabet: &[u8], length: usize) -> String {
    // Bit mask sized to the alphabet keeps rejection sampling from a byte
    // stream cheap; for power-of-two alphabets no byte is ever rejected.
    let mask = (alphabet.len() - 1).next_power_of_two() - 1;
    // Batch size amortizes rejections so one fill usually suffices.
    let step =
        (1.6 * (mask + 1) as f64 * length as f64 / alphabet.len() as f64).ceil() as usize;

    let mut rng = rand::thread_rng();
    let mut bytes = vec![0u8; step];
    let mut out = String::with_capacity(length);

    loop {
        rng.fill_bytes(&mut bytes);
        for &byte in &bytes {
            let idx = (byte as usize) & mask;
            if idx >= alphabet.len() {
                continue;
            }
            out.push(alphabet[idx] as char);
            if out.len() == length {
                if out.bytes().all(|b| b == b'0') {
                    // All-zero is reserved; resample.
                    out.clear();
                    continue;
                }
                return out;
            }
        }
    }
}
