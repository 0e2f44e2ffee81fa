//! Keyed frame-authentication tags.
//!
//! Every wire frame ends in an HMAC-SHA256 tag over the preceding fields,
//! hex-encoded to a fixed 64 characters. Verification recomputes the tag and
//! compares in constant time; the engine rejects a frame before parsing or
//! decrypting anything else in it.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded tag.
pub const TAG_HEX_LEN: usize = 64;

/// Compute the authentication tag for `data` under `key`.
///
/// Returns 64 lowercase hex characters (a 256-bit digest).
pub fn tag(key: &[u8], data: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a received tag against `data` under `key`.
///
/// Recomputes the tag and compares the raw digests with
/// [`ConstantTimeEq`], so the comparison cost does not depend on where the
/// first mismatching byte sits. A tag field of the wrong shape (length or
/// alphabet) fails immediately; the shape of the field is public.
pub fn verify(key: &[u8], data: &[u8], received_tag: &str) -> bool {
    if received_tag.len() != TAG_HEX_LEN {
        return false;
    }
    let Ok(received) = hex::decode(received_tag) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(data);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(received.as_slice()).into()
}
