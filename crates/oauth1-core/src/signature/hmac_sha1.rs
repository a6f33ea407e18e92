//! HMAC-SHA1 (RFC 5849 Section 3.4.2).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// `base64(HMAC-SHA1(key, base_string))`.
pub(crate) fn sign(key: &str, base_string: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can accept any key length");
    mac.update(base_string.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

pub(crate) fn verify(key: &str, base_string: &str, signature: &str) -> bool {
    let expected = sign(key, base_string);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
