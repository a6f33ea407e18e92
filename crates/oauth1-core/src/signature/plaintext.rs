//! PLAINTEXT (RFC 5849 Section 3.4.4).
//!
//! The signature is the shared-secret key itself; the base string is ignored.

use subtle::ConstantTimeEq;

pub(crate) fn sign(key: &str) -> String {
    key.to_owned()
}

pub(crate) fn verify(key: &str, signature: &str) -> bool {
    key.as_bytes().ct_eq(signature.as_bytes()).into()
}
