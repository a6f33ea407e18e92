//! RSA-SHA1 (RFC 5849 Section 3.4.3): PKCS#1 v1.5 signatures over SHA-1.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::error::OAuthError;

/// Sign data with RSA-SHA1 and return base64-encoded signature.
pub(crate) fn sign(private_key: Option<&RsaPrivateKey>, base_string: &str) -> Result<String, OAuthError> {
    let private_key = private_key.ok_or_else(|| {
        OAuthError::Configuration("RSA-SHA1 signing requires the consumer's private key".to_owned())
    })?;

    let signing_key = SigningKey::<Sha1>::new(private_key.clone());
    let signature = signing_key
        .try_sign(base_string.as_bytes())
        .map_err(|e| OAuthError::Configuration(format!("RSA-SHA1 signing failed: {e}")))?;
    Ok(BASE64_STANDARD.encode(signature.to_bytes()))
}

/// Check a base64-encoded RSA-SHA1 signature.
///
/// A signature that is not valid base64 or has the wrong length is simply invalid.
pub(crate) fn verify(
    public_key: Option<&RsaPublicKey>,
    base_string: &str,
    signature: &str,
) -> Result<bool, OAuthError> {
    let public_key = public_key.ok_or_else(|| {
        OAuthError::Configuration(
            "RSA-SHA1 verification requires the consumer's public key".to_owned(),
        )
    })?;

    let Ok(bytes) = BASE64_STANDARD.decode(signature) else {
        return Ok(false);
    };
    let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
        return Ok(false);
    };

    let verifying_key = VerifyingKey::<Sha1>::new(public_key.clone());
    Ok(verifying_key
        .verify(base_string.as_bytes(), &signature)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::load_private_key;
    use crate::key::tests::{TEST_PKCS1_KEY, TEST_PKCS8_KEY};

    const BASE_STRING: &str = "GET&http%3A%2F%2Fexample.com%2Fr&oauth_nonce%3Dn";

    fn key_pair(pem: &str) -> (RsaPrivateKey, RsaPublicKey) {
        let private = load_private_key(pem.as_bytes()).unwrap();
        let public = private.to_public_key();
        (private, public)
    }

    #[test]
    fn test_matching_pair_verifies() {
        let (private, public) = key_pair(TEST_PKCS8_KEY);
        let signature = sign(Some(&private), BASE_STRING).unwrap();

        assert!(verify(Some(&public), BASE_STRING, &signature).unwrap());
        assert!(!verify(Some(&public), "GET&other&", &signature).unwrap());
    }

    #[test]
    fn test_mismatched_pair_fails() {
        let (private, _) = key_pair(TEST_PKCS8_KEY);
        let (_, other_public) = key_pair(TEST_PKCS1_KEY);
        let signature = sign(Some(&private), BASE_STRING).unwrap();

        assert!(!verify(Some(&other_public), BASE_STRING, &signature).unwrap());
    }

    #[test]
    fn test_signature_is_deterministic() {
        let (private, _) = key_pair(TEST_PKCS1_KEY);
        assert_eq!(
            sign(Some(&private), BASE_STRING).unwrap(),
            sign(Some(&private), BASE_STRING).unwrap()
        );
    }

    #[test]
    fn test_garbage_signature_is_invalid() {
        let (_, public) = key_pair(TEST_PKCS8_KEY);
        assert!(!verify(Some(&public), BASE_STRING, "not base64!").unwrap());
        assert!(!verify(Some(&public), BASE_STRING, "AAAA").unwrap());
    }

    #[test]
    fn test_missing_keys_are_configuration_errors() {
        assert!(matches!(
            sign(None, BASE_STRING),
            Err(OAuthError::Configuration(_))
        ));
        assert!(matches!(
            verify(None, BASE_STRING, "AAAA"),
            Err(OAuthError::Configuration(_))
        ));
    }
}
