//! Signature methods and the registry that maps method names to them.
//!
//! The three methods of RFC 5849 are built in as [`Algorithm`] variants.
//! Further methods implement [`SignatureMethod`] and are added with
//! [`SignatureMethodRegistry::register`].
//!
//! # Example
//!
//! ```
//! use oauth1_core::signature::SignatureMethodRegistry;
//!
//! let registry = SignatureMethodRegistry::global();
//! assert!(registry.get("HMAC-SHA1").is_ok());
//! assert!(registry.get("MD5").is_err());
//! ```

mod hmac_sha1;
mod plaintext;
mod rsa_sha1;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info};

use crate::accessor::OAuthAccessor;
use crate::error::OAuthError;
use crate::message::OAuthMessage;
use crate::params::{
    OAUTH_CONSUMER_KEY, OAUTH_SIGNATURE, OAUTH_SIGNATURE_METHOD, Parameter, percent_encode,
};

/// Method-name suffix selecting the accessor secret instead of the consumer secret.
pub const ACCESSOR_SUFFIX: &str = "-Accessor";

/// Key material a signature method may draw on.
#[derive(Clone, Copy)]
pub struct SigningKeys<'a> {
    pub consumer_secret: &'a str,
    pub token_secret: &'a str,
    pub private_key: Option<&'a RsaPrivateKey>,
    pub public_key: Option<&'a RsaPublicKey>,
}

impl<'a> SigningKeys<'a> {
    /// Collect the keys `accessor` provides for the method named `method_name`.
    ///
    /// For names ending in [`ACCESSOR_SUFFIX`] the accessor's accessor secret,
    /// then the consumer's, replaces the consumer secret when one is set.
    pub fn for_method(method_name: &str, accessor: &'a OAuthAccessor) -> Self {
        let consumer = &accessor.consumer;
        let mut consumer_secret = consumer.secret.as_deref();
        if method_name.ends_with(ACCESSOR_SUFFIX)
            && let Some(secret) = accessor
                .accessor_secret
                .as_deref()
                .or(consumer.accessor_secret.as_deref())
        {
            consumer_secret = Some(secret);
        }

        Self {
            consumer_secret: consumer_secret.unwrap_or_default(),
            token_secret: accessor.token_secret.as_deref().unwrap_or_default(),
            private_key: consumer.private_key.as_ref(),
            public_key: consumer.public_key.as_ref(),
        }
    }

    /// `encode(consumer_secret)&encode(token_secret)`, the HMAC-SHA1 and PLAINTEXT key.
    pub fn shared_secret_key(&self) -> String {
        format!(
            "{}&{}",
            percent_encode(self.consumer_secret),
            percent_encode(self.token_secret)
        )
    }
}

impl fmt::Debug for SigningKeys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("private_key", &self.private_key.is_some())
            .field("public_key", &self.public_key.is_some())
            .finish_non_exhaustive()
    }
}

/// A pair of algorithms for computing and checking a signature over a base string.
pub trait SignatureMethod: Send + Sync {
    /// Compute the signature of `base_string`.
    fn sign(&self, keys: &SigningKeys<'_>, base_string: &str) -> Result<String, OAuthError>;

    /// Decide whether `signature` is valid for `base_string`.
    ///
    /// `Ok(false)` means the signature does not match; errors are reserved for
    /// missing key material.
    fn verify(
        &self,
        keys: &SigningKeys<'_>,
        base_string: &str,
        signature: &str,
    ) -> Result<bool, OAuthError>;
}

/// The built-in signature methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    HmacSha1,
    Plaintext,
    RsaSha1,
}

impl Algorithm {
    pub const fn name(self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::Plaintext => "PLAINTEXT",
            Self::RsaSha1 => "RSA-SHA1",
        }
    }
}

impl SignatureMethod for Algorithm {
    fn sign(&self, keys: &SigningKeys<'_>, base_string: &str) -> Result<String, OAuthError> {
        match self {
            Self::HmacSha1 => Ok(hmac_sha1::sign(&keys.shared_secret_key(), base_string)),
            Self::Plaintext => Ok(plaintext::sign(&keys.shared_secret_key())),
            Self::RsaSha1 => rsa_sha1::sign(keys.private_key, base_string),
        }
    }

    fn verify(
        &self,
        keys: &SigningKeys<'_>,
        base_string: &str,
        signature: &str,
    ) -> Result<bool, OAuthError> {
        match self {
            Self::HmacSha1 => Ok(hmac_sha1::verify(
                &keys.shared_secret_key(),
                base_string,
                signature,
            )),
            Self::Plaintext => Ok(plaintext::verify(&keys.shared_secret_key(), signature)),
            Self::RsaSha1 => rsa_sha1::verify(keys.public_key, base_string, signature),
        }
    }
}

static GLOBAL_REGISTRY: LazyLock<Arc<SignatureMethodRegistry>> =
    LazyLock::new(|| Arc::new(SignatureMethodRegistry::new()));

/// Name to signature method table.
///
/// Entries can be added or replaced at any time but are never removed.
pub struct SignatureMethodRegistry {
    methods: RwLock<BTreeMap<String, Arc<dyn SignatureMethod>>>,
}

impl SignatureMethodRegistry {
    /// A registry holding the built-in methods, including the `-Accessor` variants
    /// of HMAC-SHA1 and PLAINTEXT.
    pub fn new() -> Self {
        let mut methods: BTreeMap<String, Arc<dyn SignatureMethod>> = BTreeMap::new();
        for algorithm in [Algorithm::HmacSha1, Algorithm::Plaintext, Algorithm::RsaSha1] {
            methods.insert(algorithm.name().to_owned(), Arc::new(algorithm));
        }
        for algorithm in [Algorithm::HmacSha1, Algorithm::Plaintext] {
            methods.insert(
                format!("{}{ACCESSOR_SUFFIX}", algorithm.name()),
                Arc::new(algorithm),
            );
        }
        Self {
            methods: RwLock::new(methods),
        }
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Add `method` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, method: Arc<dyn SignatureMethod>) {
        let name = name.into();
        info!(method = %name, "Registering signature method");
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, method);
    }

    /// Look up a method by name.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::UnsupportedSignatureMethod` listing the registered
    /// names when `name` is unknown.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SignatureMethod>, OAuthError> {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        methods
            .get(name)
            .cloned()
            .ok_or_else(|| OAuthError::UnsupportedSignatureMethod {
                method: name.to_owned(),
                acceptable: methods.keys().cloned().collect(),
            })
    }

    /// Registered method names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for SignatureMethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignatureMethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureMethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

/// Compute the signature of `message` and append it as `oauth_signature`.
///
/// The method is the one named by the message's `oauth_signature_method`.
pub fn sign_message(
    message: &mut OAuthMessage,
    accessor: &OAuthAccessor,
    registry: &SignatureMethodRegistry,
) -> Result<(), OAuthError> {
    message.require_parameters(&[OAUTH_SIGNATURE_METHOD])?;
    let method_name = message
        .signature_method()
        .unwrap_or_default()
        .to_owned();
    let method = registry.get(&method_name)?;
    let keys = SigningKeys::for_method(&method_name, accessor);

    let base_string = message.base_string();
    debug!(method = %method_name, base_string = %base_string, "Signing message");

    let signature = method.sign(&keys, &base_string)?;
    message.add_parameter(Parameter::new(OAUTH_SIGNATURE, signature));
    Ok(())
}

/// Check the `oauth_signature` of `message`.
///
/// # Errors
///
/// Returns `OAuthError::SignatureInvalid` carrying the signature, base string
/// and method name when the signature does not match.
pub fn validate_signature(
    message: &OAuthMessage,
    accessor: &OAuthAccessor,
    registry: &SignatureMethodRegistry,
) -> Result<(), OAuthError> {
    message.require_parameters(&[OAUTH_CONSUMER_KEY, OAUTH_SIGNATURE_METHOD, OAUTH_SIGNATURE])?;
    let method_name = message.signature_method().unwrap_or_default();
    let signature = message.signature().unwrap_or_default();
    let method = registry.get(method_name)?;
    let keys = SigningKeys::for_method(method_name, accessor);

    let base_string = message.base_string();
    if method.verify(&keys, &base_string, signature)? {
        return Ok(());
    }

    debug!(
        method = %method_name,
        base_string = %base_string,
        provided = %signature,
        "Signature mismatch"
    );
    Err(OAuthError::SignatureInvalid {
        signature: signature.to_owned(),
        base_string,
        method: method_name.to_owned(),
    })
}
