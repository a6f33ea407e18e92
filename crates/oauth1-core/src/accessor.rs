//! Consumer and accessor credentials.

use std::fmt;
use std::sync::Arc;

use oauth1_config::{ConsumerConfig, SignerConfig};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::KeyError;
use crate::key;

/// An application identity: consumer key plus the secrets used to sign or verify.
#[derive(Clone, Default)]
pub struct OAuthConsumer {
    pub key: String,
    pub secret: Option<String>,
    /// Secret used instead of `secret` by the `-Accessor` signature methods.
    pub accessor_secret: Option<String>,
    /// Preferred signature method when signing.
    pub signature_method: Option<String>,
    /// Signing side of RSA-SHA1.
    pub private_key: Option<RsaPrivateKey>,
    /// Verifying side of RSA-SHA1.
    pub public_key: Option<RsaPublicKey>,
}

impl OAuthConsumer {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_accessor_secret(mut self, secret: impl Into<String>) -> Self {
        self.accessor_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_signature_method(mut self, method: impl Into<String>) -> Self {
        self.signature_method = Some(method.into());
        self
    }

    /// Attach a private key; the matching public key is derived unless one is already set.
    #[must_use]
    pub fn with_private_key(mut self, private_key: RsaPrivateKey) -> Self {
        if self.public_key.is_none() {
            self.public_key = Some(private_key.to_public_key());
        }
        self.private_key = Some(private_key);
        self
    }

    #[must_use]
    pub fn with_public_key(mut self, public_key: RsaPublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }

    /// Build a consumer from configuration, loading any key files it names.
    ///
    /// A consumer without its own signature method takes the `[signer]` default.
    pub fn from_config(config: &ConsumerConfig, signer: &SignerConfig) -> Result<Self, KeyError> {
        let signature_method = config
            .signature_method
            .clone()
            .unwrap_or_else(|| signer.signature_method.clone());
        let mut consumer = Self {
            key: config.key.clone(),
            secret: config.secret.clone(),
            accessor_secret: config.accessor_secret.clone(),
            signature_method: Some(signature_method),
            private_key: None,
            public_key: None,
        };
        if let Some(path) = &config.public_key_file {
            consumer = consumer.with_public_key(key::load_public_key_from_file(path)?);
        }
        if let Some(path) = &config.private_key_file {
            consumer = consumer.with_private_key(key::load_private_key_from_file(path)?);
        }
        Ok(consumer)
    }
}

impl fmt::Debug for OAuthConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConsumer")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field(
                "accessor_secret",
                &self.accessor_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("signature_method", &self.signature_method)
            .field("private_key", &self.private_key.is_some())
            .field("public_key", &self.public_key.is_some())
            .finish()
    }
}

/// Per-user credentials layered on a consumer.
#[derive(Clone)]
pub struct OAuthAccessor {
    pub consumer: Arc<OAuthConsumer>,
    pub request_token: Option<String>,
    pub access_token: Option<String>,
    pub token_secret: Option<String>,
    /// Takes precedence over the consumer's accessor secret.
    pub accessor_secret: Option<String>,
}

impl OAuthAccessor {
    pub fn new(consumer: impl Into<Arc<OAuthConsumer>>) -> Self {
        Self {
            consumer: consumer.into(),
            request_token: None,
            access_token: None,
            token_secret: None,
            accessor_secret: None,
        }
    }

    /// Attach an access token and its secret.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self.token_secret = Some(token_secret.into());
        self
    }

    #[must_use]
    pub fn with_accessor_secret(mut self, secret: impl Into<String>) -> Self {
        self.accessor_secret = Some(secret.into());
        self
    }
}

impl fmt::Debug for OAuthAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthAccessor")
            .field("consumer", &self.consumer)
            .field("request_token", &self.request_token)
            .field("access_token", &self.access_token)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .field(
                "accessor_secret",
                &self.accessor_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
