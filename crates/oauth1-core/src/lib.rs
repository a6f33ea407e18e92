//! OAuth 1.0a request signing, verification and replay protection.
//!
//! This crate turns a request description into a signature base string,
//! signs it with HMAC-SHA1, PLAINTEXT or RSA-SHA1, and on the receiving side
//! checks the signature along with the timestamp window and nonce uniqueness.
//! Transport is left to the caller: messages go in as a method, URL and
//! parameter list, and failures come out as [`OAuthError`] values carrying an
//! `oauth_problem` tag.
//!
//! # Signing
//!
//! ```
//! use oauth1_core::{OAuthAccessor, OAuthConsumer, OAuthMessage};
//!
//! let consumer = OAuthConsumer::new("my-consumer").with_secret("consumer-secret");
//! let accessor = OAuthAccessor::new(consumer);
//!
//! let mut message = OAuthMessage::new("POST", "https://api.example.com/statuses", []);
//! message.add_required_parameters(&accessor)?;
//! let header = message.authorization_header("https://api.example.com/");
//! # assert!(header.contains("oauth_signature="));
//! # Ok::<(), oauth1_core::OAuthError>(())
//! ```
//!
//! # Validating
//!
//! ```
//! use oauth1_core::{OAuthAccessor, OAuthConsumer, OAuthMessage, SimpleOAuthValidator};
//!
//! let accessor = OAuthAccessor::new(OAuthConsumer::new("my-consumer").with_secret("s"));
//! let validator = SimpleOAuthValidator::default();
//!
//! let mut message = OAuthMessage::new("GET", "https://api.example.com/me", []);
//! message.add_required_parameters(&accessor)?;
//!
//! message.validate_message(&accessor, &validator)?;
//! let replayed = message.validate_message(&accessor, &validator).unwrap_err();
//! assert_eq!(replayed.problem(), "nonce_used");
//! # Ok::<(), oauth1_core::OAuthError>(())
//! ```

pub mod accessor;
pub mod base_string;
pub mod error;
pub mod header;
pub mod key;
pub mod message;
pub mod params;
pub mod signature;
pub mod validator;

pub use accessor::{OAuthAccessor, OAuthConsumer};
pub use base_string::{normalize_parameters, signature_base_string};
pub use error::{KeyError, OAuthError};
pub use header::decode_authorization;
pub use message::OAuthMessage;
pub use params::{Parameter, decode_percent, form_decode, form_encode, percent_encode};
pub use signature::{Algorithm, SignatureMethod, SignatureMethodRegistry, SigningKeys};
pub use validator::{Clock, OAuthValidator, SimpleOAuthValidator, SystemClock, TimestampRange};
