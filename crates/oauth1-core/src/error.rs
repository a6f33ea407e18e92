//! Error types for OAuth signing and verification.
//!
//! Every [`OAuthError`] carries an `oauth_problem` tag and supplementary
//! parameters, following the OAuth Problem Reporting extension, so the
//! transport layer can render it into a `WWW-Authenticate` header or a
//! form-encoded response body without inspecting the variant.

use std::str::Utf8Error;

use crate::params::{self, Parameter};

/// Name of the parameter holding the problem tag.
pub const OAUTH_PROBLEM: &str = "oauth_problem";

/// Protocol-level failure while signing or validating a message.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OAuthError {
    /// An OAuth parameter that must be unique occurs more than once.
    #[error("duplicate OAuth parameters: {}", params::form_encode(.parameters))]
    DuplicateParameter {
        /// Every occurrence of every duplicated name, in message order.
        parameters: Vec<Parameter>,
    },

    /// A parameter value cannot be interpreted.
    #[error("parameter rejected: {}", params::form_encode(.parameters))]
    ParameterRejected {
        /// The offending parameters.
        parameters: Vec<Parameter>,
    },

    /// `oauth_version` is outside the accepted range.
    #[error("version {version} rejected, acceptable versions are {min:?}-{max:?}")]
    VersionRejected {
        /// Version as written in the message.
        version: String,
        /// Lowest accepted version.
        min: f64,
        /// Highest accepted version.
        max: f64,
    },

    /// `oauth_timestamp` is outside the replay window.
    #[error("timestamp {timestamp} refused, acceptable timestamps are {min}-{max}")]
    TimestampRefused {
        /// Timestamp from the message, in seconds.
        timestamp: i64,
        /// Oldest accepted timestamp, in seconds.
        min: i64,
        /// Newest accepted timestamp, in seconds.
        max: i64,
    },

    /// The (timestamp, nonce, consumer key, token) tuple was already seen.
    #[error("nonce already used")]
    NonceAlreadyUsed,

    /// One or more required parameters are absent.
    #[error("missing required parameters: {}", .names.join(", "))]
    MissingRequiredParameter {
        /// Names of the absent parameters.
        names: Vec<String>,
    },

    /// No signature method is registered under the requested name.
    #[error("unsupported signature method {method:?}")]
    UnsupportedSignatureMethod {
        /// Requested method name.
        method: String,
        /// Names that are currently registered.
        acceptable: Vec<String>,
    },

    /// The signature does not match the message.
    #[error("invalid {method} signature")]
    SignatureInvalid {
        /// Signature supplied by the message.
        signature: String,
        /// Base string the signature was checked against.
        base_string: String,
        /// Signature method name.
        method: String,
    },

    /// Key material required by the signature method is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OAuthError {
    /// The `oauth_problem` tag.
    pub fn problem(&self) -> &'static str {
        match self {
            Self::DuplicateParameter { .. } | Self::ParameterRejected { .. } => {
                "parameter_rejected"
            }
            Self::VersionRejected { .. } => "version_rejected",
            Self::TimestampRefused { .. } => "timestamp_refused",
            Self::NonceAlreadyUsed => "nonce_used",
            Self::MissingRequiredParameter { .. } => "parameter_absent",
            Self::UnsupportedSignatureMethod { .. } => "signature_method_rejected",
            Self::SignatureInvalid { .. } => "signature_invalid",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Supplementary problem parameters, excluding the problem tag itself.
    pub fn parameters(&self) -> Vec<Parameter> {
        match self {
            Self::DuplicateParameter { parameters } | Self::ParameterRejected { parameters } => {
                vec![Parameter::new(
                    "oauth_parameters_rejected",
                    params::form_encode(parameters),
                )]
            }
            Self::VersionRejected { min, max, .. } => vec![Parameter::new(
                "oauth_acceptable_versions",
                format!("{min:?}-{max:?}"),
            )],
            Self::TimestampRefused { min, max, .. } => vec![Parameter::new(
                "oauth_acceptable_timestamps",
                format!("{min}-{max}"),
            )],
            Self::MissingRequiredParameter { names } => vec![Parameter::new(
                "oauth_parameters_absent",
                params::percent_encode_all(names),
            )],
            Self::UnsupportedSignatureMethod { acceptable, .. } if !acceptable.is_empty() => {
                vec![Parameter::new(
                    "oauth_acceptable_signature_methods",
                    params::percent_encode_all(acceptable),
                )]
            }
            Self::SignatureInvalid {
                signature,
                base_string,
                method,
            } => vec![
                Parameter::new(params::OAUTH_SIGNATURE, signature.as_str()),
                Parameter::new("oauth_signature_base_string", base_string.as_str()),
                Parameter::new(params::OAUTH_SIGNATURE_METHOD, method.as_str()),
            ],
            Self::NonceAlreadyUsed
            | Self::UnsupportedSignatureMethod { .. }
            | Self::Configuration(_) => Vec::new(),
        }
    }

    /// Problem tag followed by the supplementary parameters.
    pub fn to_parameters(&self) -> Vec<Parameter> {
        let mut all = vec![Parameter::new(OAUTH_PROBLEM, self.problem())];
        all.extend(self.parameters());
        all
    }

    /// Render as a form-encoded body.
    pub fn to_form(&self) -> String {
        params::form_encode(&self.to_parameters())
    }

    /// Render as a `WWW-Authenticate` header value.
    pub fn to_www_authenticate(&self, realm: &str) -> String {
        crate::header::authorization_header(realm, &self.to_parameters())
    }
}

/// RSA key loading/parsing error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeyError {
    /// Key file could not be read.
    #[error("failed to read key file")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 in key file.
    #[error("invalid UTF-8 in key")]
    InvalidUtf8(#[from] Utf8Error),

    /// PKCS#1 key parsing error.
    #[error("PKCS#1 key error")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// PKCS#8 private key parsing error (returned when both formats fail).
    #[error("PKCS#8 key error")]
    Pkcs8(#[from] rsa::pkcs8::Error),

    /// SubjectPublicKeyInfo parsing error (returned when both formats fail).
    #[error("SPKI public key error")]
    Spki(#[from] rsa::pkcs8::spki::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_timestamp_refused_payload() {
        let err = OAuthError::TimestampRefused {
            timestamp: 10,
            min: 100,
            max: 700,
        };
        assert_eq!(err.problem(), "timestamp_refused");
        assert_eq!(
            err.to_form(),
            "oauth_problem=timestamp_refused&oauth_acceptable_timestamps=100-700"
        );
    }

    #[test]
    fn test_version_rejected_payload() {
        let err = OAuthError::VersionRejected {
            version: "2.0".to_owned(),
            min: 1.0,
            max: 1.0,
        };
        assert_eq!(
            err.parameters(),
            vec![Parameter::new("oauth_acceptable_versions", "1.0-1.0")]
        );
    }

    #[test]
    fn test_version_range_is_not_truncated() {
        let err = OAuthError::VersionRejected {
            version: "1.3".to_owned(),
            min: 1.0,
            max: 1.25,
        };
        assert_eq!(
            err.to_form(),
            "oauth_problem=version_rejected&oauth_acceptable_versions=1.0-1.25"
        );
        assert!(err.to_string().ends_with("1.0-1.25"));
    }

    #[test]
    fn test_duplicate_parameter_payload() {
        let err = OAuthError::DuplicateParameter {
            parameters: vec![
                Parameter::new("oauth_consumer_key", "a"),
                Parameter::new("oauth_consumer_key", "b"),
            ],
        };
        assert_eq!(err.problem(), "parameter_rejected");
        assert_eq!(
            err.parameters(),
            vec![Parameter::new(
                "oauth_parameters_rejected",
                "oauth_consumer_key=a&oauth_consumer_key=b"
            )]
        );
    }

    #[test]
    fn test_unsupported_method_lists_acceptable() {
        let err = OAuthError::UnsupportedSignatureMethod {
            method: "MD5".to_owned(),
            acceptable: vec!["HMAC-SHA1".to_owned(), "PLAINTEXT".to_owned()],
        };
        assert_eq!(
            err.to_form(),
            "oauth_problem=signature_method_rejected\
             &oauth_acceptable_signature_methods=HMAC-SHA1%26PLAINTEXT"
        );
    }

    #[test]
    fn test_www_authenticate() {
        let err = OAuthError::NonceAlreadyUsed;
        assert_eq!(
            err.to_www_authenticate("photos"),
            r#"OAuth realm="photos", oauth_problem="nonce_used""#
        );
    }
}
