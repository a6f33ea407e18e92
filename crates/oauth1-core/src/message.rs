//! Request description: method, URL, parameters and headers.
//!
//! [`OAuthMessage`] is the unit that gets signed and validated. It owns its
//! parameters in insertion order; parameters carried in the URL query string
//! are left in the URL and picked up when the base string is built.
//!
//! # Example
//!
//! ```
//! use oauth1_core::{OAuthAccessor, OAuthConsumer, OAuthMessage, Parameter};
//!
//! let consumer = OAuthConsumer::new("dpf43f3p2l4k3l03").with_secret("kd94hf93k423kf44");
//! let accessor = OAuthAccessor::new(consumer).with_token("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
//!
//! let mut message = OAuthMessage::new(
//!     "GET",
//!     "http://photos.example.net/photos",
//!     [Parameter::new("file", "vacation.jpg")],
//! );
//! message.add_required_parameters(&accessor).unwrap();
//!
//! assert!(message.signature().is_some());
//! assert!(message.authorization_header("").starts_with("OAuth realm=\"\""));
//! ```

use oauth1_config::DEFAULT_SIGNATURE_METHOD;
use tracing::debug;

use crate::accessor::OAuthAccessor;
use crate::base_string;
use crate::error::OAuthError;
use crate::header;
use crate::params::{
    self, OAUTH_CONSUMER_KEY, OAUTH_NONCE, OAUTH_SIGNATURE, OAUTH_SIGNATURE_METHOD,
    OAUTH_TIMESTAMP, OAUTH_TOKEN, OAUTH_VERSION, Parameter, VERSION_1_0,
};
use crate::signature::{self, SignatureMethodRegistry};
use crate::validator::{Clock, OAuthValidator, SystemClock};

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";

/// An HTTP-like request as far as OAuth is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthMessage {
    pub method: String,
    pub url: String,
    parameters: Vec<Parameter>,
    headers: Vec<(String, String)>,
}

impl OAuthMessage {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            parameters: parameters.into_iter().collect(),
            headers: Vec::new(),
        }
    }

    /// Attach request headers, e.g. an `Authorization` header to merge later.
    #[must_use]
    pub fn with_headers<I, N, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(n, v)| (n.into(), v.into())));
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn add_parameter(&mut self, parameter: impl Into<Parameter>) {
        self.parameters.push(parameter.into());
    }

    pub fn add_parameters(&mut self, parameters: impl IntoIterator<Item = Parameter>) {
        self.parameters.extend(parameters);
    }

    /// Replace every parameter named `name` with a single one holding `value`.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<String>) {
        self.parameters.retain(|p| p.name() != name);
        self.parameters.push(Parameter::new(name, value));
    }

    /// Value of the first parameter named `name`.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name() == name)
            .and_then(Parameter::value)
    }

    pub fn consumer_key(&self) -> Option<&str> {
        self.parameter(OAUTH_CONSUMER_KEY)
    }

    pub fn token(&self) -> Option<&str> {
        self.parameter(OAUTH_TOKEN)
    }

    pub fn signature_method(&self) -> Option<&str> {
        self.parameter(OAUTH_SIGNATURE_METHOD)
    }

    pub fn signature(&self) -> Option<&str> {
        self.parameter(OAUTH_SIGNATURE)
    }

    /// Fail unless every name in `names` has a value.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::MissingRequiredParameter` listing every absent name,
    /// in the order given.
    pub fn require_parameters(&self, names: &[&str]) -> Result<(), OAuthError> {
        let present = params::first_value_map(&self.parameters);
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !matches!(present.get(**name), Some(Some(_))))
            .map(|name| (*name).to_owned())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(OAuthError::MissingRequiredParameter { names: missing })
        }
    }

    /// The signature base string of this message.
    pub fn base_string(&self) -> String {
        base_string::signature_base_string(&self.method, &self.url, &self.parameters)
    }

    /// Fill in the protocol parameters that are absent, then sign.
    ///
    /// Adds `oauth_token` (when the accessor holds an access token),
    /// `oauth_consumer_key`, `oauth_signature_method` (the consumer's preference,
    /// which configured consumers take from `[signer]`, else HMAC-SHA1),
    /// `oauth_timestamp`, `oauth_nonce` and `oauth_version`.
    pub fn add_required_parameters(&mut self, accessor: &OAuthAccessor) -> Result<(), OAuthError> {
        self.add_required_parameters_at(accessor, SystemClock.now_millis() / 1000);
        self.sign(accessor)
    }

    fn add_required_parameters_at(&mut self, accessor: &OAuthAccessor, timestamp: i64) {
        let consumer = &accessor.consumer;
        let method = consumer
            .signature_method
            .as_deref()
            .unwrap_or(DEFAULT_SIGNATURE_METHOD);

        let mut defaults: Vec<(&str, String)> = Vec::with_capacity(6);
        if let Some(token) = &accessor.access_token {
            defaults.push((OAUTH_TOKEN, token.clone()));
        }
        defaults.push((OAUTH_CONSUMER_KEY, consumer.key.clone()));
        defaults.push((OAUTH_SIGNATURE_METHOD, method.to_owned()));
        defaults.push((OAUTH_TIMESTAMP, timestamp.to_string()));
        defaults.push((OAUTH_NONCE, generate_nonce()));
        defaults.push((OAUTH_VERSION, VERSION_1_0.to_owned()));

        for (name, value) in defaults {
            if !self.parameters.iter().any(|p| p.name() == name) {
                self.parameters.push(Parameter::new(name, value));
            }
        }
    }

    /// Sign with the process-wide registry, appending `oauth_signature`.
    pub fn sign(&mut self, accessor: &OAuthAccessor) -> Result<(), OAuthError> {
        self.sign_with(accessor, &SignatureMethodRegistry::global())
    }

    pub fn sign_with(
        &mut self,
        accessor: &OAuthAccessor,
        registry: &SignatureMethodRegistry,
    ) -> Result<(), OAuthError> {
        signature::sign_message(self, accessor, registry)
    }

    /// Validate this message against `accessor` using `validator`.
    pub fn validate_message(
        &self,
        accessor: &OAuthAccessor,
        validator: &dyn OAuthValidator,
    ) -> Result<(), OAuthError> {
        validator.validate_message(self, accessor)
    }

    /// `Authorization` header value carrying the `oauth_` parameters.
    pub fn authorization_header(&self, realm: &str) -> String {
        header::authorization_header(realm, &self.parameters)
    }

    /// The URL with every parameter appended to its query string.
    pub fn to_url(&self) -> String {
        params::add_parameters_to_url(&self.url, &self.parameters)
    }

    /// Append the parameters of each `Authorization: OAuth ...` header.
    ///
    /// The realm is not a signed parameter and is skipped.
    pub fn complete_parameters_from_headers(&mut self) {
        let from_headers: Vec<Parameter> = self
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
            .flat_map(|(_, value)| header::decode_authorization(value))
            .filter(|p| !p.name().eq_ignore_ascii_case("realm"))
            .collect();
        if !from_headers.is_empty() {
            debug!(count = from_headers.len(), "Merged Authorization header parameters");
        }
        self.parameters.extend(from_headers);
    }

    /// Append the parameters of a form-encoded request body.
    ///
    /// Does nothing unless the `Content-Type` header says the body is
    /// `application/x-www-form-urlencoded`.
    pub fn complete_parameters_from_body(&mut self, body: &str) {
        if params::is_form_encoded(self.header(CONTENT_TYPE)) {
            self.parameters.extend(params::form_decode(body));
        }
    }
}

/// 128 random bits as 32 lowercase hex digits.
fn generate_nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::accessor::OAuthConsumer;
    use crate::validator::SimpleOAuthValidator;

    fn photos_accessor() -> OAuthAccessor {
        OAuthAccessor::new(OAuthConsumer::new("dpf43f3p2l4k3l03").with_secret("kd94hf93k423kf44"))
            .with_token("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00")
    }

    #[test]
    fn test_parameter_first_occurrence_wins() {
        let message = OAuthMessage::new(
            "GET",
            "http://example.com/",
            [
                Parameter::new("oauth_token", "first"),
                Parameter::new("oauth_token", "second"),
            ],
        );
        assert_eq!(message.token(), Some("first"));
        assert_eq!(message.parameter("missing"), None);
    }

    #[test]
    fn test_set_parameter_replaces_all() {
        let mut message = OAuthMessage::new(
            "GET",
            "http://example.com/",
            [Parameter::new("a", "1"), Parameter::new("a", "2")],
        );
        message.set_parameter("a", "3");
        assert_eq!(message.parameters(), &[Parameter::new("a", "3")]);
    }

    #[test]
    fn test_require_parameters_lists_missing() {
        let message = OAuthMessage::new(
            "GET",
            "http://example.com/",
            [
                Parameter::new("oauth_consumer_key", "ck"),
                Parameter::without_value("oauth_token"),
            ],
        );
        assert!(message.require_parameters(&["oauth_consumer_key"]).is_ok());

        let err = message
            .require_parameters(&["oauth_token", "oauth_consumer_key", "oauth_nonce"])
            .unwrap_err();
        assert_eq!(err.problem(), "parameter_absent");
        assert_eq!(
            err.parameters(),
            vec![Parameter::new(
                "oauth_parameters_absent",
                "oauth_token&oauth_nonce"
            )]
        );
    }

    #[test]
    fn test_add_required_parameters() {
        let accessor = photos_accessor();
        let mut message = OAuthMessage::new("GET", "http://photos.example.net/photos", []);
        message.add_required_parameters_at(&accessor, 1_191_242_096);

        assert_eq!(message.token(), Some("nnch734d00sl2jdk"));
        assert_eq!(message.consumer_key(), Some("dpf43f3p2l4k3l03"));
        assert_eq!(message.signature_method(), Some("HMAC-SHA1"));
        assert_eq!(message.parameter("oauth_timestamp"), Some("1191242096"));
        assert_eq!(message.parameter("oauth_version"), Some("1.0"));

        let nonce = message.parameter("oauth_nonce").unwrap();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_add_required_parameters_keeps_existing_values() {
        let consumer = OAuthConsumer::new("ck")
            .with_secret("s")
            .with_signature_method("PLAINTEXT");
        let accessor = OAuthAccessor::new(consumer);
        let mut message = OAuthMessage::new(
            "POST",
            "http://example.com/request_token",
            [Parameter::new("oauth_nonce", "fixed")],
        );

        message.add_required_parameters(&accessor).unwrap();

        assert_eq!(message.parameter("oauth_nonce"), Some("fixed"));
        assert_eq!(message.token(), None);
        assert_eq!(message.signature_method(), Some("PLAINTEXT"));
        assert_eq!(message.signature(), Some("s&"));
    }

    #[test]
    fn test_configured_signer_default_is_used() {
        let toml = r#"
[signer]
signature_method = "PLAINTEXT"

[[consumers]]
key = "photos"
secret = "kd94hf93k423kf44"
"#;
        let config = oauth1_config::Config::from_toml_str(toml, std::path::Path::new("/project"))
            .unwrap();
        let consumer_config = config.consumer("photos").unwrap();
        let consumer = OAuthConsumer::from_config(consumer_config, &config.signer).unwrap();
        let accessor = OAuthAccessor::new(consumer);

        let mut message = OAuthMessage::new("GET", "http://photos.example.net/photos", []);
        message.add_required_parameters(&accessor).unwrap();

        assert_eq!(message.signature_method(), Some("PLAINTEXT"));
        assert_eq!(message.signature(), Some("kd94hf93k423kf44&"));
    }

    #[test]
    fn test_nonces_differ() {
        assert_ne!(generate_nonce(), generate_nonce());
    }

    #[test]
    fn test_signed_message_validates() {
        let accessor = photos_accessor();
        let mut message = OAuthMessage::new(
            "POST",
            "http://photos.example.net/photos?size=original",
            [Parameter::new("title", "Vacation & more")],
        );
        message.add_required_parameters(&accessor).unwrap();

        let validator = SimpleOAuthValidator::default();
        message.validate_message(&accessor, &validator).unwrap();
        assert_eq!(
            message
                .validate_message(&accessor, &validator)
                .unwrap_err()
                .problem(),
            "nonce_used"
        );
    }

    #[test]
    fn test_header_round_trip() {
        let accessor = photos_accessor();
        let mut signed = OAuthMessage::new("GET", "http://photos.example.net/photos", []);
        signed.add_required_parameters(&accessor).unwrap();
        let header = signed.authorization_header("http://photos.example.net/");

        let mut received = OAuthMessage::new("GET", "http://photos.example.net/photos", [])
            .with_headers([("authorization", header)]);
        received.complete_parameters_from_headers();

        assert_eq!(received.parameters(), signed.parameters());
        assert_eq!(received.base_string(), signed.base_string());
    }

    #[test]
    fn test_headers_without_oauth_scheme_are_ignored() {
        let mut message = OAuthMessage::new("GET", "http://example.com/", [])
            .with_headers([("Authorization", "Basic dXNlcjpwYXNz")]);
        message.complete_parameters_from_headers();
        assert!(message.parameters().is_empty());
    }

    #[test]
    fn test_form_body_parameters() {
        let mut form = OAuthMessage::new("POST", "http://example.com/", [])
            .with_headers([("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")]);
        form.complete_parameters_from_body("status=hello%20world&oauth_nonce=n");
        assert_eq!(form.parameter("status"), Some("hello world"));
        assert_eq!(form.parameters().len(), 2);

        let mut json = OAuthMessage::new("POST", "http://example.com/", [])
            .with_headers([("Content-Type", "application/json")]);
        json.complete_parameters_from_body("status=ignored");
        assert!(json.parameters().is_empty());
    }

    #[test]
    fn test_to_url() {
        let message = OAuthMessage::new(
            "GET",
            "http://example.com/r?x=1",
            [Parameter::new("oauth_token", "a b")],
        );
        assert_eq!(message.to_url(), "http://example.com/r?x=1&oauth_token=a%20b");
    }
}
