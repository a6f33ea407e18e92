//! OAuth parameters and their percent and form encodings (RFC 5849 Section 3.6).

use std::collections::HashMap;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub const OAUTH_TOKEN: &str = "oauth_token";
pub const OAUTH_TOKEN_SECRET: &str = "oauth_token_secret";
pub const OAUTH_CALLBACK: &str = "oauth_callback";
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
pub const OAUTH_SIGNATURE: &str = "oauth_signature";
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
pub const OAUTH_NONCE: &str = "oauth_nonce";
pub const OAUTH_VERSION: &str = "oauth_version";

/// Protocol version written by the signer and assumed when a message omits it.
pub const VERSION_1_0: &str = "1.0";

/// Parameters that may occur at most once in a message.
pub const SINGLE_PARAMETERS: [&str; 9] = [
    OAUTH_CONSUMER_KEY,
    OAUTH_TOKEN,
    OAUTH_TOKEN_SECRET,
    OAUTH_CALLBACK,
    OAUTH_SIGNATURE_METHOD,
    OAUTH_SIGNATURE,
    OAUTH_TIMESTAMP,
    OAUTH_NONCE,
    OAUTH_VERSION,
];

/// MIME type of a form-encoded parameter document.
pub const FORM_ENCODED: &str = "application/x-www-form-urlencoded";

/// OAuth unreserved characters: A-Z a-z 0-9 - . _ ~
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A name/value pair. The value may be absent, which is distinct from empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// A parameter written as a bare name, without `=`.
    pub fn without_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Parameter {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}",
            percent_encode(&self.name),
            percent_encode_opt(self.value())
        )
    }
}

/// Percent-encode string per RFC 3986, the way OAuth requires.
///
/// Space becomes `%20`, `*` becomes `%2A` and `~` is left alone.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Percent-encode an optional string; an absent value encodes as empty.
pub fn percent_encode_opt(input: Option<&str>) -> String {
    input.map(percent_encode).unwrap_or_default()
}

/// Percent-encode each value and join them with `&`.
pub fn percent_encode_all<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| percent_encode(v.as_ref()))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a percent-encoded string.
///
/// `+` decodes to a space and malformed escapes are kept literally, so values
/// that were never encoded in the first place survive unchanged.
pub fn decode_percent(input: &str) -> String {
    let input = input.replace('+', " ");
    percent_decode_str(&input).decode_utf8_lossy().into_owned()
}

/// Form-encode parameters in the given order.
pub fn form_encode<'a, I>(parameters: I) -> String
where
    I: IntoIterator<Item = &'a Parameter>,
{
    parameters
        .into_iter()
        .map(Parameter::to_string)
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a form-encoded document.
///
/// Each `&`-separated pair is split on its first `=`; a pair without `=`
/// becomes a parameter without a value. Empty pairs are skipped.
pub fn form_decode(form: &str) -> Vec<Parameter> {
    form.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => Parameter::new(decode_percent(name), decode_percent(value)),
            None => Parameter::without_value(decode_percent(pair)),
        })
        .collect()
}

/// Build a name to value lookup where the first occurrence of a name wins.
pub fn first_value_map(parameters: &[Parameter]) -> HashMap<&str, Option<&str>> {
    let mut map = HashMap::with_capacity(parameters.len());
    for parameter in parameters {
        map.entry(parameter.name()).or_insert(parameter.value());
    }
    map
}

/// Append parameters to the query string of `url`.
pub fn add_parameters_to_url(url: &str, parameters: &[Parameter]) -> String {
    let form = form_encode(parameters);
    if form.is_empty() {
        return url.to_owned();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{form}")
}

/// Whether a `Content-Type` header value denotes a form-encoded body.
pub fn is_form_encoded(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let mime = ct.split(';').next().unwrap_or_default();
        mime.trim().eq_ignore_ascii_case(FORM_ENCODED)
    })
}
