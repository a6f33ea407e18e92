//! `Authorization` / `WWW-Authenticate` header codec (RFC 5849 Section 3.5.1).

use std::sync::LazyLock;

use regex::Regex;

use crate::params::{Parameter, decode_percent, percent_encode, percent_encode_opt};

/// Authentication scheme name.
pub const AUTH_SCHEME: &str = "OAuth";

/// Scheme followed by the comma-separated parameter list.
static AUTHORIZATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(\w*)\s+(.*)$").unwrap());

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").unwrap());

/// A single `name="value"` pair.
static NVP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\S*)\s*=\s*"([^"]*)"$"#).unwrap());

/// Build a header value holding `realm` plus every parameter whose name starts with `oauth_`.
///
/// Format: `OAuth realm="...", oauth_name="value", ...`
pub fn authorization_header<'a, I>(realm: &str, parameters: I) -> String
where
    I: IntoIterator<Item = &'a Parameter>,
{
    let mut header = format!("{AUTH_SCHEME} realm=\"{}\"", percent_encode(realm));
    for parameter in parameters {
        if parameter.name().starts_with("oauth_") {
            header.push_str(&format!(
                ", {}=\"{}\"",
                percent_encode(parameter.name()),
                percent_encode_opt(parameter.value())
            ));
        }
    }
    header
}

/// Parse the parameters of an `OAuth` header value.
///
/// The realm is returned as an ordinary parameter. A header using any other
/// scheme, or none at all, yields an empty list.
pub fn decode_authorization(header: &str) -> Vec<Parameter> {
    let Some(captures) = AUTHORIZATION_RE.captures(header) else {
        return Vec::new();
    };
    if !captures[1].eq_ignore_ascii_case(AUTH_SCHEME) {
        return Vec::new();
    }

    SEPARATOR_RE
        .split(&captures[2])
        .filter_map(|pair| {
            let nvp = NVP_RE.captures(pair.trim())?;
            Some(Parameter::new(decode_percent(&nvp[1]), decode_percent(&nvp[2])))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_header_includes_only_oauth_parameters() {
        let params = vec![
            Parameter::new("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            Parameter::new("file", "vacation.jpg"),
            Parameter::new("oauth_signature", "tR3+Ty81lMeYAr/Fid0kMTYa/WM="),
        ];

        let header = authorization_header("http://photos.example.net/", &params);

        assert_eq!(
            header,
            "OAuth realm=\"http%3A%2F%2Fphotos.example.net%2F\", \
             oauth_consumer_key=\"dpf43f3p2l4k3l03\", \
             oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""
        );
    }

    #[test]
    fn test_decode_authorization() {
        let header = "OAuth realm=\"Example\",\n  oauth_consumer_key=\"0685bd9184jfhq22\" , \
                      oauth_signature=\"wOJIO9A2W5mFwDgiDvZbTSMK%2FPY%3D\"";

        let params = decode_authorization(header);

        assert_eq!(
            params,
            vec![
                Parameter::new("realm", "Example"),
                Parameter::new("oauth_consumer_key", "0685bd9184jfhq22"),
                Parameter::new("oauth_signature", "wOJIO9A2W5mFwDgiDvZbTSMK/PY="),
            ]
        );
    }

    #[test]
    fn test_decode_scheme_is_case_insensitive() {
        let params = decode_authorization("oauth oauth_token=\"abc\"");
        assert_eq!(params, vec![Parameter::new("oauth_token", "abc")]);
    }

    #[test]
    fn test_decode_other_scheme() {
        assert!(decode_authorization("Basic dXNlcjpwYXNz").is_empty());
        assert!(decode_authorization("").is_empty());
    }

    #[test]
    fn test_header_round_trip() {
        let params = vec![
            Parameter::new("oauth_nonce", "a b&c"),
            Parameter::new("oauth_token", "\u{e9}"),
        ];
        let decoded = decode_authorization(&authorization_header("", &params));
        assert_eq!(decoded[0], Parameter::new("realm", ""));
        assert_eq!(&decoded[1..], params.as_slice());
    }
}
