//! Signature base string construction (RFC 5849 Section 3.4.1).

use crate::params::{self, OAUTH_SIGNATURE, Parameter, percent_encode, percent_encode_opt};

/// Normalize parameters: drop `oauth_signature`, sort by encoded name then
/// encoded value, and form-encode the result.
pub fn normalize_parameters<'a, I>(parameters: I) -> String
where
    I: IntoIterator<Item = &'a Parameter>,
{
    let mut sortable: Vec<(String, &Parameter)> = parameters
        .into_iter()
        .filter(|p| p.name() != OAUTH_SIGNATURE)
        .map(|p| (sort_key(p), p))
        .collect();

    // Stable: identical parameters keep their relative order.
    sortable.sort_by(|a, b| a.0.cmp(&b.0));

    params::form_encode(sortable.into_iter().map(|(_, p)| p))
}

/// `' '` sorts below every character that can appear in a percent-encoded
/// string, so `a` orders before `a%20b` and `ab`.
fn sort_key(parameter: &Parameter) -> String {
    format!(
        "{} {}",
        percent_encode(parameter.name()),
        percent_encode_opt(parameter.value())
    )
}

/// Build the signature base string.
///
/// Format: `METHOD&encoded_base_url&encoded_parameters`
///
/// Any query string on `url` is split off; its parameters are signed ahead of
/// `parameters`, and the base URL is encoded without it.
pub fn signature_base_string(method: &str, url: &str, parameters: &[Parameter]) -> String {
    let (base_url, normalized) = match url.split_once('?') {
        Some((base_url, query)) => {
            let query_params = params::form_decode(query);
            (
                base_url,
                normalize_parameters(query_params.iter().chain(parameters)),
            )
        }
        None => (url, normalize_parameters(parameters)),
    };

    format!(
        "{}&{}&{}",
        percent_encode(&method.to_uppercase()),
        percent_encode(base_url),
        percent_encode(&normalized)
    )
}
