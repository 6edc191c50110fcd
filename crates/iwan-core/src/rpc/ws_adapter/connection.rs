use url::Url;

use crate::error::CoreError;

/// Build the connection target from a base URI and the API key.
///
/// The base URI is normalized to end in `/` (so `.../ws/v3` and `.../ws/v3/`
/// give the same endpoint) and the key is appended as the last path segment.
/// The result must be a `ws://` or `wss://` URL.
pub(super) fn resolve_endpoint(base_uri: &str, api_key: &str) -> Result<String, CoreError> {
    validate_api_key(api_key)?;

    let base_uri = base_uri.trim();
    let mut endpoint = String::with_capacity(base_uri.len() + 1 + api_key.len());
    endpoint.push_str(base_uri);
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint.push_str(api_key);

    parse_connection(&endpoint)?;
    Ok(endpoint)
}

fn validate_api_key(api_key: &str) -> Result<(), CoreError> {
    if api_key.is_empty() {
        return Err(CoreError::Config("api key must not be empty".to_owned()));
    }
    if let Some(bad) = api_key
        .chars()
        .find(|c| !c.is_ascii_graphic() || matches!(c, '/' | '?' | '#'))
    {
        return Err(CoreError::Config(format!(
            "api key contains `{}`, which cannot appear in the endpoint path",
            bad.escape_default()
        )));
    }
    Ok(())
}

// The endpoint is handed to the handshake verbatim, and the request URI
// parser there takes ASCII only.
fn parse_connection(connection: &str) -> Result<(), CoreError> {
    if !connection.is_ascii() {
        return Err(CoreError::Config(format!(
            "endpoint `{connection}` must be ASCII; use punycode for the host"
        )));
    }
    let parsed = Url::parse(connection).map_err(|e| {
        CoreError::Config(format!(
            "invalid endpoint `{connection}`: expected WebSocket URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(CoreError::Config(format!(
                "unsupported endpoint scheme `{other}`; expected ws or wss"
            )))
        }
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(CoreError::Config(format!(
            "base uri must not carry a query or fragment: `{connection}`"
        )));
    }
    Ok(())
}
