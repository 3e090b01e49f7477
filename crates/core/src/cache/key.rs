//! Cache key construction from an inbound request line.
//!
//! Keys have the form `"<METHOD> <path>[?<query>]"`. Credential parameters are
//! dropped before the key is built so keys never carry secrets and requests
//! that differ only by credentials share an entry.

use url::form_urlencoded;

/// Build the cache key for `method` and a raw `path_and_query`.
///
/// Every query parameter whose decoded name is listed in `secret_params` is
/// removed. The remaining parameters keep their original order and encoding.
pub fn cache_key(method: &str, path_and_query: &str, secret_params: &[String]) -> String {
    let method = method.to_ascii_uppercase();
    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };

    let kept: Vec<&str> = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter(|pair| !pair.is_empty() && !is_secret(pair, secret_params))
        .collect();

    if kept.is_empty() { format!("{method} {path}") } else { format!("{method} {path}?{}", kept.join("&")) }
}

fn is_secret(pair: &str, secret_params: &[String]) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(name, _)| secret_params.iter().any(|s| s.as_str() == name))
}
