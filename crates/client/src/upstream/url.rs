//! Upstream URL construction.

use url::Url;

use super::ClientError;

/// Resolve `path_and_query` against `base` and attach the credential.
///
/// Any credential already present under `key_param` is replaced so callers
/// cannot smuggle their own key through the proxy. The base URL's own path is
/// kept as a prefix.
pub fn upstream_url(
    base: &Url, path_and_query: &str, key_param: &str, api_key: Option<&str>,
) -> Result<Url, ClientError> {
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl(format!("unsupported scheme: {}", base.scheme())));
    }

    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };

    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
    url.set_query(query);
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != key_param)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() && api_key.is_none() {
        url.set_query(None);
        return Ok(url);
    }

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept);
        if let Some(key) = api_key {
            pairs.append_pair(key_param, key);
        }
    }

    Ok(url)
}
