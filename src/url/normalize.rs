use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical form used for frontier deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject non-HTTP(S) schemes
/// 3. Lowercase the host
/// 4. Remove the fragment (everything after `#`)
/// 5. Remove a trailing slash from the path (except for the root `/`)
/// 6. Sort query parameters alphabetically; drop an empty query string
///
/// Two URLs that normalize to the same string are considered the same page
/// for the duration of a run: the scheduler will fetch at most one of them.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .ok_or(UrlError::MissingHost)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    // Fragments never change the fetched resource
    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    if let Some(query) = url.query() {
        if query.is_empty() {
            url.set_query(None);
        } else {
            let mut params: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            params.sort();
            let sorted = params
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&sorted));
        }
    }

    Ok(url)
}
