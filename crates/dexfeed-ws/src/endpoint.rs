//! Candidate endpoint derivation.
//!
//! The feed has been served under more than one API version and individual
//! versions get blocked from time to time, so every capture tries the
//! configured URL first and then the same URL with the version swapped.

/// Known version path segments and their alternates.
const VERSION_SWAPS: [(&str, &str); 2] = [("/v5/", "/v4/"), ("/v4/", "/v5/")];

/// Ordered, de-duplicated candidate URLs for `base_url`.
///
/// The original URL always comes first. Only the first recognized version
/// segment kind is swapped; URLs without one yield a single candidate.
pub fn candidate_endpoints(base_url: &str) -> Vec<String> {
    let mut urls = vec![base_url.to_string()];

    if let Some((from, to)) = VERSION_SWAPS
        .iter()
        .find(|(from, _)| base_url.contains(from))
    {
        urls.push(base_url.replace(from, to));
    }

    let mut seen = std::collections::HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    urls
}

/// Append a free-text suffix to the base feed URL.
///
/// The suffix is opaque: it is appended verbatim without validation.
pub fn with_suffix(base_url: &str, suffix: &str) -> String {
    let mut url = base_url.to_string();
    url.push_str(suffix);
    url
}
