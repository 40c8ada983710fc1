//! Platform Classifier and URL helpers
//!
//! Pure functions, no I/O:
//! - `classify_platform`: URL → known social platform
//! - `extract_handle`: URL → best-effort account handle
//! - `normalize_url`: dedup key used by the merger
//! - `resolve_link`: resolve an href against the page it was found on
//! - `handle_url` / `handle_query_url`: build backend URLs from a handle

use crate::types::Platform;
use url::Url;

/// Host suffix → platform. A host matches when it equals the entry or is a
/// subdomain of it.
const PLATFORM_TABLE: &[(&str, Platform)] = &[
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
    ("linkedin.com", Platform::LinkedIn),
    ("instagram.com", Platform::Instagram),
    ("facebook.com", Platform::Facebook),
    ("youtube.com", Platform::YouTube),
    ("medium.com", Platform::Medium),
    ("dev.to", Platform::DevTo),
    ("twitch.tv", Platform::Twitch),
    ("discord.gg", Platform::Discord),
    ("bsky.app", Platform::Bluesky),
];

/// Lowercased host of an absolute URL
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// True when `host` is `domain` or one of its subdomains
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Classify a URL by its domain
pub fn classify_platform(url: &str) -> Option<Platform> {
    let host = host_of(url)?;
    PLATFORM_TABLE
        .iter()
        .find(|(domain, _)| host_matches(&host, domain))
        .map(|(_, platform)| *platform)
}

/// Last non-empty path segment, or "" for an empty path or malformed URL
pub fn extract_handle(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    parsed
        .path()
        .trim_matches('/')
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Dedup key form of a URL: a single trailing slash removed
pub fn normalize_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Resolve `href` against `base`, keeping only http(s) results
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(href).ok()?,
        Err(_) => return None,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// `base` with `handle` appended as exactly one percent-encoded path segment
///
/// `/`, `?`, `#` and `%` in the handle are encoded, so it can never address a
/// different resource. `.` and `..` cannot be a segment and yield `None`.
pub fn handle_url(base: &str, handle: &str, trailing_slash: bool) -> Option<String> {
    if matches!(handle, "" | "." | "..") {
        return None;
    }
    let mut url = Url::parse(base).ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.pop_if_empty().push(handle);
        if trailing_slash {
            segments.push("");
        }
    }
    Some(url.into())
}

/// `base` with `key=handle` appended as a form-encoded query pair
pub fn handle_query_url(base: &str, key: &str, handle: &str) -> Option<String> {
    let mut url = Url::parse(base).ok()?;
    url.query_pairs_mut().append_pair(key, handle);
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_platforms() {
        assert_eq!(classify_platform("https://twitter.com/ann"), Some(Platform::Twitter));
        assert_eq!(classify_platform("https://X.com/ann"), Some(Platform::Twitter));
        assert_eq!(
            classify_platform("https://www.linkedin.com/in/ann"),
            Some(Platform::LinkedIn)
        );
        assert_eq!(classify_platform("https://dev.to/ann"), Some(Platform::DevTo));
        assert_eq!(classify_platform("https://discord.gg/abc"), Some(Platform::Discord));
        assert_eq!(
            classify_platform("https://bsky.app/profile/ann.bsky.social"),
            Some(Platform::Bluesky)
        );
    }

    #[test]
    fn test_classify_requires_domain_boundary() {
        assert_eq!(classify_platform("https://netflix.com/ann"), None);
        assert_eq!(classify_platform("https://notmedium.com/ann"), None);
        assert_eq!(classify_platform("https://ann.example.com"), None);
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(classify_platform("not a url"), None);
        assert_eq!(classify_platform(""), None);
    }

    #[test]
    fn test_extract_handle() {
        assert_eq!(extract_handle("https://twitter.com/ann/"), "ann");
        assert_eq!(extract_handle("https://www.linkedin.com/in/ann-lee"), "ann-lee");
        assert_eq!(extract_handle("https://dev.to//ann//"), "ann");
        assert_eq!(extract_handle("https://ann.dev"), "");
        assert_eq!(extract_handle("https://ann.dev/"), "");
        assert_eq!(extract_handle("::::"), "");
    }

    #[test]
    fn test_normalize_url_strips_one_slash() {
        assert_eq!(normalize_url("https://x.example/u/"), "https://x.example/u");
        assert_eq!(normalize_url("https://x.example/u"), "https://x.example/u");
        assert_eq!(normalize_url("https://x.example/u//"), "https://x.example/u/");
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("https://ann.dev/about/", "/contact"),
            Some("https://ann.dev/contact".to_string())
        );
        assert_eq!(
            resolve_link("https://ann.dev", "https://twitter.com/ann"),
            Some("https://twitter.com/ann".to_string())
        );
        assert_eq!(resolve_link("https://ann.dev", "mailto:ann@ann.dev"), None);
        assert_eq!(resolve_link("https://ann.dev", "#top"), None);
        assert_eq!(resolve_link("not a base", "/relative"), None);
    }

    #[test]
    fn test_handle_url_plain() {
        assert_eq!(
            handle_url("https://github.com", "annlee", false).as_deref(),
            Some("https://github.com/annlee")
        );
        assert_eq!(
            handle_url("https://www.picuki.com/profile", "annlee", false).as_deref(),
            Some("https://www.picuki.com/profile/annlee")
        );
        assert_eq!(
            handle_url("https://imginn.com", "annlee", true).as_deref(),
            Some("https://imginn.com/annlee/")
        );
    }

    #[test]
    fn test_handle_url_stays_one_segment() {
        let url = handle_url("https://github.com", "a/../b?x=1#top", false).unwrap();
        let parsed = Url::parse(&url).unwrap();

        assert_eq!(parsed.path_segments().unwrap().count(), 1);
        assert!(parsed.query().is_none());
        assert!(parsed.fragment().is_none());
        assert!(url.starts_with("https://github.com/a%2F..%2Fb%3Fx=1"));
    }

    #[test]
    fn test_handle_url_rejects_dot_segments() {
        assert_eq!(handle_url("https://github.com", "..", false), None);
        assert_eq!(handle_url("https://github.com", ".", false), None);
        assert_eq!(handle_url("https://github.com", "", false), None);
    }

    #[test]
    fn test_handle_query_url_encodes_value() {
        let url = handle_query_url(
            "https://cdn.example/info.json",
            "screen_names",
            "ann&screen_names=zz",
        )
        .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert_eq!(
            pairs,
            vec![("screen_names".to_string(), "ann&screen_names=zz".to_string())]
        );
    }
}
