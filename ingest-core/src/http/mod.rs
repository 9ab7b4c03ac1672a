//! Page fetching.
//!
//! Every outgoing request goes through a [`Fetcher`] so crawls can be
//! replayed against canned pages in tests and rate limited in production.

pub(crate) mod charset;
mod client;
mod rate_limiter;

pub use charset::decode_body;
pub use client::{
    classify_transport_error, Fetcher, HttpFetcher, HttpFetcherBuilder, MockFetcher,
    MockResponse,
};
pub use rate_limiter::RateLimiter;

/// Longest slug produced, keeps file names portable.
const MAX_SLUG_LEN: usize = 200;

/// Convert a URL to a filesystem-safe slug.
/// e.g. "https://cookpad.com/vn/cong-thuc/123?ref=x" -> "cookpad-com_vn-cong-thuc-123"
pub fn slugify_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return sanitize_for_filesystem(url);
    };

    let host = parsed
        .host_str()
        .unwrap_or("unknown")
        .trim_start_matches("www.");
    let path = parsed.path().trim_matches('/');

    if path.is_empty() {
        sanitize_for_filesystem(host)
    } else {
        sanitize_for_filesystem(&format!("{}_{}", host, path))
    }
}

fn sanitize_for_filesystem(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            '.' | '/' => '-',
            _ => '_',
        })
        .take(MAX_SLUG_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_drops_scheme_www_and_query() {
        assert_eq!(
            slugify_url("https://www.cookpad.com/vn/cong-thuc/123?ref=search"),
            "cookpad-com_vn-cong-thuc-123"
        );
        assert_eq!(slugify_url("https://cookpad.com/"), "cookpad-com");
    }

    #[test]
    fn slug_of_unparseable_input_is_sanitized() {
        assert_eq!(slugify_url("phở bò"), "ph__b_");
    }
}
