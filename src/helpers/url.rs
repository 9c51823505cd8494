//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters left as-is in a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello/") // -> "/blog/post/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Encode a single path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Whether a uid maps to its own directory under `post/`
///
/// Encoding already escapes path separators, so only the empty uid and the
/// dot segments `.` and `..` escape the post directory.
pub fn is_valid_uid(uid: &str) -> bool {
    !matches!(uid, "" | "." | "..")
}

/// Site-relative path of a post detail page
pub fn post_path(uid: &str) -> String {
    format!("post/{}/", encode_segment(uid))
}

/// Site-relative path of the n-th accumulated list page (1 is the home page)
pub fn list_path(page: usize) -> String {
    if page <= 1 {
        String::new()
    } else {
        format!("page/{}/", page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://example.com".to_string();
        config.root = "/blog/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/post/a/"), "/blog/post/a/");
        assert_eq!(url_for(&config, ""), "/blog/");
        assert_eq!(url_for(&SiteConfig::default(), "page/2/"), "/page/2/");
    }

    #[test]
    fn test_post_path_encodes_uid() {
        assert_eq!(post_path("como-utilizar-hooks"), "post/como-utilizar-hooks/");
        assert_eq!(post_path("a b/c"), "post/a%20b%2Fc/");
        assert_eq!(post_path("ação"), "post/a%C3%A7%C3%A3o/");
    }

    #[test]
    fn test_dot_segments_are_not_valid_uids() {
        assert!(is_valid_uid("como-utilizar-hooks"));
        assert!(is_valid_uid("v1.2"));
        assert!(is_valid_uid("..."));
        assert!(is_valid_uid("../etc"));
        assert!(!is_valid_uid(""));
        assert!(!is_valid_uid("."));
        assert!(!is_valid_uid(".."));
    }

    #[test]
    fn test_list_path() {
        assert_eq!(list_path(1), "");
        assert_eq!(list_path(3), "page/3/");
    }
}
