use crate::utils::validation::{
    MAX_FILENAME_BYTES, has_html_extension, sanitize_filename, strip_html_extension,
    truncate_on_char_boundary,
};
use std::collections::HashSet;

const HTML_EXTENSION: &str = ".html";

/// Room kept free for a `-<n>` collision suffix
const SUFFIX_RESERVE: usize = 8;

/// Longest stem that still fits with extension and suffix
pub const MAX_STEM_BYTES: usize = MAX_FILENAME_BYTES - HTML_EXTENSION.len() - SUFFIX_RESERVE;

/// Hands out unique output filenames for one job.
///
/// Names are compared case-insensitively; every allocated name is remembered
/// so later rows never collide with earlier ones. Every name fits in
/// `MAX_FILENAME_BYTES`, suffix included.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    used: HashSet<String>,
}

fn bounded_stem(stem: &str) -> &str {
    truncate_on_char_boundary(stem, MAX_STEM_BYTES)
        .trim_end_matches(|c: char| c == '.' || c == '-' || c == '_')
}

impl FilenameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a filename for the row at 1-based `position`.
    pub fn allocate(&mut self, requested: &str, position: usize) -> String {
        let sanitized = sanitize_filename(requested);
        let (stem, extension) = if has_html_extension(&sanitized) {
            let stem = strip_html_extension(&sanitized);
            (stem, &sanitized[stem.len()..])
        } else {
            (sanitized.as_str(), HTML_EXTENSION)
        };

        let stem = bounded_stem(stem);
        let mut name = if stem.is_empty() {
            format!("sip-{}{}", position, HTML_EXTENSION)
        } else {
            format!("{}{}", stem, extension)
        };

        if self.used.contains(&name.to_lowercase()) {
            let stem = strip_html_extension(&name).to_string();
            let mut n = 1;
            loop {
                let candidate = format!("{}-{}{}", stem, n, HTML_EXTENSION);
                if !self.used.contains(&candidate.to_lowercase()) {
                    name = candidate;
                    break;
                }
                n += 1;
            }
        }

        self.used.insert(name.to_lowercase());
        name
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_requests_get_suffixes() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("ad.html", 1), "ad.html");
        assert_eq!(allocator.allocate("ad.html", 2), "ad-1.html");
        assert_eq!(allocator.allocate("AD.HTML", 3), "AD-2.html");
    }

    #[test]
    fn test_empty_name_uses_position() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("", 3), "sip-3.html");
        assert_eq!(allocator.allocate("  ", 4), "sip-4.html");
        assert_eq!(allocator.allocate("???", 5), "sip-5.html");
    }

    #[test]
    fn test_extension_is_normalized() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("promo", 1), "promo.html");
        assert_eq!(allocator.allocate("legacy.htm", 2), "legacy.htm");
        assert_eq!(allocator.allocate("banner.gif", 3), "banner.gif.html");
    }

    #[test]
    fn test_collision_with_htm_becomes_html() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("page.htm", 1), "page.htm");
        assert_eq!(allocator.allocate("PAGE.htm", 2), "PAGE-1.html");
    }

    #[test]
    fn test_fallback_does_not_collide_with_requested() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("sip-2", 1), "sip-2.html");
        assert_eq!(allocator.allocate("", 2), "sip-2-1.html");
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("ad-1.html", 1), "ad-1.html");
        assert_eq!(allocator.allocate("ad.html", 2), "ad.html");
        assert_eq!(allocator.allocate("ad.html", 3), "ad-2.html");
    }

    #[test]
    fn test_clean_unique_name_is_unchanged() {
        let mut allocator = FilenameAllocator::new();
        let name = allocator.allocate("My Promo (v2).html", 1);
        let mut fresh = FilenameAllocator::new();
        assert_eq!(fresh.allocate(&name, 1), name);
    }

    #[test]
    fn test_long_names_fit_on_disk() {
        let mut allocator = FilenameAllocator::new();
        for len in [255, 1000] {
            let requested = "b".repeat(len);
            let first = allocator.allocate(&requested, 1);
            let second = allocator.allocate(&requested, 2);

            assert!(first.len() <= MAX_FILENAME_BYTES, "{} bytes", first.len());
            assert!(second.len() <= MAX_FILENAME_BYTES, "{} bytes", second.len());
            assert!(first.ends_with(".html"));
            assert_ne!(first, second);
        }
    }

    #[test]
    fn test_long_names_are_writable() {
        let dir = tempfile::tempdir().unwrap();
        let mut allocator = FilenameAllocator::new();
        let requested = format!("{}.html", "é".repeat(400));
        for position in 1..=3 {
            let name = allocator.allocate(&requested, position);
            std::fs::write(dir.path().join(&name), "x").unwrap();
        }
    }

    #[test]
    fn test_names_are_unique_case_insensitively() {
        let mut allocator = FilenameAllocator::new();
        let requests = ["a.html", "A.html", "a", "", "", "a.HTML", "a-1.html"];
        let names: Vec<String> = requests
            .iter()
            .enumerate()
            .map(|(i, r)| allocator.allocate(r, i + 1))
            .collect();

        let lowered: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        assert_eq!(lowered.len(), names.len());
    }
}
