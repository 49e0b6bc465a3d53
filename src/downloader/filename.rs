// Filename sanitizing for output files

use regex::Regex;

/// Longest file name most filesystems accept
pub const MAX_FILENAME_LEN: usize = 255;

/// Used when a title sanitizes to nothing
pub const FALLBACK_NAME: &str = "untitled";

lazy_static::lazy_static! {
    static ref ILLEGAL_RE: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
    static ref CONTROL_RE: Regex = Regex::new(r"[\x00-\x1f\x7f]").unwrap();
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Strip filesystem-illegal characters from a title.
///
/// The result is at most [`MAX_FILENAME_LEN`] characters and never empty.
pub fn sanitize(title: &str) -> String {
    let stripped = ILLEGAL_RE.replace_all(title, "");
    let spaced = CONTROL_RE.replace_all(&stripped, " ");
    let collapsed = WS_RE.replace_all(&spaced, " ");
    let trimmed = trim_name_end(collapsed.trim());

    // Truncation can expose new trailing dots or spaces
    let truncated: String = trimmed.chars().take(MAX_FILENAME_LEN).collect();
    let truncated = trim_name_end(&truncated);

    if truncated.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        truncated.to_string()
    }
}

/// `<sanitized title>.<ext>`, shortened so the whole name fits in
/// [`MAX_FILENAME_LEN`] bytes
pub fn output_file_name(title: &str, ext: &str) -> String {
    let stem = sanitize(title);
    let budget = MAX_FILENAME_LEN.saturating_sub(ext.len() + 1);

    let mut end = stem.len().min(budget);
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    let stem = trim_name_end(&stem[..end]);
    let stem = if stem.is_empty() { FALLBACK_NAME } else { stem };
    format!("{}.{}", stem, ext)
}

/// Windows drops trailing dots and spaces from file names
fn trim_name_end(name: &str) -> &str {
    name.trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    #[test]
    fn test_removes_illegal_chars() {
        assert_eq!(sanitize("a:b?c"), "abc");
        assert_eq!(sanitize("What? <Live> \"2024\" | HD*"), "What Live 2024 HD");
    }

    #[test]
    fn test_every_illegal_char_removed() {
        for c in ILLEGAL {
            let result = sanitize(&format!("test{}file", c));
            assert!(!result.contains(c), "char '{}' should be removed", c);
            assert_eq!(result, "testfile");
        }
    }

    #[test]
    fn test_control_chars_and_whitespace() {
        assert_eq!(sanitize("line\none\ttab"), "line one tab");
        assert_eq!(sanitize("a\x01b\x7fc"), "a b c");
        assert_eq!(sanitize("  hello   world  "), "hello world");
        assert_eq!(sanitize("ends with dots..."), "ends with dots");
    }

    #[test]
    fn test_truncates_long_titles() {
        let long = "ab:".repeat(200);
        let result = sanitize(&long);
        assert_eq!(result.chars().count(), MAX_FILENAME_LEN);
        assert!(ILLEGAL.iter().all(|c| !result.contains(*c)));
    }

    #[test]
    fn test_truncation_retrims_dots() {
        let title = format!("{}. tail", "a".repeat(MAX_FILENAME_LEN - 1));
        let result = sanitize(&title);
        assert_eq!(result, "a".repeat(MAX_FILENAME_LEN - 1));
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(sanitize(""), FALLBACK_NAME);
        assert_eq!(sanitize("???***"), FALLBACK_NAME);
        assert_eq!(sanitize(" . "), FALLBACK_NAME);
    }

    #[test]
    fn test_output_file_name_fits_byte_limit() {
        let title = "é".repeat(300);
        let name = output_file_name(&title, "mp4");
        assert!(name.len() <= MAX_FILENAME_LEN);
        assert!(name.ends_with(".mp4"));

        assert_eq!(output_file_name("My: Video", "mp4"), "My Video.mp4");
    }

    #[test]
    fn test_unicode_kept() {
        assert_eq!(sanitize("Привет / мир"), "Привет мир");
    }
}
