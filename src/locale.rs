//! Language code validation.
//!
//! Content repositories are split into per-language directories named by a
//! two-letter lowercase code (`en/`, `it/`, `de/`). The same predicate decides
//! which directories count as languages during indexing and which request-path
//! segments are accepted by the query layer.

/// Returns true for exactly two lowercase ASCII letters.
///
/// - `"en"` → true
/// - `"EN"`, `"e"`, `"eng"`, `"e1"`, `"é"` → false
pub fn is_valid_locale(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 2 && bytes.iter().all(u8::is_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_two_letter_lowercase_code() {
        let mut accepted = 0;
        for a in b'a'..=b'z' {
            for b in b'a'..=b'z' {
                let code = String::from_utf8(vec![a, b]).unwrap();
                assert!(is_valid_locale(&code), "{code} should be valid");
                accepted += 1;
            }
        }
        assert_eq!(accepted, 26 * 26);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(!is_valid_locale(""));
        assert!(!is_valid_locale("e"));
        assert!(!is_valid_locale("eng"));
        assert!(!is_valid_locale("en-us"));
    }

    #[test]
    fn rejects_uppercase_and_digits() {
        assert!(!is_valid_locale("EN"));
        assert!(!is_valid_locale("En"));
        assert!(!is_valid_locale("e1"));
        assert!(!is_valid_locale("_a"));
        assert!(!is_valid_locale("a-"));
    }

    #[test]
    fn rejects_non_ascii_letters() {
        // "é" is two bytes in UTF-8 but not an ASCII letter
        assert!(!is_valid_locale("é"));
        assert!(!is_valid_locale("ñ"));
        assert!(!is_valid_locale("ßa"));
    }
}
