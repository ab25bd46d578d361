//! XML name validation and utilities
//!
//! Syntax checks for NCNames and QNames, used when deciding whether an
//! attribute value looks like a qualified-name reference.

use once_cell::sync::Lazy;
use regex::Regex;

// NCName pattern (simplified to the ranges that occur in practice)
static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\-\.0-9]*$")
        .unwrap()
});

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (`prefix:localName` or `localName`)
pub fn is_valid_qname(name: &str) -> bool {
    if let Some((prefix, local)) = name.split_once(':') {
        is_valid_ncname(prefix) && is_valid_ncname(local)
    } else {
        is_valid_ncname(name)
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ncname() {
        assert!(is_valid_ncname("element"));
        assert!(is_valid_ncname("my-element"));
        assert!(is_valid_ncname("_element"));
        assert!(is_valid_ncname("element123"));

        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("123element"));
        assert!(!is_valid_ncname("-element"));
        assert!(!is_valid_ncname("prefix:element"));
    }

    #[test]
    fn test_is_valid_qname() {
        assert!(is_valid_qname("element"));
        assert!(is_valid_qname("prefix:element"));
        assert!(is_valid_qname("xs:schema"));

        assert!(!is_valid_qname(""));
        assert!(!is_valid_qname(":element"));
        assert!(!is_valid_qname("element:"));
        // URLs are colon-separated but are not qualified names
        assert!(!is_valid_qname("http://example.com/x"));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("element"), (None, "element"));
        assert_eq!(split_qname("xs:element"), (Some("xs"), "element"));
    }
}
