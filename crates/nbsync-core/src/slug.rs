//! URL-friendly slug generation for NetBox objects.

/// Turn an arbitrary display name into a NetBox slug: lowercase, every run
/// of non-alphanumeric characters collapsed into a single hyphen, no
/// leading or trailing hyphens.
///
/// The function is idempotent: `slugify(slugify(s)) == slugify(s)`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_string() {
        assert_eq!(slugify("Test"), "test");
    }

    #[test]
    fn string_with_spaces() {
        assert_eq!(slugify("Test String"), "test-string");
    }

    #[test]
    fn string_with_trailing_spaces() {
        assert_eq!(slugify("    Te st    "), "te-st");
    }

    #[test]
    fn collapses_repeated_separators() {
        assert_eq!(slugify("a -- b__c"), "a-b-c");
    }

    #[test]
    fn idempotent() {
        for input in ["Test String", "    Te st    ", "A+B=C", "already-a-slug"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn output_alphabet() {
        let slug = slugify("Ärger & Fröhlich GmbH (Berlin) #3");
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!slug.starts_with('-') && !slug.ends_with('-'));
    }
}
