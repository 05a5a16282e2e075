//! Trailing punctuation clean-up for MARC subfield values

/// Strip ISBD separators left at the end of a name or extent value.
///
/// Removes, in order and at most once each: a trailing `,`, then ` :`,
/// ` ;`, ` /` and ` -`.
pub fn remove_punctuation(value: &str) -> String {
    let mut data = value;
    if let Some(stripped) = data.strip_suffix(',') {
        data = stripped;
    }
    for suffix in [" :", " ;", " /", " -"] {
        if let Some(stripped) = data.strip_suffix(suffix) {
            data = stripped;
        }
    }
    data.to_string()
}

/// Remove one trailing `,` or one whitespace-separated `:` `;` `/` `-`,
/// along with surrounding trailing whitespace.
pub fn remove_trailing_punctuation(value: &str) -> String {
    let data = value.trim_end();

    if let Some(stripped) = data.strip_suffix(',') {
        return stripped.trim_end().to_string();
    }

    let mut chars = data.chars().rev();
    if let (Some(last), Some(before)) = (chars.next(), chars.next()) {
        if matches!(last, ':' | ';' | '/' | '-') && before.is_whitespace() {
            return data[..data.len() - last.len_utf8()].trim_end().to_string();
        }
    }

    data.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_punctuation() {
        assert_eq!(remove_punctuation("Dupont, Jean,"), "Dupont, Jean");
        assert_eq!(remove_punctuation("345 p. :"), "345 p.");
        assert_eq!(remove_punctuation("Paris ;"), "Paris");
        assert_eq!(remove_punctuation("Titre /"), "Titre");
        assert_eq!(remove_punctuation("1950 -"), "1950");
        assert_eq!(remove_punctuation("no change"), "no change");
        assert_eq!(remove_punctuation(""), "");
    }

    #[test]
    fn test_remove_trailing_punctuation() {
        assert_eq!(remove_trailing_punctuation("Paris :"), "Paris");
        assert_eq!(remove_trailing_punctuation("Gallimard, "), "Gallimard");
        assert_eq!(remove_trailing_punctuation("2e éd. /"), "2e éd.");
        assert_eq!(remove_trailing_punctuation("A-B"), "A-B");
        assert_eq!(remove_trailing_punctuation("Genève"), "Genève");
    }
}
