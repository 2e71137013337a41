pub(crate) trait StrExt {
    /// ASCII case-insensitive [`str::starts_with`].
    fn starts_with_ignore_case(&self, start: &str) -> bool;
}

impl StrExt for str {
    fn starts_with_ignore_case(&self, start: &str) -> bool {
        self.get(..start.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(start))
    }
}

/// Splits a joined attribute value, dropping blank parts.
pub(crate) fn split_values(joined: &str, separator: &str) -> Vec<String> {
    joined
        .split(separator)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_ignore_case() {
        assert!("TEXT/plain".starts_with_ignore_case("text/"));
        assert!(!"tex".starts_with_ignore_case("text/"));
        assert!(!"téxt/plain".starts_with_ignore_case("text"));
    }

    #[test]
    fn test_split_values() {
        assert_eq!(vec!["a", "b c"], split_values(" a ;; b c ; ", ";"));
        assert!(split_values("", ";").is_empty());
    }
}
