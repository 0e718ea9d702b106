//! Pluralization helpers for log lines.

/// Return "s" suffix for plural counts
///
/// - `plural_s(0)` -> `"s"` (0 assets)
/// - `plural_s(1)` -> `""` (1 asset)
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Format count with noun, handling pluralization
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, plural_s(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "bundle"), "0 bundles");
        assert_eq!(plural_count(1, "bundle"), "1 bundle");
        assert_eq!(plural_count(3, "failure"), "3 failures");
    }
}
