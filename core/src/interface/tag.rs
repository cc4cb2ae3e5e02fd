/// Decides whether an advertised device name belongs to the bound tag.
///
/// Matching is a case-insensitive substring test. The transport applies it
/// before forwarding samples; the estimators never see identifiers.
#[derive(Debug, Clone)]
pub struct TagMatcher {
    code: String,
}

impl TagMatcher {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.trim().to_uppercase(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn matches(&self, advertised: &str) -> bool {
        !self.code.is_empty() && advertised.to_uppercase().contains(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_ignores_case() {
        let matcher = TagMatcher::new("tag01");
        assert!(matcher.matches("TAG01"));
        assert!(matcher.matches("radar-Tag01-beacon"));
        assert!(!matcher.matches("TAG02"));
    }

    #[test]
    fn empty_code_matches_nothing() {
        let matcher = TagMatcher::new("  ");
        assert!(!matcher.matches("anything"));
    }
}
