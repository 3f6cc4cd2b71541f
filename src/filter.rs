use regex::Regex;

/// Selector filter that forces rules in or out regardless of page matching
#[derive(Debug, Default)]
pub struct RuleFilter {
    allow_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl RuleFilter {
    /// Compile the allow and exclude patterns
    pub fn new(allow_patterns: &[String], exclude_patterns: &[String]) -> Result<Self, regex::Error> {
        let mut allow_regexes = Vec::with_capacity(allow_patterns.len());
        for pattern in allow_patterns {
            allow_regexes.push(Regex::new(pattern)?);
        }

        let mut exclude_regexes = Vec::with_capacity(exclude_patterns.len());
        for pattern in exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            allow_regexes,
            exclude_regexes,
        })
    }

    /// Forced decision for a selector, or `None` when page matching decides
    ///
    /// Exclusions take precedence over allowances.
    pub fn decide(&self, selector: &str) -> Option<bool> {
        if self.exclude_regexes.iter().any(|r| r.is_match(selector)) {
            return Some(false);
        }
        if self.allow_regexes.iter().any(|r| r.is_match(selector)) {
            return Some(true);
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.allow_regexes.is_empty() && self.exclude_regexes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_filter_decides_nothing() {
        let filter = RuleFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.decide(".anything"), None);
    }

    #[test]
    fn test_allow_and_exclude() {
        let filter = RuleFilter::new(
            &patterns(&[r"^\.js-", r"\.modal"]),
            &patterns(&[r"\.modal--hidden"]),
        )
        .unwrap();

        assert_eq!(filter.decide(".js-menu"), Some(true));
        assert_eq!(filter.decide("body .modal"), Some(true));
        // Exclusion wins over an allow match
        assert_eq!(filter.decide(".modal--hidden"), Some(false));
        assert_eq!(filter.decide("h1"), None);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RuleFilter::new(&patterns(&["("]), &[]).is_err());
    }
}
