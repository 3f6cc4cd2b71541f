use crate::config::PageSpec;
use serde::Serialize;

/// Outcome of processing a single page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// The page this result belongs to
    pub page: PageSpec,

    /// Whether a critical CSS file was written
    pub success: bool,

    /// Written file size in kilobytes, two decimals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    /// Create a successful result
    pub fn succeeded(page: PageSpec, size: String) -> Self {
        Self {
            page,
            success: true,
            size: Some(size),
            error: None,
        }
    }

    /// Create a failed result
    pub fn failed(page: PageSpec, error: impl Into<String>) -> Self {
        Self {
            page,
            success: false,
            size: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate over every page of a run, in configured order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<PageResult>,
    pub successful: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Partition results on their success flag
    pub fn from_results(results: Vec<PageResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        Self {
            results,
            successful,
            failed,
        }
    }

    /// Failed results, in order
    pub fn failures(&self) -> impl Iterator<Item = &PageResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition() {
        let summary = RunSummary::from_results(vec![
            PageResult::succeeded(PageSpec::new("/", "index"), "1.20".into()),
            PageResult::failed(PageSpec::new("/blog", "blog"), "HTTP 500"),
            PageResult::succeeded(PageSpec::new("/about", "page"), "0.50".into()),
        ]);

        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.successful + summary.failed, summary.results.len());
        assert!(!summary.is_success());

        let failures: Vec<_> = summary.failures().map(|r| r.page.template.as_str()).collect();
        assert_eq!(failures, vec!["blog"]);
    }

    #[test]
    fn test_empty_run() {
        let summary = RunSummary::from_results(Vec::new());
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.is_success());
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let ok = PageResult::succeeded(PageSpec::new("/", "index"), "0.01".into());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["size"], "0.01");
        assert!(json.get("error").is_none());

        let err = PageResult::failed(PageSpec::new("/", "index"), "boom");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "boom");
        assert!(json.get("size").is_none());
    }
}
