//! Structured diagnostics that never alter control flow.
//!
//! Recording and replay report what they skip or could not do and then carry
//! on. The default [`TracingReporter`] forwards everything to `tracing`; the
//! application layer can install its own [`Reporter`] to route reports to a
//! debug-utils messenger.

use std::fmt;
use std::sync::Mutex;

use ash::vk;

use crate::dependents::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A GL feature the operation needs is missing on this device.
    UnsupportedFeature,
    Validation,
    ShaderCompilation,
    ProgramLink,
    /// A GL error observed during replay.
    Backend,
    /// A resource was destroyed while still referenced by recorded commands.
    ResourceLifetime,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::UnsupportedFeature => "Unsupported feature",
            Category::Validation => "Validation",
            Category::ShaderCompilation => "Shader compilation",
            Category::ProgramLink => "Program link",
            Category::Backend => "Backend",
            Category::ResourceLifetime => "Resource lifetime",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub object: Option<ObjectId>,
    pub result: vk::Result,
    pub category: Category,
    pub message: String,
}

pub trait Reporter: Send + Sync {
    fn report(&self, report: Report);
}

impl dyn Reporter + '_ {
    pub fn error(
        &self,
        object: Option<ObjectId>,
        result: vk::Result,
        category: Category,
        message: impl Into<String>,
    ) {
        self.report(Report {
            severity: Severity::Error,
            object,
            result,
            category,
            message: message.into(),
        });
    }

    pub fn warning(
        &self,
        object: Option<ObjectId>,
        result: vk::Result,
        category: Category,
        message: impl Into<String>,
    ) {
        self.report(Report {
            severity: Severity::Warning,
            object,
            result,
            category,
            message: message.into(),
        });
    }

    /// Shorthand for the capability-missing case.
    pub fn unsupported(&self, object: Option<ObjectId>, message: impl Into<String>) {
        self.error(
            object,
            vk::Result::ERROR_FEATURE_NOT_PRESENT,
            Category::UnsupportedFeature,
            message,
        );
    }

    pub fn validation(&self, object: Option<ObjectId>, message: impl Into<String>) {
        self.error(
            object,
            vk::Result::ERROR_VALIDATION_FAILED_EXT,
            Category::Validation,
            message,
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: Report) {
        let object = report.object.map(|o| format!("{o}"));
        match report.severity {
            Severity::Error => tracing::error!(
                category = %report.category,
                result = ?report.result,
                object = object.as_deref().unwrap_or("-"),
                "{}",
                report.message
            ),
            Severity::Warning => tracing::warn!(
                category = %report.category,
                result = ?report.result,
                object = object.as_deref().unwrap_or("-"),
                "{}",
                report.message
            ),
        }
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<Report>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.lock().clone()
    }

    pub fn count(&self, category: Category) -> usize {
        self.lock().iter().filter(|r| r.category == category).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Report>> {
        self.reports.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, report: Report) {
        self.lock().push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_uses_fixed_category_name() {
        let collector = CollectingReporter::new();
        let reporter: &dyn Reporter = &collector;
        reporter.unsupported(None, "multi-draw indirect");

        let reports = collector.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category.to_string(), "Unsupported feature");
        assert_eq!(reports[0].result, vk::Result::ERROR_FEATURE_NOT_PRESENT);
        assert_eq!(reports[0].severity, Severity::Error);
    }
}
