//! Naming rules for managed log files.
//!
//! Classification looks at the base name only. Any rule matching qualifies the
//! file; date rules only accept years in the `20xx` range.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::RegexSet;

const LOG_NAME_PATTERNS: &[&str] = &[
    // app.log
    r"^.*\.log$",
    // server.log.2025-12-01-02
    r"^.*\.log\.20\d{2}-\d{2}-\d{2}-\d{2}$",
    // controller.log.2021-05-16
    r"^.*\.log\.20\d{2}-\d{2}-\d{2}$",
    // log.2025-12-24.0.log
    r"^log\.20\d{2}-\d{2}-\d{2}\.\d+\.log$",
    // trace.2025-12-03.0.log
    r"^trace\.20\d{2}-\d{2}-\d{2}\.\d+\.log$",
    // 1201838490.log
    r"^\d+\.log$",
];

static LOG_NAMES: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(LOG_NAME_PATTERNS).unwrap_or_else(|_| RegexSet::empty())
});

/// Whether a base name (no directory component) denotes a managed log file.
#[must_use]
pub fn is_managed_log(file_name: &str) -> bool {
    LOG_NAMES.is_match(file_name)
}

/// Classify a path by its final component. Names that are not valid UTF-8 never match.
#[must_use]
pub fn is_managed_log_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(is_managed_log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert_eq!(LOG_NAMES.len(), LOG_NAME_PATTERNS.len());
    }

    #[test]
    fn accepts_rotation_conventions() {
        for name in [
            "app.log",
            ".log",
            "server.log.2025-12-01-02",
            "controller.log.2021-05-16",
            "log.2025-12-24.0.log",
            "trace.2025-12-03.17.log",
            "1201838490.log",
        ] {
            assert!(is_managed_log(name), "{name} should be managed");
        }
    }

    #[test]
    fn rejects_unrelated_names() {
        for name in [
            "app.txt",
            "app.log.gz",
            "app.logs",
            "server.log.1999-12-01",
            "server.log.2025-12-01.bak",
            "controller.log.2021-5-16",
            "trace.2025-12-03.log.tmp",
            "",
        ] {
            assert!(!is_managed_log(name), "{name} should not be managed");
        }
    }

    #[test]
    fn path_classification_ignores_directories_in_the_name() {
        assert!(is_managed_log_path(Path::new("/var/log/nested/2025-01-01/app.log")));
        assert!(!is_managed_log_path(Path::new("/var/app.log/readme.md")));
        assert!(!is_managed_log_path(Path::new("/")));
    }
}
