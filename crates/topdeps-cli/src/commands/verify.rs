//! Verify command - check a destination after a download run

use console::style;
use std::path::Path;

use topdeps_core::{DestinationSummary, PackageName, has_package};

use crate::error::{CliError, Result};
use crate::util::format_size;

/// Thresholds a destination is checked against
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub count: usize,
    pub min_kib_per_package: u64,
    pub expect: Vec<PackageName>,
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub passed: bool,
}

/// Evaluate every check against a scanned destination
pub fn evaluate(root: &Path, summary: &DestinationSummary, options: &VerifyOptions) -> Vec<Check> {
    let mut checks = vec![
        Check {
            label: format!("has {} packages (found {})", options.count, summary.count()),
            passed: summary.count() == options.count,
        },
        Check {
            label: format!(
                "at least {} KiB per package ({} total)",
                options.min_kib_per_package,
                format_size(summary.total_bytes)
            ),
            passed: summary.total_bytes
                > options.min_kib_per_package * 1024 * options.count as u64,
        },
    ];

    for name in &options.expect {
        checks.push(Check {
            label: format!("{} present", name),
            passed: has_package(root, name),
        });
    }

    checks
}

pub fn run(dest: &Path, options: &VerifyOptions) -> Result<()> {
    if !dest.is_dir() {
        return Err(CliError::Io {
            message: format!("Destination not found: {}", dest.display()),
        });
    }

    println!("{} {}", style("Verifying").cyan().bold(), dest.display());
    println!();

    let summary = DestinationSummary::scan(dest)?;
    let checks = evaluate(dest, &summary, options);

    for check in &checks {
        if check.passed {
            println!("  {} {}", style("[OK]").green().bold(), check.label);
        } else {
            println!("  {} {}", style("[FAIL]").red().bold(), check.label);
        }
    }
    println!();

    let failed = checks.iter().filter(|c| !c.passed).count();
    if failed > 0 {
        return Err(CliError::VerifyFailed {
            failed,
            total: checks.len(),
        });
    }

    println!(
        "{} {} packages, average {}",
        style("Verified").green().bold(),
        summary.count(),
        format_size(summary.average_bytes())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(root: &Path, dir: &str, size: usize) {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("package.json"), r#"{"name": "x"}"#).unwrap();
        std::fs::write(path.join("index.js"), vec![b'a'; size]).unwrap();
    }

    fn options(count: usize, expect: &[&str]) -> VerifyOptions {
        VerifyOptions {
            count,
            min_kib_per_package: 5,
            expect: expect.iter().map(|n| PackageName::parse(n).unwrap()).collect(),
        }
    }

    #[test]
    fn test_all_checks_pass() {
        let temp = TempDir::new().unwrap();
        package(temp.path(), "lodash", 8 * 1024);
        package(temp.path(), "@types-node", 8 * 1024);
        std::fs::write(temp.path().join(".gitignore"), "*").unwrap();

        let summary = DestinationSummary::scan(temp.path()).unwrap();
        let checks = evaluate(temp.path(), &summary, &options(2, &["lodash", "@types/node"]));

        assert_eq!(checks.len(), 4);
        assert!(checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_count_mismatch_fails() {
        let temp = TempDir::new().unwrap();
        package(temp.path(), "lodash", 8 * 1024);

        let summary = DestinationSummary::scan(temp.path()).unwrap();
        let checks = evaluate(temp.path(), &summary, &options(2, &[]));
        assert!(!checks[0].passed);
    }

    #[test]
    fn test_small_packages_fail_size_check() {
        let temp = TempDir::new().unwrap();
        package(temp.path(), "tiny", 10);

        let summary = DestinationSummary::scan(temp.path()).unwrap();
        let checks = evaluate(temp.path(), &summary, &options(1, &[]));
        assert!(checks[0].passed);
        assert!(!checks[1].passed);
    }

    #[test]
    fn test_expected_package_missing() {
        let temp = TempDir::new().unwrap();
        package(temp.path(), "lodash", 8 * 1024);

        let summary = DestinationSummary::scan(temp.path()).unwrap();
        let checks = evaluate(temp.path(), &summary, &options(1, &["react"]));
        assert_eq!(checks[2].label, "react present");
        assert!(!checks[2].passed);
    }

    #[test]
    fn test_missing_destination() {
        let temp = TempDir::new().unwrap();
        let err = run(&temp.path().join("nope"), &options(1, &[])).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
