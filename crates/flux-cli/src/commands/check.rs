// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Check command: compiles every template and reports syntax errors.

use crate::config::Config;
use console::style;
use flux_view::{compile_template, path_to_string};
use glob::glob;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a check run.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Number of templates compiled.
    pub checked: usize,
    /// Templates that failed, with their error messages.
    pub failures: Vec<(String, String)>,
}

impl CheckReport {
    /// True when every template compiled.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compiles every template under the views directory.
pub fn run(config: &Config, views: Option<&str>) -> anyhow::Result<CheckReport> {
    let views_dir = config.views_dir(views);
    let root = Path::new(&views_dir);
    if !root.is_dir() {
        anyhow::bail!("Views directory '{}' does not exist", views_dir);
    }

    println!("{} {}", style("Checking templates in:").cyan(), views_dir);

    let mut report = CheckReport::default();
    for path in discover(root, &config.views.extensions)? {
        let name = logical_name(root, &path);
        let source = fs::read_to_string(&path)?;
        report.checked += 1;

        match compile_template(&source, Some(&name)) {
            Ok(_) => {
                tracing::debug!("{} compiled", name);
                println!("  {} {}", style("✓").green(), style(&name).dim());
            }
            Err(e) => {
                println!("  {} {}", style("✗").red(), name);
                println!("{}", style(e.to_string()).red());
                report.failures.push((name, e.to_string()));
            }
        }
    }

    println!(
        "{} {} checked, {} failed",
        style("Done:").cyan(),
        report.checked,
        report.failures.len()
    );
    Ok(report)
}

/// Finds template files with any of the given extensions, sorted.
fn discover(root: &Path, extensions: &[String]) -> anyhow::Result<BTreeSet<PathBuf>> {
    let mut found = BTreeSet::new();
    for ext in extensions {
        let pattern = format!("{}/**/*.{}", path_to_string(root), ext.trim_start_matches('.'));
        for path in glob(&pattern)?.flatten() {
            if path.is_file() {
                found.insert(path);
            }
        }
    }
    Ok(found)
}

/// `auth/register.flux` under the root becomes `auth.register`.
fn logical_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    path_to_string(relative).replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_reports_broken_templates() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("auth")).unwrap();
        fs::write(dir.path().join("auth/register.flux"), "@if($a)ok@endif").unwrap();
        fs::write(dir.path().join("broken.html"), "@section('a')@section('b')@endsection@endsection").unwrap();
        fs::write(dir.path().join("notes.txt"), "@if(").unwrap();

        let report = run(&Config::default(), dir.path().to_str()).unwrap();

        assert_eq!(report.checked, 2);
        assert!(!report.is_ok());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "broken");
    }

    #[test]
    fn test_check_clean_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("home.flux"), "{{ $name }}").unwrap();

        let report = run(&Config::default(), dir.path().to_str()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn test_logical_name() {
        let root = Path::new("/views");
        assert_eq!(logical_name(root, Path::new("/views/auth/register.flux")), "auth.register");
        assert_eq!(logical_name(root, Path::new("/views/home.html")), "home");
    }
}
