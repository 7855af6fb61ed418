//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layering between
//! domain, application, infra and the command surface stays intact.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and report whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Production lines of every file under `dir`: comments and `#[cfg(test)]`
/// blocks are skipped. Yields `(relative path, 1-based line number, line)`.
fn production_lines(dir: &Path) -> Vec<(String, usize, String)> {
    let mut lines = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = relative(&file);
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") || trimmed.starts_with('*') {
                continue;
            }
            lines.push((rel.clone(), i + 1, line.to_string()));
        }
    }
    lines
}

fn violations_in(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    production_lines(dir)
        .into_iter()
        .filter_map(|(rel, lineno, line)| {
            forbidden
                .iter()
                .find(|f| line.contains(**f))
                .map(|f| format!("{rel}:{lineno}: `{f}`: {line}"))
        })
        .collect()
}

#[test]
fn domain_performs_no_io() {
    let violations = violations_in(
        &src_dir().join("domain"),
        &[
            "tokio",
            "std::process",
            "std::fs",
            "std::net",
            "crate::infra",
            "crate::application",
            "crate::commands",
        ],
    );

    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_does_not_reach_into_infra() {
    let violations = violations_in(
        &src_dir().join("application"),
        &["crate::infra", "crate::commands", "crate::output"],
    );

    assert!(
        violations.is_empty(),
        "application/ must depend on ports, not adapters:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = violations_in(&src_dir().join("infra"), &["crate::commands", "crate::output"]);

    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_and_services_have_no_print_macros_outside_tests() {
    let mut violations = violations_in(&src_dir().join("infra"), &["println!", "eprintln!"]);
    violations.extend(violations_in(
        &src_dir().join("application"),
        &["println!", "eprintln!"],
    ));

    assert!(
        violations.is_empty(),
        "infra/ and application/ report through tracing or the reporter port:\n{}",
        violations.join("\n")
    );
}

#[test]
fn process_spawning_stays_in_infra() {
    let violations: Vec<String> = production_lines(&src_dir())
        .into_iter()
        .filter(|(rel, _, _)| !rel.contains("/infra/") && !rel.ends_with("app.rs"))
        .filter(|(_, _, line)| {
            line.contains("TokioCommandRunner::new") || line.contains("Command::new(")
        })
        .map(|(rel, lineno, line)| format!("{rel}:{lineno}: {line}"))
        .collect();

    assert!(
        violations.is_empty(),
        "processes are spawned only by infra/ adapters wired in app.rs:\n{}",
        violations.join("\n")
    );
}

#[test]
fn commands_render_through_the_output_context() {
    let violations: Vec<String> = production_lines(&src_dir().join("commands"))
        .into_iter()
        .filter(|(_, _, line)| {
            let trimmed = line.trim();
            line.contains("json: bool") || trimmed.starts_with("if json") || trimmed.starts_with("if !json")
        })
        .map(|(rel, lineno, line)| format!("{rel}:{lineno}: {line}"))
        .collect();

    assert!(
        violations.is_empty(),
        "commands/ must not branch on JSON mode inline:\n{}",
        violations.join("\n")
    );
}
