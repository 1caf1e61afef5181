use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

// Directories that never belong to this crate's own sources.
const SKIPPED_ROOTS: [&str; 2] = ["./target", "./examples"];

/// Which source rule a collector enforces. Each rule carries its own advice.
#[derive(Clone, Copy)]
enum Rule {
    UnderscoreBinding,
    ForbiddenComment,
    AllowDeadCode,
}

impl Rule {
    fn headline(self) -> &'static str {
        match self {
            Rule::UnderscoreBinding => "underscore-prefixed variables",
            Rule::ForbiddenComment => "forbidden comment patterns",
            Rule::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }

    fn advice(self) -> &'static str {
        match self {
            Rule::UnderscoreBinding => {
                "Underscore-prefixed variable names are not allowed in this project.\n   Either use the variable (removing the underscore) or remove it completely."
            }
            Rule::ForbiddenComment => {
                "Comments containing 'FIXED', 'FIX', 'NEW', 'CHANGED', 'CHANGE', 'UPDATED' or 'UPDATE' are STRICTLY FORBIDDEN.\n   The '**' pattern is not allowed in regular comments (but is allowed in doc comments)."
            }
            Rule::AllowDeadCode => {
                "#[allow(dead_code)] attributes are STRICTLY FORBIDDEN in this project.\n   Either use the code or remove it completely."
            }
        }
    }
}

// Collects matching lines for one file and one rule.
struct ViolationCollector {
    rule: Rule,
    violations: Vec<String>,
    file_path: PathBuf,
}

impl ViolationCollector {
    fn new(rule: Rule, file_path: &Path) -> Self {
        Self {
            rule,
            violations: Vec::new(),
            file_path: file_path.to_path_buf(),
        }
    }

    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.rule.headline(),
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!("\n⚠️ {}\n", self.rule.advice()));

        Some(error_msg)
    }

    fn should_skip(&self, line_text: &str) -> bool {
        match self.rule {
            Rule::UnderscoreBinding => {
                let is_pure_comment = line_text.trim_start().starts_with("//");
                let is_in_string = line_text
                    .split('"')
                    .enumerate()
                    .any(|(i, part)| i % 2 == 1 && part.contains('_'));
                is_pure_comment || is_in_string
            }
            Rule::ForbiddenComment => {
                let is_doc = line_text.trim_start().starts_with("///");
                is_doc && line_text.contains("**") && !has_forbidden_word(line_text)
            }
            Rule::AllowDeadCode => false,
        }
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();

        if !self.should_skip(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }

        Ok(true)
    }
}

fn has_forbidden_word(line: &str) -> bool {
    ["FIX", "NEW", "CHANGE", "UPDATE", "CORRECTED", "MODIF"]
        .iter()
        .any(|word| line.contains(word))
}

fn rust_sources() -> impl Iterator<Item = PathBuf> {
    WalkDir::new(".")
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !SKIPPED_ROOTS.iter().any(|root| e.path().starts_with(root)))
        .filter(|e| e.file_name() != "build.rs")
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
}

fn scan(rule: Rule, pattern: &str) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(pattern)?;
    let mut searcher = Searcher::new();

    for path in rust_sources() {
        let mut collector = ViolationCollector::new(rule, &path);
        searcher.search_path(&matcher, &path, &mut collector)?;
        if let Some(error_message) = collector.check_and_get_error_message() {
            return Err(error_message.into());
        }
    }

    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    println!("cargo:rustc-env=SHOWERFIT_BUILD_TIMESTAMP={timestamp}");

    let checks = [
        (Rule::UnderscoreBinding, r"\b(_[a-zA-Z0-9_]+)\b"),
        (
            Rule::ForbiddenComment,
            r"(//|/\*|///).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFY|UPDATED|UPDATES|UPDATE)",
        ),
        (Rule::ForbiddenComment, r"(//|/\*).*\*\*"),
        (Rule::AllowDeadCode, r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]"),
    ];

    for (rule, pattern) in checks {
        if let Err(e) = scan(rule, pattern) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
