use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding this crate's own Rust sources.
const SOURCE_DIRS: &[&str] = &["select", "src", "tests", "benches"];

const FORBIDDEN_WORDS: &[&str] = &[
    "FIXED",
    "CORRECTED",
    "FIX",
    "FIXES",
    "NEW",
    "CHANGED",
    "CHANGES",
    "CHANGE",
    "MODIFIED",
    "MODIFIES",
    "MODIFY",
    "UPDATED",
    "UPDATES",
    "UPDATE",
];

#[derive(Clone, Copy)]
enum Check {
    UnderscorePrefix,
    ForbiddenWords,
    StarsInComment,
    AllCapsComment,
    AllowDeadCode,
}

impl Check {
    fn pattern(self) -> String {
        match self {
            Self::UnderscorePrefix => r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            Self::ForbiddenWords => format!(r"(//|/\*|///).*(?:{})", FORBIDDEN_WORDS.join("|")),
            Self::StarsInComment => r"(//|/\*).*\*\*".to_string(),
            Self::AllCapsComment => r"(//|/\*|///).*".to_string(),
            Self::AllowDeadCode => r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::UnderscorePrefix => "underscore-prefixed identifiers",
            Self::ForbiddenWords => "forbidden comment words",
            Self::StarsInComment => "'**' markers in regular comments",
            Self::AllCapsComment => "comments written entirely in uppercase",
            Self::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }

    fn advice(self) -> String {
        match self {
            Self::UnderscorePrefix => {
                "Either use the binding (removing the underscore) or remove it completely."
                    .to_string()
            }
            Self::ForbiddenWords => format!(
                "Comments containing {} are not allowed. Remove them completely.",
                FORBIDDEN_WORDS.join(", ")
            ),
            Self::StarsInComment => "'**' is only allowed in doc comments.".to_string(),
            Self::AllCapsComment => "Consider deleting the comment completely.".to_string(),
            Self::AllowDeadCode => {
                "Either use the code (removing the attribute) or remove it completely.".to_string()
            }
        }
    }

    // Whether a matched line really violates the check.
    fn violated_by(self, line: &str) -> bool {
        match self {
            Self::UnderscorePrefix => !is_comment(line) && !underscore_only_in_string(line),
            Self::ForbiddenWords | Self::AllowDeadCode => true,
            Self::StarsInComment => !is_doc_comment(line),
            Self::AllCapsComment => comment_text(line).is_some_and(|text| {
                let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
                letters.peek().is_some() && letters.all(char::is_uppercase)
            }),
        }
    }
}

// Collects every violating line of a single file.
struct ViolationCollector {
    check: Check,
    file_path: PathBuf,
    violations: Vec<String>,
}

impl ViolationCollector {
    fn new(check: Check, file_path: &Path) -> Self {
        Self {
            check,
            file_path: file_path.to_path_buf(),
            violations: Vec::new(),
        }
    }

    fn error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }
        let mut msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.check.describe(),
            self.file_path.display()
        );
        for violation in &self.violations {
            msg.push_str(&format!("   {violation}\n"));
        }
        msg.push_str(&format!("\n⚠️ {}\n", self.check.advice()));
        Some(msg)
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if self.check.violated_by(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

fn is_doc_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("///") || trimmed.starts_with("//!")
}

// Odd-numbered segments between double quotes are string contents.
fn underscore_only_in_string(line: &str) -> bool {
    line.contains('"')
        && line
            .split('"')
            .enumerate()
            .any(|(idx, part)| idx % 2 == 1 && part.contains('_'))
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed
        .strip_prefix("///")
        .or_else(|| trimmed.strip_prefix("//!"))
        .or_else(|| trimmed.strip_prefix("//"))
    {
        return Some(rest.trim());
    }
    let start = line.find("/*")? + 2;
    let body = &line[start..];
    Some(match body.find("*/") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    })
}

fn rust_sources() -> impl Iterator<Item = PathBuf> {
    SOURCE_DIRS.iter().flat_map(|dir| {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
            .map(|e| e.into_path())
    })
}

fn scan(check: Check) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(&check.pattern())?;
    let mut searcher = Searcher::new();
    for path in rust_sources() {
        let mut collector = ViolationCollector::new(check, &path);
        searcher.search_path(&matcher, &path, &mut collector)?;
        if let Some(msg) = collector.error_message() {
            return Err(msg.into());
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    for check in [
        Check::UnderscorePrefix,
        Check::ForbiddenWords,
        Check::StarsInComment,
        Check::AllCapsComment,
        Check::AllowDeadCode,
    ] {
        if let Err(e) = scan(check) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
