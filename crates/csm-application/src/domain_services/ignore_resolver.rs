//! Project-type detection and ignore-pattern resolution.
//!
//! Maintains a marker-file table, default pattern lists per project type,
//! and a simplified glob matcher that silently drops negation patterns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use csm_domain::ports::IgnorePredicate;

/// Filename (or glob) -> detected project type, in priority order.
const PROJECT_INDICATORS: &[(&str, &str)] = &[
    ("package.json", "nodejs"),
    ("pyproject.toml", "python"),
    ("poetry.lock", "python"),
    ("requirements.txt", "python"),
    ("setup.py", "python"),
    ("Pipfile", "python"),
    ("Cargo.toml", "rust"),
    ("go.mod", "go"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("build.gradle.kts", "java"),
    ("Package.swift", "swift"),
    ("project.json", "dotnet"),
    ("composer.json", "php"),
    ("Gemfile", "ruby"),
    ("Makefile", "c"),
    ("configure.ac", "c"),
    ("CMakeLists.txt", "cpp"),
];

/// Glob-style indicators (contain `*`), checked after the exact matches.
const PROJECT_INDICATOR_GLOBS: &[(&str, &str)] = &[
    ("*.csproj", "dotnet"),
    ("*.fsproj", "dotnet"),
    ("*.vbproj", "dotnet"),
];

/// Detects a project's type from marker files in its root, falling back to
/// `"unknown"` when nothing matches.
pub fn detect_project_type(project_path: &Path) -> String {
    if !project_path.is_dir() {
        return "unknown".to_string();
    }
    for (indicator, kind) in PROJECT_INDICATORS {
        if project_path.join(indicator).exists() {
            return (*kind).to_string();
        }
    }
    if let Ok(entries) = std::fs::read_dir(project_path) {
        let names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        for (glob, kind) in PROJECT_INDICATOR_GLOBS {
            let ext = glob.trim_start_matches('*');
            if names.iter().any(|n| n.ends_with(ext)) {
                return (*kind).to_string();
            }
        }
    }
    "unknown".to_string()
}

/// Default ignore patterns per detected project type.
fn default_ignores(project_type: &str) -> &'static [&'static str] {
    match project_type {
        "nodejs" => &[
            "node_modules/",
            "npm-debug.log*",
            "yarn-debug.log*",
            "yarn-error.log*",
            ".npm",
            "coverage/",
            "dist/",
            "build/",
            ".next/",
            ".nuxt/",
            ".vuepress/dist",
            ".cache/",
            ".parcel-cache/",
            ".nyc_output",
        ],
        "python" => &[
            "__pycache__/",
            "*.py[cod]",
            "*$py.class",
            "*.so",
            ".Python",
            "build/",
            "develop-eggs/",
            "dist/",
            "downloads/",
            "eggs/",
            ".eggs/",
            "lib/",
            "lib64/",
            "parts/",
            "sdist/",
            "var/",
            "wheels/",
            "pip-wheel-metadata/",
            "share/python-wheels/",
            "*.egg-info/",
            ".installed.cfg",
            "*.egg",
            "MANIFEST",
            ".env",
            ".venv/",
            "venv/",
            "env/",
            "ENV/",
            ".tox/",
            ".nox/",
            ".coverage",
            ".coverage.*",
            ".cache",
            "nosetests.xml",
            "coverage.xml",
            "*.cover",
            ".hypothesis/",
            ".pytest_cache/",
            "cover/",
            "htmlcov/",
            ".mypy_cache/",
        ],
        "java" => &[
            "target/",
            "*.class",
            "*.jar",
            "*.war",
            "*.ear",
            "hs_err_pid*",
            ".gradle/",
            "gradle-app.setting",
            ".idea/",
            "*.iws",
            "*.iml",
            "*.ipr",
            ".classpath",
            ".project",
            ".settings/",
            "bin/",
        ],
        "dotnet" => &[
            "bin/", "obj/", "*.user", "*.suo", "*.cache", "packages/", ".vs/", "*.tmp",
            "TestResults/", "*.log",
        ],
        "go" => &["vendor/", "*.test", "*.out"],
        "rust" => &["target/", "Cargo.lock", "**/*.rs.bk"],
        "cpp" => &[
            "build/",
            "cmake-build-*/",
            "*.o",
            "*.obj",
            "*.exe",
            "*.dll",
            "*.so",
            "*.dylib",
            "*.a",
            "*.lib",
            "*.pdb",
            "*.ilk",
            "*.exp",
            "*.exe.manifest",
        ],
        "php" => &["vendor/", "composer.lock", "*.log"],
        "ruby" => &[".bundle/", ".sass-cache/", ".gem", "Gemfile.lock", "vendor/"],
        "swift" => &[
            ".build/",
            "*.xcodeproj/xcuserdata/",
            "*.xcodeproj/project.xcworkspace/xcuserdata/",
            "*.xcworkspace/xcuserdata/",
            "DerivedData/",
        ],
        _ => &[
            ".git/",
            ".svn/",
            ".hg/",
            ".DS_Store",
            "Thumbs.db",
            "*.log",
            "*.tmp",
            "*.temp",
            ".env*",
            "coverage/",
            "dist/",
            "build/",
            ".cache/",
            "node_modules/",
            "__pycache__/",
            "*.pyc",
            "target/",
            "bin/",
            "obj/",
            ".vs/",
            ".idea/",
        ],
    }
}

/// Parses a `.gitignore`-style file into a flat pattern list.
///
/// Comments (`#`) and blank lines are skipped; negation lines (`!...`) are
/// kept in the list but [`matches_pattern`] always returns `false` for them,
/// a known limitation of substring-only glob matching.
fn parse_ignore_file(path: &Path) -> Vec<String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Translates a restricted glob (`*`, `?`, `[...]`) into an anchored regex
/// string, case-insensitively. Hand-rolled rather than pulling in a glob
/// crate, mirroring the reference's direct use of `fnmatch.translate`.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("(?i)^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if matches!(chars.peek(), Some('!')) {
                    chars.next();
                    out.push('^');
                }
                for c2 in chars.by_ref() {
                    out.push(c2);
                    if c2 == ']' {
                        break;
                    }
                }
            }
            _ if "\\.+()|^$".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    out
}

/// `true` if `pattern` matches `rel_path` (forward-slash separated, relative
/// to the project root), given whether `rel_path` names a directory.
fn matches_pattern(rel_path: &str, pattern: &str, is_dir: bool) -> bool {
    if pattern.starts_with('!') {
        return false;
    }

    let is_directory_pattern = pattern.ends_with('/');
    let mut pattern = pattern;
    let mut trimmed;
    if is_directory_pattern {
        trimmed = pattern.to_string();
        trimmed.pop();
        pattern = &trimmed;
    }

    let rooted = pattern.starts_with('/');
    let pattern = if rooted { &pattern[1..] } else { pattern };
    if rooted && rel_path.contains('/') {
        return false;
    }

    let regex_src = glob_to_regex(pattern);
    let Ok(re) = regex_lite_match(&regex_src, rel_path) else {
        return false;
    };
    if re {
        return !(is_directory_pattern && !is_dir);
    }

    if is_directory_pattern {
        let prefix = format!("{pattern}/");
        if rel_path.len() > prefix.len() && rel_path[..prefix.len()].eq_ignore_ascii_case(&prefix)
        {
            return true;
        }
    }

    false
}

/// Minimal anchored-regex matcher supporting exactly what [`glob_to_regex`]
/// emits (literals, `.`, `.*`, bracket classes, case-insensitive). Avoids
/// pulling a full regex engine in for a pattern language this small.
fn regex_lite_match(pattern: &str, text: &str) -> Result<bool, ()> {
    let pattern = pattern
        .strip_prefix("(?i)^")
        .and_then(|p| p.strip_suffix('$'))
        .ok_or(())?;
    Ok(match_insensitive(pattern.as_bytes(), text.to_lowercase().as_bytes()))
}

fn match_insensitive(pat: &[u8], text: &[u8]) -> bool {
    fn helper(pat: &[u8], text: &[u8]) -> bool {
        match pat.first() {
            None => text.is_empty(),
            Some(b'.') if pat.get(1) == Some(&b'*') => {
                for i in 0..=text.len() {
                    if helper(&pat[2..], &text[i..]) {
                        return true;
                    }
                }
                false
            }
            Some(b'.') => !text.is_empty() && helper(&pat[1..], &text[1..]),
            Some(b'[') => {
                let close = match pat.iter().position(|&b| b == b']') {
                    Some(i) => i,
                    None => return false,
                };
                if text.is_empty() {
                    return false;
                }
                let class = &pat[1..close];
                let negate = class.first() == Some(&b'^');
                let class = if negate { &class[1..] } else { class };
                let c = text[0].to_ascii_lowercase();
                let in_class = class.contains(&c);
                if in_class != negate {
                    helper(&pat[close + 1..], &text[1..])
                } else {
                    false
                }
            }
            Some(&pc) => {
                let pc = pc.to_ascii_lowercase();
                !text.is_empty() && text[0].to_ascii_lowercase() == pc && helper(&pat[1..], &text[1..])
            }
        }
    }
    helper(pat, text)
}

fn is_inside_dotgit(rel_path: &Path) -> bool {
    rel_path.components().any(|c| c.as_os_str() == ".git")
}

/// Builds the ignore predicate for `project_path`, following the
/// resolution order: a top-level `.gitignore` if present, else the default
/// set for the detected project type (falling back to `"unknown"`).
/// `.git/` is always ignored regardless of the chosen pattern list.
pub fn build_ignore_predicate(project_path: &Path) -> IgnorePredicate {
    let gitignore = project_path.join(".gitignore");
    let patterns: Vec<String> = if gitignore.exists() {
        parse_ignore_file(&gitignore)
    } else {
        let project_type = detect_project_type(project_path);
        default_ignores(&project_type)
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    };

    Arc::new(move |rel_path: &Path, is_dir: bool| {
        if is_inside_dotgit(rel_path) {
            return true;
        }
        let rel_str = normalize_to_forward_slashes(rel_path);
        patterns
            .iter()
            .any(|p| matches_pattern(&rel_str, p, is_dir))
    })
}

fn normalize_to_forward_slashes(path: &Path) -> String {
    let mut parts = Vec::new();
    for c in path.components() {
        if let std::path::Component::Normal(s) = c {
            parts.push(s.to_string_lossy().into_owned());
        }
    }
    parts.join("/")
}

/// Resolves the effective base directory patterns would be read against;
/// kept as a free function so the fingerprinter and genesis's
/// managed-copy step share exactly one resolution path.
pub fn ignore_file_path(project_path: &Path) -> PathBuf {
    project_path.join(".gitignore")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_rust_project() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        assert_eq!(detect_project_type(dir.path()), "rust");
    }

    #[test]
    fn unknown_without_markers() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_project_type(dir.path()), "unknown");
    }

    #[test]
    fn dotgit_always_ignored() {
        let dir = tempdir().unwrap();
        let predicate = build_ignore_predicate(dir.path());
        assert!(predicate(Path::new(".git/HEAD"), false));
    }

    #[test]
    fn directory_pattern_matches_descendants() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        let predicate = build_ignore_predicate(dir.path());
        assert!(predicate(Path::new("target/debug/foo"), false));
        assert!(predicate(Path::new("target"), true));
    }

    #[test]
    fn negation_pattern_is_ignored_not_honored() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.log\n!important.log\n").unwrap();
        let predicate = build_ignore_predicate(dir.path());
        // Despite the negation, the simplified matcher still ignores it (documented limitation).
        assert!(predicate(Path::new("important.log"), false));
    }

    #[test]
    fn gitignore_takes_priority_over_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        std::fs::write(dir.path().join(".gitignore"), "scratch/\n").unwrap();
        let predicate = build_ignore_predicate(dir.path());
        assert!(predicate(Path::new("scratch/notes.txt"), false));
        // rust default (target/) would not apply once .gitignore exists and doesn't list it.
        assert!(!predicate(Path::new("target/debug/foo"), false));
    }
}
