//! Include/exclude glob resolution for mappings.
//!
//! Patterns follow shell-glob conventions: `*` stays inside one path
//! component, `**` spans any number of folders, and wildcards never match a
//! leading `.` unless the pattern spells the dot out (`.config/*.ini`, `.*`).

use crate::fs::walker::{is_hidden_name, walk_directory_with_callback, FileInfo, WalkOptions};
use crate::transfer::progress::ProgressObserver;
use crate::utils::errors::EngineError;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Files keyed by absolute path, ordered for deterministic iteration
pub type FileSet = BTreeMap<PathBuf, FileInfo>;

const RECURSIVE_MARKER: &str = "**";

/// One compiled pattern plus the hidden components it names explicitly
#[derive(Debug, Clone)]
struct CompiledPattern {
    matcher: GlobMatcher,
    /// Matched against absolute paths instead of root-relative ones
    absolute: bool,
    /// Hidden folder names the pattern spells out literally
    hidden_dirs: Vec<String>,
    /// A folder component such as `.*` admits every hidden folder
    any_hidden_dir: bool,
    /// The final component starts with `.`, so dotfiles may match
    dot_files: bool,
    /// Number of components, None when the pattern recurses
    depth: Option<usize>,
}

impl CompiledPattern {
    fn compile(pattern: &str, absolute: bool) -> crate::Result<Self> {
        let pattern = normalize_separators(pattern);
        let matcher = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .case_insensitive(cfg!(windows))
            .backslash_escape(!cfg!(windows))
            .build()?
            .compile_matcher();

        let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
        let (last, dirs) = match components.split_last() {
            Some((last, dirs)) => (*last, dirs),
            None => ("", &[][..]),
        };

        let hidden: Vec<&str> = dirs.iter().copied().filter(|c| is_hidden_name(c)).collect();

        Ok(Self {
            matcher,
            absolute,
            any_hidden_dir: hidden.iter().any(|c| has_wildcard(c)),
            hidden_dirs: hidden.iter().map(|c| c.to_string()).collect(),
            dot_files: is_hidden_name(last),
            depth: if pattern.contains(RECURSIVE_MARKER) {
                None
            } else {
                Some(components.len())
            },
        })
    }

    fn references_hidden_dirs(&self) -> bool {
        self.any_hidden_dir || !self.hidden_dirs.is_empty()
    }

    /// `relative` is the root-relative path, `absolute` the full path
    fn is_match(&self, relative: &Path, absolute: &Path) -> bool {
        if !self.admits_hidden(relative) {
            return false;
        }
        if self.absolute {
            self.matcher.is_match(to_slash(absolute))
        } else {
            self.matcher.is_match(to_slash(relative))
        }
    }

    fn admits_hidden(&self, relative: &Path) -> bool {
        let names: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let Some((file_name, dirs)) = names.split_last() else {
            return false;
        };

        if is_hidden_name(file_name) && !self.dot_files {
            return false;
        }

        dirs.iter().filter(|d| is_hidden_name(d)).all(|d| {
            self.any_hidden_dir || self.hidden_dirs.iter().any(|h| h == d)
        })
    }
}

/// Resolve include patterns under `root`.
///
/// With `recurse` every pattern matches at any depth (`root/**/pattern`),
/// otherwise relative to `root` only. Missing or non-folder roots yield an
/// empty set and a warning on the status channel.
pub fn resolve(
    root: &Path,
    patterns: &[String],
    recurse: bool,
    observer: &dyn ProgressObserver,
) -> FileSet {
    let mut files = FileSet::new();

    if !check_root(root, observer) {
        return files;
    }

    let compiled = compile_all(
        patterns.iter().map(|p| rooted_pattern(p, recurse)),
        false,
        observer,
    );
    if compiled.is_empty() {
        return files;
    }

    let mut options = WalkOptions::all();
    if compiled.iter().all(|p| !p.references_hidden_dirs()) {
        options = options.prune_hidden();
    }
    if let Some(depth) = compiled
        .iter()
        .map(|p| p.depth)
        .try_fold(0usize, |acc, d| d.map(|d| acc.max(d)))
    {
        options = options.max_depth(depth);
    }

    walk_directory_with_callback(root, &options, |file| {
        if compiled
            .iter()
            .any(|p| p.is_match(&file.relative_path, &file.path))
        {
            files.insert(file.path.clone(), file);
        }
    });

    files
}

/// Remove every file matched by `exclude_patterns` from `files`.
///
/// Absolute or drive-rooted patterns are used as-is; patterns that already
/// contain `**` are rooted at `root`; bare patterns match at any depth with
/// `recurse` and at the top level without it.
pub fn exclude(
    files: &FileSet,
    root: &Path,
    exclude_patterns: &[String],
    recurse: bool,
    observer: &dyn ProgressObserver,
) -> FileSet {
    if exclude_patterns.is_empty() {
        return files.clone();
    }

    let mut compiled = Vec::new();
    for pattern in exclude_patterns {
        let (expanded, absolute) = if is_absolute_pattern(pattern) {
            (pattern.clone(), true)
        } else {
            (rooted_pattern(pattern, recurse), false)
        };
        compiled.extend(compile_all(std::iter::once(expanded), absolute, observer));
    }

    files
        .iter()
        .filter(|(path, _)| {
            let relative = path.strip_prefix(root).unwrap_or(path);
            !compiled.iter().any(|p| p.is_match(relative, path))
        })
        .map(|(path, info)| (path.clone(), info.clone()))
        .collect()
}

/// Patterns matched against root-relative paths. A pattern without a folder
/// separator matches the file name at any depth.
#[derive(Debug, Clone)]
pub struct PathFilter {
    names: GlobSet,
    paths: GlobSet,
}

impl PathFilter {
    pub fn new(patterns: &[String]) -> crate::Result<Self> {
        let mut names = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();

        for pattern in patterns.iter().map(|p| normalize_separators(p.trim())) {
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .case_insensitive(cfg!(windows))
                .backslash_escape(!cfg!(windows))
                .build()?;
            if pattern.contains('/') {
                paths.add(glob);
            } else {
                names.add(glob);
            }
        }

        Ok(Self {
            names: names.build()?,
            paths: paths.build()?,
        })
    }

    pub fn empty() -> Self {
        Self {
            names: GlobSet::empty(),
            paths: GlobSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.paths.is_empty()
    }

    pub fn is_match(&self, relative: &Path) -> bool {
        relative.file_name().is_some_and(|name| self.names.is_match(name))
            || self.paths.is_match(to_slash(relative))
    }
}

/// Absolute (`/data/*.log`) or drive-rooted (`D:\tmp\*.*`) patterns
pub fn is_absolute_pattern(pattern: &str) -> bool {
    Path::new(pattern).is_absolute() || pattern.starts_with('/') || has_drive_prefix(pattern)
}

fn has_drive_prefix(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn rooted_pattern(pattern: &str, recurse: bool) -> String {
    let pattern = normalize_separators(pattern);
    let pattern = pattern.trim_start_matches("./");
    if recurse && !pattern.contains(RECURSIVE_MARKER) {
        format!("{RECURSIVE_MARKER}/{pattern}")
    } else {
        pattern.to_string()
    }
}

fn compile_all(
    patterns: impl Iterator<Item = String>,
    absolute: bool,
    observer: &dyn ProgressObserver,
) -> Vec<CompiledPattern> {
    patterns
        .filter_map(|pattern| match CompiledPattern::compile(&pattern, absolute) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                warn!("Ignoring pattern: {}", e);
                observer.on_status(&format!("UYARI: Geçersiz filtre atlandı: {pattern} ({e})"));
                None
            }
        })
        .collect()
}

fn check_root(root: &Path, observer: &dyn ProgressObserver) -> bool {
    let problem = if !root.exists() {
        EngineError::SourceNotFound(root.to_path_buf())
    } else if !root.is_dir() {
        EngineError::SourceNotADirectory(root.to_path_buf())
    } else {
        return true;
    };

    warn!("{}", problem);
    observer.on_status(&root_warning(&problem));
    false
}

fn root_warning(problem: &EngineError) -> String {
    match problem {
        EngineError::SourceNotFound(path) => format!("UYARI: Kaynak klasör bulunamadı: {}", path.display()),
        EngineError::SourceNotADirectory(path) => {
            format!("UYARI: Kaynak yol bir klasör değil: {}", path.display())
        }
        other => format!("UYARI: {other}"),
    }
}

fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

#[cfg(windows)]
fn normalize_separators(pattern: &str) -> String {
    pattern.replace('\\', "/")
}

#[cfg(not(windows))]
fn normalize_separators(pattern: &str) -> String {
    pattern.to_string()
}

fn to_slash(path: &Path) -> String {
    let text = path.to_string_lossy();
    if cfg!(windows) {
        text.replace('\\', "/")
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::progress::{FnObserver, NoopObserver};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    fn names(files: &FileSet) -> Vec<String> {
        files
            .values()
            .map(|f| to_slash(&f.relative_path))
            .collect()
    }

    fn tree() -> std::io::Result<TempDir> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::create_dir_all(root.join("docs/old"))?;
        fs::create_dir_all(root.join(".git"))?;
        fs::create_dir_all(root.join("__pycache__"))?;
        fs::write(root.join("a.txt"), b"a")?;
        fs::write(root.join("b.log"), b"b")?;
        fs::write(root.join("README"), b"r")?;
        fs::write(root.join(".env"), b"e")?;
        fs::write(root.join("docs/c.txt"), b"c")?;
        fs::write(root.join("docs/old/d.log"), b"d")?;
        fs::write(root.join(".git/config"), b"g")?;
        fs::write(root.join("__pycache__/m.pyc"), b"p")?;
        Ok(dir)
    }

    #[test]
    fn test_resolve_recursive_default_pattern() -> std::io::Result<()> {
        let dir = tree()?;
        let files = resolve(dir.path(), &patterns(&["*.*"]), true, &NoopObserver);
        assert_eq!(
            names(&files),
            vec!["__pycache__/m.pyc", "a.txt", "b.log", "docs/c.txt", "docs/old/d.log"]
        );
        Ok(())
    }

    #[test]
    fn test_resolve_top_level_only() -> std::io::Result<()> {
        let dir = tree()?;
        let files = resolve(dir.path(), &patterns(&["*.*"]), false, &NoopObserver);
        assert_eq!(names(&files), vec!["a.txt", "b.log"]);
        Ok(())
    }

    #[test]
    fn test_resolve_unions_multiple_patterns() -> std::io::Result<()> {
        let dir = tree()?;
        let files = resolve(dir.path(), &patterns(&["*.txt", "*.log", "*.txt"]), true, &NoopObserver);
        assert_eq!(
            names(&files),
            vec!["a.txt", "b.log", "docs/c.txt", "docs/old/d.log"]
        );
        Ok(())
    }

    #[test]
    fn test_resolve_star_matches_names_without_dot() -> std::io::Result<()> {
        let dir = tree()?;
        let files = resolve(dir.path(), &patterns(&["*"]), false, &NoopObserver);
        assert_eq!(names(&files), vec!["README", "a.txt", "b.log"]);
        Ok(())
    }

    #[test]
    fn test_resolve_explicit_hidden_folder() -> std::io::Result<()> {
        let dir = tree()?;
        let files = resolve(dir.path(), &patterns(&[".git/*"]), false, &NoopObserver);
        assert_eq!(names(&files), vec![".git/config"]);

        let dotfiles = resolve(dir.path(), &patterns(&[".*"]), false, &NoopObserver);
        assert_eq!(names(&dotfiles), vec![".env"]);
        Ok(())
    }

    #[test]
    fn test_resolve_missing_root_warns() {
        let dir = TempDir::new().unwrap();
        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});

        let files = resolve(&dir.path().join("missing"), &patterns(&["*.*"]), true, &observer);

        assert!(files.is_empty());
        assert_eq!(messages.borrow().len(), 1);
        assert!(messages.borrow()[0].contains("bulunamadı"));
    }

    #[test]
    fn test_resolve_file_root_warns() -> std::io::Result<()> {
        let dir = tree()?;
        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});

        let files = resolve(&dir.path().join("a.txt"), &patterns(&["*.*"]), true, &observer);

        assert!(files.is_empty());
        assert!(messages.borrow()[0].contains("klasör değil"));
        Ok(())
    }

    #[test]
    fn test_exclude_bare_pattern_recursive_matches_any_depth() -> std::io::Result<()> {
        let dir = tree()?;
        let all = resolve(dir.path(), &patterns(&["*.*"]), true, &NoopObserver);
        let kept = exclude(&all, dir.path(), &patterns(&["*.log"]), true, &NoopObserver);
        assert_eq!(names(&kept), vec!["__pycache__/m.pyc", "a.txt", "docs/c.txt"]);
        Ok(())
    }

    #[test]
    fn test_exclude_bare_pattern_non_recursive_is_top_level() -> std::io::Result<()> {
        let dir = tree()?;
        let all = resolve(dir.path(), &patterns(&["*.*"]), true, &NoopObserver);
        let kept = exclude(&all, dir.path(), &patterns(&["*.log"]), false, &NoopObserver);
        assert_eq!(
            names(&kept),
            vec!["__pycache__/m.pyc", "a.txt", "docs/c.txt", "docs/old/d.log"]
        );
        Ok(())
    }

    #[test]
    fn test_exclude_folder_pattern_at_any_depth() -> std::io::Result<()> {
        let dir = tree()?;
        let all = resolve(dir.path(), &patterns(&["*.*"]), true, &NoopObserver);
        let kept = exclude(&all, dir.path(), &patterns(&["__pycache__/*.*", "old/*.*"]), true, &NoopObserver);
        assert_eq!(names(&kept), vec!["a.txt", "b.log", "docs/c.txt"]);
        Ok(())
    }

    #[test]
    fn test_exclude_explicit_recursive_pattern() -> std::io::Result<()> {
        let dir = tree()?;
        let all = resolve(dir.path(), &patterns(&["*.*"]), true, &NoopObserver);
        let kept = exclude(&all, dir.path(), &patterns(&["docs/**/*.log"]), false, &NoopObserver);
        assert_eq!(
            names(&kept),
            vec!["__pycache__/m.pyc", "a.txt", "b.log", "docs/c.txt"]
        );
        Ok(())
    }

    #[test]
    fn test_exclude_absolute_pattern() -> std::io::Result<()> {
        let dir = tree()?;
        let all = resolve(dir.path(), &patterns(&["*.*"]), true, &NoopObserver);
        let absolute = format!("{}/docs/*.*", to_slash(dir.path()));
        let kept = exclude(&all, dir.path(), &[absolute], true, &NoopObserver);
        assert_eq!(
            names(&kept),
            vec!["__pycache__/m.pyc", "a.txt", "b.log", "docs/old/d.log"]
        );
        Ok(())
    }

    #[test]
    fn test_invalid_pattern_is_skipped_with_warning() -> std::io::Result<()> {
        let dir = tree()?;
        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});

        let files = resolve(dir.path(), &patterns(&["[", "*.txt"]), false, &observer);

        assert_eq!(names(&files), vec!["a.txt"]);
        assert_eq!(messages.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn test_path_filter() -> crate::Result<()> {
        let filter = PathFilter::new(&patterns(&["*.tmp", "docs/*.txt", " "]))?;

        assert!(filter.is_match(Path::new("a.tmp")));
        assert!(filter.is_match(Path::new("deep/down/b.tmp")));
        assert!(filter.is_match(Path::new("docs/c.txt")));
        assert!(!filter.is_match(Path::new("docs/old/c.txt")));
        assert!(!filter.is_match(Path::new("c.txt")));

        assert!(PathFilter::new(&patterns(&[""]))?.is_empty());
        assert!(PathFilter::empty().is_empty());
        assert!(matches!(
            PathFilter::new(&patterns(&["["])),
            Err(EngineError::InvalidPattern { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_absolute_pattern_detection() {
        assert!(is_absolute_pattern("/var/log/*.log"));
        assert!(is_absolute_pattern("D:\\temp\\*.*"));
        assert!(!is_absolute_pattern("temp/*.*"));
        assert!(!is_absolute_pattern("**/*.log"));
        assert!(!is_absolute_pattern("*:*"));
        assert!(!is_absolute_pattern("logs/12:00/*.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exclude_pattern_with_colon() -> std::io::Result<()> {
        let dir = tree()?;
        fs::write(dir.path().join("10:30.txt"), b"t")?;

        let all = resolve(dir.path(), &patterns(&["*.txt"]), false, &NoopObserver);
        assert_eq!(names(&all), vec!["10:30.txt", "a.txt"]);

        let kept = exclude(&all, dir.path(), &patterns(&["*:*"]), false, &NoopObserver);
        assert_eq!(names(&kept), vec!["a.txt"]);
        Ok(())
    }
}
