//! String path helpers. Paths are opaque `/`-separated strings and are never
//! normalised beyond what each helper documents.

pub const SEPARATOR: char = '/';

/// Address `name` inside `dir` by plain concatenation.
pub fn join(dir: &str, name: &str) -> String {
    format!("{dir}{SEPARATOR}{name}")
}

/// Everything before the last separator, or `None` for a single component.
pub fn parent(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|index| &path[..index])
}

/// Everything after the last separator.
pub fn file_name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Every prefix of `path` from the top down: `a/b/c` yields `a`, `a/b`, `a/b/c`.
///
/// A leading separator is kept on each prefix and empty components are skipped.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut results = Vec::new();
    let mut prefix = String::new();
    if path.starts_with(SEPARATOR) {
        prefix.push(SEPARATOR);
    }

    for component in path.split(SEPARATOR).filter(|c| !c.is_empty()) {
        if !prefix.is_empty() && !prefix.ends_with(SEPARATOR) {
            prefix.push(SEPARATOR);
        }
        prefix.push_str(component);
        results.push(prefix.clone());
    }

    results
}
