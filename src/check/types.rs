//! Common types for check cycles

use std::path::{Path, PathBuf};

use crate::config::DEFAULT_SOURCE_EXTENSIONS;

/// Ordered list of files to check for one trigger
///
/// The trigger file always comes first; the remaining files are unique and
/// sorted by their OS-string bytes so diagnostics are issued in the same
/// order on every run. An empty list means there is nothing to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckList {
    files: Vec<PathBuf>,
}

impl CheckList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a list from the trigger and any related files
    ///
    /// Duplicates, including repeats of the trigger, are dropped.
    pub fn new(trigger: PathBuf, related: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut rest: Vec<PathBuf> = related
            .into_iter()
            .filter(|path| *path != trigger)
            .collect();
        rest.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        rest.dedup();

        let mut files = Vec::with_capacity(rest.len() + 1);
        files.push(trigger);
        files.extend(rest);
        Self { files }
    }

    pub fn trigger(&self) -> Option<&Path> {
        self.files.first().map(PathBuf::as_path)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.files.iter()
    }
}

impl<'a> IntoIterator for &'a CheckList {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Decides which files the analysis service can diagnose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    extensions: Vec<String>,
}

impl SourceFilter {
    pub fn new(extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| {
                    let ext: String = ext.into();
                    ext.trim_start_matches('.').to_ascii_lowercase()
                })
                .collect(),
        }
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_EXTENSIONS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn paths(list: &CheckList) -> Vec<&str> {
        list.iter().map(|p| p.to_str().unwrap()).collect()
    }

    #[test]
    fn check_list_puts_trigger_first_and_sorts_the_rest() {
        let list = CheckList::new(
            PathBuf::from("/p/z.ts"),
            ["/p/c.ts", "/p/a.ts", "/p/b.ts"].map(PathBuf::from),
        );

        assert_eq!(paths(&list), vec!["/p/z.ts", "/p/a.ts", "/p/b.ts", "/p/c.ts"]);
        assert_eq!(list.trigger(), Some(Path::new("/p/z.ts")));
    }

    #[test]
    fn check_list_removes_duplicates_and_trigger_repeats() {
        let list = CheckList::new(
            PathBuf::from("/p/a.ts"),
            ["/p/b.ts", "/p/a.ts", "/p/b.ts"].map(PathBuf::from),
        );

        assert_eq!(paths(&list), vec!["/p/a.ts", "/p/b.ts"]);
    }

    #[test]
    fn check_list_orders_by_string_not_by_component() {
        // '-' sorts before '/', component-wise ordering would flip these
        let list = CheckList::new(
            PathBuf::from("/p/main.ts"),
            ["/p/a/b.ts", "/p/a-b.ts"].map(PathBuf::from),
        );

        assert_eq!(paths(&list), vec!["/p/main.ts", "/p/a-b.ts", "/p/a/b.ts"]);
    }

    #[test]
    fn empty_check_list_has_no_trigger() {
        let list = CheckList::empty();

        assert!(list.is_empty());
        assert_eq!(list.trigger(), None);
    }

    #[rstest]
    #[case("/p/a.ts", true)]
    #[case("/p/a.tsx", true)]
    #[case("/p/a.d.ts", true)]
    #[case("/p/a.mts", true)]
    #[case("/p/a.cts", true)]
    #[case("/p/A.TS", true)]
    #[case("/p/a.js", false)]
    #[case("/p/package.json", false)]
    #[case("/p/Makefile", false)]
    fn default_source_filter_accepts_typescript_files(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(SourceFilter::default().is_source_file(Path::new(path)), expected);
    }

    #[test]
    fn source_filter_accepts_configured_extensions_with_leading_dot() {
        let filter = SourceFilter::new([".js", "jsx"]);

        assert!(filter.is_source_file(Path::new("/p/a.js")));
        assert!(filter.is_source_file(Path::new("/p/a.jsx")));
        assert!(!filter.is_source_file(Path::new("/p/a.ts")));
    }
}
