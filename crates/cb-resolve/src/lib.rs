// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Resolves caller-supplied paths (literal files, directories, or globs)
//! into a [`ResolvedInputSet`] of classified, deduplicated files.

mod detect;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use cb_error::InputResolverError;
use globset::Glob;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

pub use detect::detect_file;

const EXCLUDED_FILE_NAMES: &[&str] = &[".DS_Store", ".localized", "desktop.ini", "Thumbs.db"];
const EXCLUDED_FILE_PREFIXES: &[&str] = &["._", "~$"];
const EXCLUDED_FILE_SUFFIXES: &[&str] = &[".tmp", ".temp"];
const EXCLUDED_DIR_NAMES: &[&str] = &[".git", "__MACOSX", "node_modules", ".svn", ".hg"];

/// Whether a [`ResolvedInputSet`] represents one logical input or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one resolved file with a scalar content structure.
    Single,
    /// Everything else: multiple files, or one file that is itself a
    /// list.
    Sequence,
}

/// The shape a resolved file's contents take, as determined by
/// [`detect_file`]'s structural probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStructure {
    /// A single non-list value (text, a number, opaque binary, ...).
    ScalarOpaque,
    /// A single structured record (a JSON/YAML/TOML object).
    ScalarRecord,
    /// A list of non-record values.
    ListOpaque,
    /// A list of records (array of objects, CSV rows, ...).
    ListRecord,
}

/// A single file resolved from the caller's inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFile {
    /// Canonical absolute path.
    pub path: PathBuf,
    /// The media URN [`detect_file`] classified this file as.
    pub media_urn: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// The content structure [`detect_file`] classified this file as.
    pub content_structure: ContentStructure,
}

/// The result of resolving a caller's input paths: the classified files,
/// their overall cardinality, and their common media URN, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInputSet {
    /// Resolved files, first-seen order.
    pub files: Vec<ResolvedFile>,
    /// Whether this set should be treated as one input or a sequence.
    pub cardinality: Cardinality,
    /// The media URN every file shares, or `None` if they differ.
    pub common_media: Option<String>,
}

impl ResolvedInputSet {
    /// `true` iff every resolved file shares the same media URN.
    #[must_use]
    pub fn is_homogeneous(&self) -> bool {
        self.common_media.is_some()
    }
}

/// Tunable knobs for [`resolve_paths`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Maximum bytes read from each file for structural text probes.
    pub sniff_bytes: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { sniff_bytes: 65536 }
    }
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn is_excluded_file(name: &str) -> bool {
    EXCLUDED_FILE_NAMES.contains(&name)
        || EXCLUDED_FILE_PREFIXES.iter().any(|p| name.starts_with(p))
        || EXCLUDED_FILE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIR_NAMES.contains(&name)
}

fn glob_base_dir(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let segment = component.as_os_str().to_string_lossy();
        if has_glob_chars(&segment) {
            break;
        }
        base.push(component.as_os_str());
    }
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, InputResolverError> {
    let matcher = Glob::new(pattern)
        .map_err(|e| InputResolverError::IoError {
            path: pattern.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();
    let base = glob_base_dir(pattern);
    let mut matches: Vec<PathBuf> = WalkDir::new(&base)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && matcher.is_match(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();
    matches.sort();
    Ok(matches)
}

fn walk_directory(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_excluded_dir(&entry.file_name().to_string_lossy())
        })
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file() && !is_excluded_file(&entry.file_name().to_string_lossy())
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

fn is_scalar(structure: ContentStructure) -> bool {
    matches!(
        structure,
        ContentStructure::ScalarOpaque | ContentStructure::ScalarRecord
    )
}

/// Resolve `inputs` (literal paths, directories, or glob patterns) into a
/// deduplicated, classified [`ResolvedInputSet`].
///
/// # Errors
///
/// Returns [`InputResolverError::EmptyInput`] if `inputs` is empty,
/// [`InputResolverError::NotFound`] if a literal path does not exist,
/// [`InputResolverError::NoFilesResolved`] if nothing survives exclusion
/// filtering, or [`InputResolverError::IoError`] on other I/O failures.
pub fn resolve_paths(
    inputs: &[String],
    options: ResolveOptions,
) -> Result<ResolvedInputSet, InputResolverError> {
    if inputs.is_empty() {
        return Err(InputResolverError::EmptyInput);
    }
    debug!(inputs = inputs.len(), sniff_bytes = options.sniff_bytes, "resolving inputs");

    let mut candidates: Vec<PathBuf> = Vec::new();
    for input in inputs {
        if has_glob_chars(input) {
            candidates.extend(expand_glob(input)?);
            continue;
        }
        let path = Path::new(input);
        let metadata = fs::metadata(path).map_err(|_| InputResolverError::NotFound {
            path: input.clone(),
        })?;
        if metadata.is_dir() {
            candidates.extend(walk_directory(path));
        } else {
            candidates.push(path.to_path_buf());
        }
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for path in candidates {
        let canonical = fs::canonicalize(&path).map_err(|e| InputResolverError::IoError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if !seen.insert(canonical.clone()) {
            continue;
        }
        let size_bytes = fs::metadata(&canonical)
            .map(|m| m.len())
            .map_err(|e| InputResolverError::IoError {
                path: canonical.display().to_string(),
                reason: e.to_string(),
            })?;
        let (media_urn, content_structure) = detect_file(&canonical, options.sniff_bytes);
        files.push(ResolvedFile {
            path: canonical,
            media_urn,
            size_bytes,
            content_structure,
        });
    }

    if files.is_empty() {
        return Err(InputResolverError::NoFilesResolved);
    }

    let cardinality = if files.len() == 1 && is_scalar(files[0].content_structure) {
        Cardinality::Single
    } else {
        Cardinality::Sequence
    };

    let common_media = files
        .first()
        .map(|f| f.media_urn.clone())
        .filter(|first| files.iter().all(|f| &f.media_urn == first));

    debug!(
        files = files.len(),
        cardinality = ?cardinality,
        homogeneous = common_media.is_some(),
        "resolved input set"
    );

    Ok(ResolvedInputSet {
        files,
        cardinality,
        common_media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            resolve_paths(&[], ResolveOptions::default()),
            Err(InputResolverError::EmptyInput)
        );
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = resolve_paths(
            &["/nonexistent/path/xyz".to_string()],
            ResolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InputResolverError::NotFound { .. }));
    }

    #[test]
    fn single_scalar_file_has_single_cardinality() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        File::create(&path).unwrap().write_all(b"hello").unwrap();

        let set = resolve_paths(
            &[path.to_string_lossy().to_string()],
            ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(set.cardinality, Cardinality::Single);
        assert_eq!(set.files.len(), 1);
        assert!(set.is_homogeneous());
    }

    #[test]
    fn s5_directory_heterogeneous() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.pdf"))
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();
        File::create(dir.path().join("b.png"))
            .unwrap()
            .write_all(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
            .unwrap();

        let set = resolve_paths(
            &[dir.path().to_string_lossy().to_string()],
            ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(set.cardinality, Cardinality::Sequence);
        assert_eq!(set.common_media, None);
        assert!(!set.is_homogeneous());
    }

    #[test]
    fn excludes_ds_store_and_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join(".DS_Store")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        File::create(dir.path().join(".git").join("config")).unwrap();
        File::create(dir.path().join("keep.txt"))
            .unwrap()
            .write_all(b"hi")
            .unwrap();

        let set = resolve_paths(
            &[dir.path().to_string_lossy().to_string()],
            ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(set.files.len(), 1);
        assert!(set.files[0].path.ends_with("keep.txt"));
    }

    #[test]
    fn law6_resolving_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            File::create(dir.path().join(name))
                .unwrap()
                .write_all(b"x")
                .unwrap();
        }
        let input = vec![dir.path().to_string_lossy().to_string()];
        let first = resolve_paths(&input, ResolveOptions::default()).unwrap();
        let second = resolve_paths(&input, ResolveOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dedups_overlapping_inputs_by_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        File::create(&path).unwrap().write_all(b"x").unwrap();

        let inputs = vec![
            path.to_string_lossy().to_string(),
            dir.path().to_string_lossy().to_string(),
        ];
        let set = resolve_paths(&inputs, ResolveOptions::default()).unwrap();
        assert_eq!(set.files.len(), 1);
    }
}
