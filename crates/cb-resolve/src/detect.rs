// SPDX-License-Identifier: MIT OR Apache-2.0
//! `detectFile`: extension dispatch, structural text probes, and a magic-
//! byte fallback for files the extension table doesn't cover.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::ContentStructure;

const CODE_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "ts", "jsx", "tsx", "go", "java", "c", "cpp", "h", "hpp", "rb", "php", "sh",
    "cs", "kt", "swift",
];
const TEXT_EXTENSIONS: &[&str] = &["md", "txt"];
const BINARY_EXTENSIONS: &[(&str, &str)] = &[
    ("pdf", "pdf"),
    ("png", "png"),
    ("jpg", "jpeg"),
    ("jpeg", "jpeg"),
    ("gif", "gif"),
    ("bmp", "bmp"),
    ("webp", "webp"),
    ("mp3", "mp3"),
    ("wav", "wav"),
    ("mp4", "mp4"),
    ("mov", "mov"),
    ("zip", "zip"),
    ("gz", "gzip"),
    ("tar", "tar"),
];

fn read_prefix(path: &Path, limit: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Ok(file) = File::open(path) {
        let _ = file.take(limit as u64).read_to_end(&mut buf);
    }
    buf
}

/// Classify `path` into a media URN and content structure, reading at
/// most `sniff_bytes` for structural text probes.
#[must_use]
pub fn detect_file(path: &Path, sniff_bytes: usize) -> (String, ContentStructure) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some("json") => detect_json(path, sniff_bytes),
        Some("ndjson" | "jsonl") => detect_ndjson(path, sniff_bytes),
        Some("csv") => detect_delimited(path, b',', sniff_bytes, "csv"),
        Some("tsv") => detect_delimited(path, b'\t', sniff_bytes, "tsv"),
        Some("yaml" | "yml") => detect_yaml(path, sniff_bytes),
        Some("toml") => (
            "media:toml;record;textable".to_string(),
            ContentStructure::ScalarRecord,
        ),
        Some("log") => (
            "media:log;list;textable".to_string(),
            ContentStructure::ListOpaque,
        ),
        Some(ext) => detect_by_extension(ext, path),
        None => detect_by_magic(path),
    }
}

fn detect_json(path: &Path, sniff_bytes: usize) -> (String, ContentStructure) {
    let bytes = read_prefix(path, sniff_bytes);
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(_)) => (
            "media:json;record;textable".to_string(),
            ContentStructure::ScalarRecord,
        ),
        Ok(Value::Array(items)) => {
            if !items.is_empty() && items.iter().all(Value::is_object) {
                (
                    "media:json;list;record;textable".to_string(),
                    ContentStructure::ListRecord,
                )
            } else {
                (
                    "media:json;list;textable".to_string(),
                    ContentStructure::ListOpaque,
                )
            }
        }
        _ => (
            "media:json;textable".to_string(),
            ContentStructure::ScalarOpaque,
        ),
    }
}

fn detect_ndjson(path: &Path, sniff_bytes: usize) -> (String, ContentStructure) {
    let bytes = read_prefix(path, sniff_bytes);
    let text = String::from_utf8_lossy(&bytes);
    let mut saw_line = false;
    let all_objects = text.lines().filter(|l| !l.trim().is_empty()).all(|line| {
        saw_line = true;
        matches!(
            serde_json::from_str::<Value>(line),
            Ok(Value::Object(_))
        )
    });
    if saw_line && all_objects {
        (
            "media:ndjson;list;record;textable".to_string(),
            ContentStructure::ListRecord,
        )
    } else {
        (
            "media:ndjson;list;textable".to_string(),
            ContentStructure::ListOpaque,
        )
    }
}

fn detect_delimited(
    path: &Path,
    delimiter: u8,
    sniff_bytes: usize,
    media_name: &str,
) -> (String, ContentStructure) {
    let bytes = read_prefix(path, sniff_bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let cols = reader.headers().map(|h| h.len()).unwrap_or(0);
    if cols > 1 {
        (
            format!("media:{media_name};list;record;textable"),
            ContentStructure::ListRecord,
        )
    } else {
        (
            format!("media:{media_name};list;textable"),
            ContentStructure::ListOpaque,
        )
    }
}

fn detect_yaml(path: &Path, sniff_bytes: usize) -> (String, ContentStructure) {
    let bytes = read_prefix(path, sniff_bytes);
    match serde_yaml::from_slice::<serde_yaml::Value>(&bytes) {
        Ok(serde_yaml::Value::Mapping(_)) => (
            "media:yaml;record;textable".to_string(),
            ContentStructure::ScalarRecord,
        ),
        Ok(serde_yaml::Value::Sequence(items)) => {
            if !items.is_empty() && items.iter().all(serde_yaml::Value::is_mapping) {
                (
                    "media:yaml;list;record;textable".to_string(),
                    ContentStructure::ListRecord,
                )
            } else {
                (
                    "media:yaml;list;textable".to_string(),
                    ContentStructure::ListOpaque,
                )
            }
        }
        _ => (
            "media:yaml;textable".to_string(),
            ContentStructure::ScalarOpaque,
        ),
    }
}

fn detect_by_extension(ext: &str, path: &Path) -> (String, ContentStructure) {
    if CODE_EXTENSIONS.contains(&ext) {
        return (
            format!("media:{ext};textable;code"),
            ContentStructure::ScalarOpaque,
        );
    }
    if TEXT_EXTENSIONS.contains(&ext) {
        return (format!("media:{ext};textable"), ContentStructure::ScalarOpaque);
    }
    if let Some((_, media)) = BINARY_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
        return (format!("media:{media}"), ContentStructure::ScalarOpaque);
    }
    detect_by_magic(path)
}

fn detect_by_magic(path: &Path) -> (String, ContentStructure) {
    match infer::get_from_path(path).ok().flatten() {
        Some(kind) => (format!("media:{}", kind.extension()), ContentStructure::ScalarOpaque),
        None => ("media:".to_string(), ContentStructure::ScalarOpaque),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::TempPath {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file.into_temp_path()
    }

    #[test]
    fn s4_json_list_of_objects() {
        let path = write_temp(".json", br#"[{"a":1}]"#);
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:json;list;record;textable");
        assert_eq!(structure, ContentStructure::ListRecord);
    }

    #[test]
    fn json_object_is_scalar_record() {
        let path = write_temp(".json", br#"{"a":1}"#);
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:json;record;textable");
        assert_eq!(structure, ContentStructure::ScalarRecord);
    }

    #[test]
    fn json_primitive_is_scalar_opaque() {
        let path = write_temp(".json", b"42");
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:json;textable");
        assert_eq!(structure, ContentStructure::ScalarOpaque);
    }

    #[test]
    fn csv_multi_column_is_list_record() {
        let path = write_temp(".csv", b"a,b,c\n1,2,3\n");
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:csv;list;record;textable");
        assert_eq!(structure, ContentStructure::ListRecord);
    }

    #[test]
    fn csv_single_column_is_list_opaque() {
        let path = write_temp(".csv", b"a\n1\n2\n");
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:csv;list;textable");
        assert_eq!(structure, ContentStructure::ListOpaque);
    }

    #[test]
    fn toml_is_always_scalar_record() {
        let path = write_temp(".toml", b"key = 1\n");
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:toml;record;textable");
        assert_eq!(structure, ContentStructure::ScalarRecord);
    }

    #[test]
    fn log_is_always_list_opaque() {
        let path = write_temp(".log", b"line one\nline two\n");
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:log;list;textable");
        assert_eq!(structure, ContentStructure::ListOpaque);
    }

    #[test]
    fn code_extension_gets_code_flag() {
        let path = write_temp(".rs", b"fn main() {}\n");
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:rs;textable;code");
        assert_eq!(structure, ContentStructure::ScalarOpaque);
    }

    #[test]
    fn pdf_magic_bytes_are_detected_without_extension() {
        let path = write_temp("", b"%PDF-1.4\n...");
        let (media, _) = detect_file(&path, 65536);
        assert_eq!(media, "media:pdf");
    }

    #[test]
    fn unknown_binary_falls_back_to_opaque() {
        let path = write_temp("", &[0xDE, 0xAD, 0xBE, 0xEF]);
        let (media, structure) = detect_file(&path, 65536);
        assert_eq!(media, "media:");
        assert_eq!(structure, ContentStructure::ScalarOpaque);
    }
}
