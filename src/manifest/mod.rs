use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::util;

/// The only platform this tool patches.
const TARGET_PLATFORM: &str = "windows";

const DOWNLOAD_ROOT: &str = "file://cyyu.me/Users/CyYu/Programs/DancherLink-qt/build";
const INSTALLER_NAME: &str = "DancherLink.msi";

/// What the caller asked to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub version: String,
    /// Architecture as given on the command line (e.g. `x64`).
    pub arch: String,
    pub build_config: String,
}

impl UpdateRequest {
    pub fn new(
        version: impl Into<String>,
        arch: impl Into<String>,
        build_config: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            arch: arch.into(),
            build_config: build_config.into(),
        }
    }

    /// Architecture tag as it appears in the manifest.
    #[must_use]
    pub fn manifest_arch(&self) -> &str {
        normalize_arch(&self.arch)
    }

    #[must_use]
    pub fn browser_url(&self) -> String {
        browser_url(&self.arch, &self.build_config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record at `index` was rewritten and the file saved.
    Updated { index: usize },
    /// Nothing matched `arch` (already normalized); the file was left alone.
    NoMatch { arch: String },
}

#[derive(Debug)]
pub enum ManifestError {
    NotFound(PathBuf),
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Write { path: PathBuf, source: io::Error },
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::NotFound(path) => {
                write!(f, "Manifest file not found: {}", path.display())
            }
            ManifestError::Read { path, source } => {
                write!(f, "Failed to read {}: {source}", path.display())
            }
            ManifestError::Parse { path, source } => {
                write!(f, "Failed to parse JSON from {}: {source}", path.display())
            }
            ManifestError::Write { path, source } => {
                write!(f, "Failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::NotFound(_) => None,
            ManifestError::Read { source, .. } | ManifestError::Write { source, .. } => {
                Some(source)
            }
            ManifestError::Parse { source, .. } => Some(source),
        }
    }
}

/// Map a build architecture onto the tag used in the manifest.
#[must_use]
pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x64" => "x86_64",
        other => other,
    }
}

/// Download location of the installer produced by a given build.
#[must_use]
pub fn browser_url(arch: &str, build_config: &str) -> String {
    format!("{DOWNLOAD_ROOT}/build-{arch}-{build_config}/{INSTALLER_NAME}")
}

/// Read the manifest as a list of records.
///
/// Empty files read as an empty list; a lone top-level value is wrapped in a list.
///
/// # Errors
/// Returns [`ManifestError::NotFound`] when the file is absent and
/// [`ManifestError::Parse`] when non-empty content is not JSON.
pub fn load(path: &Path) -> Result<Vec<Value>, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(content.trim()).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_records(content: &str) -> Result<Vec<Value>, serde_json::Error> {
    if content.is_empty() {
        debug!("manifest: empty file, starting from an empty list");
        return Ok(Vec::new());
    }

    match serde_json::from_str(content)? {
        Value::Array(records) => Ok(records),
        other => {
            debug!("manifest: top-level value is not an array, wrapping it");
            Ok(vec![other])
        }
    }
}

/// Patch the first Windows record for the request's architecture.
///
/// Returns the index of the record that changed, if any. Later matches are left alone.
pub fn apply_update(records: &mut [Value], request: &UpdateRequest) -> Option<usize> {
    let arch = request.manifest_arch();
    let (index, record) = records
        .iter_mut()
        .enumerate()
        .find(|(_, record)| matches_target(record, arch))?;

    if let Value::Object(fields) = record {
        fields.insert("version".into(), Value::String(request.version.clone()));
        fields.insert("browser_url".into(), Value::String(request.browser_url()));
    }
    Some(index)
}

fn matches_target(record: &Value, arch: &str) -> bool {
    record.get("platform").and_then(Value::as_str) == Some(TARGET_PLATFORM)
        && record.get("arch").and_then(Value::as_str) == Some(arch)
}

/// Render records the way the manifest is kept on disk: a JSON array, 4-space indent.
///
/// # Errors
/// Only fails if serialization itself fails.
pub fn render(records: &[Value]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    records.serialize(&mut serializer)?;
    Ok(out)
}

/// Overwrite the manifest with `records`.
///
/// # Errors
/// Returns [`ManifestError::Write`] if the file cannot be replaced.
pub fn save(path: &Path, records: &[Value]) -> Result<(), ManifestError> {
    let to_write_error = |source: io::Error| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    };
    let bytes = render(records).map_err(|e| to_write_error(e.into()))?;
    util::write_atomic(path, &bytes).map_err(to_write_error)
}

/// Load, patch and (on a match) rewrite the manifest at `path`.
///
/// # Errors
/// Propagates load and save failures. A missing record is not an error.
pub fn update_manifest(
    path: &Path,
    request: &UpdateRequest,
) -> Result<UpdateOutcome, ManifestError> {
    debug!("manifest: loading {}", path.display());
    let mut records = load(path)?;

    let Some(index) = apply_update(&mut records, request) else {
        let arch = request.manifest_arch().to_owned();
        warn!(
            "Could not find matching entry in {} for arch {arch}",
            path.display()
        );
        return Ok(UpdateOutcome::NoMatch { arch });
    };

    debug!("manifest: record {index} matched, writing back");
    save(path, &records)?;
    info!("Updated {} to version {}", path.display(), request.version);
    Ok(UpdateOutcome::Updated { index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_manifest(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("updates.json");
        fs::write(&path, content).unwrap();
        path
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn only_x64_is_renamed() {
        assert_eq!(normalize_arch("x64"), "x86_64");
        for arch in ["x86_64", "x86", "arm64", "aarch64", "X64", ""] {
            assert_eq!(normalize_arch(arch), arch);
        }
    }

    #[test]
    fn url_uses_literal_arch() {
        let request = UpdateRequest::new("2.0.0", "x64", "release");
        assert_eq!(
            request.browser_url(),
            "file://cyyu.me/Users/CyYu/Programs/DancherLink-qt/build/build-x64-release/DancherLink.msi"
        );
    }

    #[test]
    fn updates_matching_windows_record() {
        let dir = tempfile::tempdir().unwrap();
        let original = json!([
            {"platform": "macos", "arch": "x86_64", "version": "1.0.0", "browser_url": "mac"},
            {"platform": "windows", "arch": "x86_64", "version": "1.0.0", "browser_url": "old"},
            {"platform": "windows", "arch": "arm64", "version": "1.0.0", "browser_url": "arm"}
        ]);
        let path = write_manifest(dir.path(), &original.to_string());

        let outcome =
            update_manifest(&path, &UpdateRequest::new("2.0.0", "x64", "release")).unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated { index: 1 });
        let written = read_json(&path);
        let records = written.as_array().expect("manifest stays an array");
        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["version"], "2.0.0");
        let url = records[1]["browser_url"].as_str().unwrap();
        assert!(url.contains("build-x64-release"));
        assert!(url.ends_with("DancherLink.msi"));
        assert_eq!(records[0], original[0]);
        assert_eq!(records[2], original[2]);
    }

    #[test]
    fn first_match_wins() {
        let mut records = vec![
            json!({"platform": "windows", "arch": "x86", "version": "1"}),
            json!({"platform": "windows", "arch": "x86", "version": "1"}),
        ];
        let index = apply_update(&mut records, &UpdateRequest::new("3", "x86", "debug"));

        assert_eq!(index, Some(0));
        assert_eq!(records[0]["version"], "3");
        assert_eq!(records[1]["version"], "1");
    }

    #[test]
    fn non_object_and_non_string_records_never_match() {
        let mut records = vec![
            json!("windows"),
            json!({"platform": "windows", "arch": 64}),
            json!({"arch": "x86_64"}),
        ];
        let before = records.clone();

        assert_eq!(
            apply_update(&mut records, &UpdateRequest::new("2", "x64", "release")),
            None
        );
        assert_eq!(records, before);
    }

    #[test]
    fn empty_file_is_a_no_match_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), "  \n");

        let outcome =
            update_manifest(&path, &UpdateRequest::new("2.0.0", "x64", "release")).unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::NoMatch {
                arch: "x86_64".into()
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "  \n");
    }

    #[test]
    fn single_object_is_wrapped_in_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{"platform": "windows", "arch": "x86_64", "version": "1.0", "browser_url": ""}"#,
        );

        assert_eq!(load(&path).unwrap().len(), 1);
        update_manifest(&path, &UpdateRequest::new("1.1", "x64", "release")).unwrap();

        let written = read_json(&path);
        let records = written.as_array().expect("object should be normalized to an array");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["version"], "1.1");
    }

    #[test]
    fn extra_fields_keep_their_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"[{"platform": "windows", "kernel_version_at_least": "10.0", "arch": "x86_64", "version": "1", "browser_url": "a"}]"#,
        );

        update_manifest(&path, &UpdateRequest::new("2", "x64", "release")).unwrap();

        let written = read_json(&path);
        let keys: Vec<&str> = written[0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            ["platform", "kernel_version_at_least", "arch", "version", "browser_url"]
        );
        assert_eq!(written[0]["kernel_version_at_least"], "10.0");
    }

    #[test]
    fn oversized_integers_are_written_back_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"[{"platform": "windows", "arch": "x86_64", "n": 123456789012345678901234567890, "f": 0.10000000000000000001}]"#,
        );

        update_manifest(&path, &UpdateRequest::new("2", "x64", "release")).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#""n": 123456789012345678901234567890"#), "{written}");
        assert!(written.contains(r#""f": 0.10000000000000000001"#), "{written}");
        assert!(written.contains(r#""version": "2""#));
    }

    #[test]
    fn renders_with_four_space_indent() {
        let rendered = render(&[json!({"platform": "windows"})]).unwrap();
        assert_eq!(
            String::from_utf8(rendered).unwrap(),
            "[\n    {\n        \"platform\": \"windows\"\n    }\n]"
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updates.json");

        let err = update_manifest(&path, &UpdateRequest::new("2", "x64", "release")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
        assert!(err.to_string().starts_with("Manifest file not found"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), "[{\"platform\": ");

        let err = update_manifest(&path, &UpdateRequest::new("2", "x64", "release")).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"platform\": ");
    }
}
