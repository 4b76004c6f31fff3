//! Class-name table and the Ultralytics metadata embedded in exported models.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Maps class indices produced by the detector to human-readable names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames {
    names: BTreeMap<usize, String>,
}

impl ClassNames {
    pub fn new(names: BTreeMap<usize, String>) -> Self {
        Self { names }
    }

    /// One name per line; the line number is the class id. Blank lines keep
    /// their index but have no name.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_lines(&content))
    }

    pub fn from_lines(content: &str) -> Self {
        let names = content
            .lines()
            .map(str::trim)
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(id, name)| (id, name.to_string()))
            .collect();
        Self { names }
    }

    /// Parse the `names` entry Ultralytics writes into ONNX metadata, such as
    /// `{0: 'person', 1: 'bicycle'}`. The value is a YAML flow mapping.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        match serde_yaml::from_str::<BTreeMap<usize, String>>(raw) {
            Ok(names) => Some(Self { names }),
            Err(e) => {
                tracing::debug!("Unparseable names metadata: {}", e);
                None
            }
        }
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    /// Name for `class_id`, or the id itself when the table has no entry.
    pub fn resolve(&self, class_id: usize) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Metadata read from an exported detector.
#[derive(Debug, Clone, Default)]
pub struct ModelMetadata {
    pub names: ClassNames,
    /// `(width, height)` of the network input
    pub imgsz: Option<(u32, u32)>,
}

/// `imgsz` is stored as `[h, w]` or a bare integer.
pub fn parse_imgsz(raw: &str) -> Option<(u32, u32)> {
    let values: Vec<u32> = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|v| v.trim().parse().ok())
        .collect::<Option<_>>()?;

    match values.as_slice() {
        [size] => Some((*size, *size)),
        [height, width] => Some((*width, *height)),
        _ => None,
    }
}
