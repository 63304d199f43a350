use crate::exif_reader::ExifReaderExtractor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_EXIFTOOL: &str = "exiftool";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCaptureDate {
    Found(String),
    /// The file stays under its current name; the string says why.
    Unavailable(String),
}

/// Returning `Err` aborts the whole run. Per-file problems must be reported
/// as [`RawCaptureDate::Unavailable`] instead.
pub trait MetadataExtractor {
    fn read_capture_date(&self, path: &Path) -> Result<RawCaptureDate>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    #[default]
    ExifTool,
    Builtin,
}

pub fn build_extractor(kind: ExtractorKind, exiftool_path: &str) -> Box<dyn MetadataExtractor> {
    match kind {
        ExtractorKind::ExifTool => Box::new(ExifToolExtractor::new(exiftool_path)),
        ExtractorKind::Builtin => Box::new(ExifReaderExtractor),
    }
}

#[derive(Debug, Clone)]
pub struct ExifToolExtractor {
    program: PathBuf,
}

impl ExifToolExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MetadataExtractor for ExifToolExtractor {
    fn read_capture_date(&self, path: &Path) -> Result<RawCaptureDate> {
        let output = Command::new(&self.program)
            .args(["-time:all", "-struct", "-j"])
            .arg(path)
            .output()
            .with_context(|| {
                format!(
                    "exiftoolを起動できませんでした ({})。インストールされているか確認してください",
                    self.program.display()
                )
            })?;

        if !output.status.success() {
            return Ok(RawCaptureDate::Unavailable(format!(
                "exiftoolが異常終了しました: {}",
                output.status
            )));
        }

        Ok(parse_exiftool_output(&output.stdout))
    }
}

const CAPTURE_DATE_FIELDS: &[&str] = &["CreateDate", "DateTimeOriginal"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExifToolOutput {
    Many(Vec<ExifToolRecord>),
    One(ExifToolRecord),
}

type ExifToolRecord = serde_json::Map<String, serde_json::Value>;

pub(crate) fn parse_exiftool_output(stdout: &[u8]) -> RawCaptureDate {
    let record = match serde_json::from_slice::<ExifToolOutput>(stdout) {
        Ok(ExifToolOutput::One(record)) => record,
        Ok(ExifToolOutput::Many(records)) => match records.into_iter().next() {
            Some(record) => record,
            None => return RawCaptureDate::Unavailable("exiftoolの出力が空です".to_string()),
        },
        Err(err) => {
            return RawCaptureDate::Unavailable(format!("exiftoolの出力を解析できませんでした: {err}"))
        }
    };

    CAPTURE_DATE_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(|v| v.as_str()))
        .map(|raw| RawCaptureDate::Found(raw.to_string()))
        .unwrap_or_else(|| RawCaptureDate::Unavailable("撮影日時のフィールドがありません".to_string()))
}
