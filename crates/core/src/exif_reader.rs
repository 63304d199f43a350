use crate::metadata::{MetadataExtractor, RawCaptureDate};
use anyhow::{Context, Result};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];
const OFFSET_TAGS: &[Tag] = &[Tag::OffsetTimeOriginal, Tag::OffsetTime];

/// Reads EXIF in-process, without an external tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifReaderExtractor;

impl MetadataExtractor for ExifReaderExtractor {
    fn read_capture_date(&self, path: &Path) -> Result<RawCaptureDate> {
        let file = File::open(path)
            .with_context(|| format!("EXIF読み込み対象を開けませんでした: {}", path.display()))?;
        let mut buf = BufReader::new(file);
        let exif = match Reader::new().read_from_container(&mut buf) {
            Ok(exif) => exif,
            Err(err) => {
                return Ok(RawCaptureDate::Unavailable(format!(
                    "EXIFを解析できませんでした: {err}"
                )))
            }
        };

        Ok(capture_date_from_exif(&exif))
    }
}

fn capture_date_from_exif(exif: &Exif) -> RawCaptureDate {
    let Some(date) = find_ascii_value(exif, DATE_TAGS) else {
        return RawCaptureDate::Unavailable("EXIFに撮影日時がありません".to_string());
    };
    let offset = find_ascii_value(exif, OFFSET_TAGS);
    RawCaptureDate::Found(join_date_and_offset(&date, offset.as_deref()))
}

fn find_ascii_value(exif: &Exif, tags: &[Tag]) -> Option<String> {
    tags.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(values) => values
                .first()
                .map(|v| String::from_utf8_lossy(v).trim().to_string())
                .filter(|v| !v.is_empty()),
            _ => None,
        }
    })
}

fn join_date_and_offset(date: &str, offset: Option<&str>) -> String {
    match offset.map(str::trim).filter(|v| !v.is_empty()) {
        Some(offset) => format!("{date}{offset}"),
        None => date.to_string(),
    }
}
