use crate::timestamp::CaptureTime;

const CANONICAL_LAYOUT: &str = "%Y-%m-%d_%H-%M-%S";
pub const COLLISION_SUFFIX: char = '-';
pub const SIDECAR_EXTENSION: &str = "xmp";
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "cr2", "cr3"];

pub fn format_name(time: &CaptureTime, extension: &str, collision_index: usize) -> String {
    let mut name = time.format(CANONICAL_LAYOUT).to_string();
    name.extend(std::iter::repeat(COLLISION_SUFFIX).take(collision_index));
    name.push_str(extension);
    name
}

/// Trailing collision suffixes are ignored, so a unique file whose stem
/// happens to end in `-` is also treated as canonical.
pub fn is_already_canonical(original_name: &str, time: &CaptureTime) -> bool {
    let (stem, _) = split_extension(original_name);
    stem.trim_end_matches(COLLISION_SUFFIX) == format_name(time, "", 0)
}

/// Splits at the last `.`; the extension keeps its dot. `.xmp` has an empty stem.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) => name.split_at(index),
        None => (name, ""),
    }
}

pub fn is_photo(name: &str) -> bool {
    let (_, extension) = split_extension(name);
    let Some(extension) = extension.strip_prefix('.') else {
        return false;
    };
    PHOTO_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(extension))
}

pub fn sidecar_name(name: &str) -> String {
    let (stem, _) = split_extension(name);
    format!("{}.{}", stem, SIDECAR_EXTENSION)
}
