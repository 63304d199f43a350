mod apply;
mod config;
mod error;
mod exif_reader;
mod filename;
mod metadata;
mod planner;
mod timestamp;

pub use apply::{apply_plan, ApplyOptions, ApplyResult};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use error::RenameError;
pub use exif_reader::ExifReaderExtractor;
pub use filename::{
    format_name, is_already_canonical, is_photo, sidecar_name, split_extension,
    COLLISION_SUFFIX, PHOTO_EXTENSIONS, SIDECAR_EXTENSION,
};
pub use metadata::{
    build_extractor, ExifToolExtractor, ExtractorKind, MetadataExtractor, RawCaptureDate,
};
pub use planner::{
    generate_plan, resolve_collisions, EntryKind, KeepReason, KeptFile, PlanOptions,
    RenameEntry, RenamePlan, RenameStats, ReservedNames,
};
pub use timestamp::{parse_capture_time, CaptureTime, TimestampError};
