use crate::error::RenameError;
use crate::filename::{format_name, is_already_canonical, is_photo, sidecar_name, split_extension};
use crate::metadata::{MetadataExtractor, RawCaptureDate};
use crate::timestamp::{parse_capture_time, CaptureTime};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Photo,
    Sidecar,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameEntry {
    pub original_name: String,
    pub capture_time: CaptureTime,
    pub new_name: Option<String>,
    pub kind: EntryKind,
}

impl RenameEntry {
    pub fn pending(original_name: impl Into<String>, capture_time: CaptureTime) -> Self {
        Self {
            original_name: original_name.into(),
            capture_time,
            new_name: None,
            kind: EntryKind::Photo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeepReason {
    MetadataUnavailable { detail: String },
    AlreadyCanonical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeptFile {
    pub name: String,
    pub reason: KeepReason,
}

/// Every name taken in the directory's final state. Only grows.
#[derive(Debug, Clone, Default)]
pub struct ReservedNames {
    names: HashSet<String>,
}

impl ReservedNames {
    /// Returns false, leaving the set untouched, when `name` is already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.names.contains(name) {
            return false;
        }
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenameStats {
    pub scanned_files: usize,
    pub photo_files: usize,
    pub skipped_non_photo: usize,
    pub metadata_unavailable: usize,
    pub already_canonical: usize,
    pub planned: usize,
    pub sidecars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub directory: PathBuf,
    /// Photos in discovery order, then their sidecars.
    pub entries: Vec<RenameEntry>,
    pub kept: Vec<KeptFile>,
    /// Entries that are not photo candidates; never renamed or reserved.
    pub skipped: Vec<String>,
    pub stats: RenameStats,
    #[serde(skip)]
    pub reserved: ReservedNames,
}

enum Classification {
    NotAPhoto,
    MetadataUnavailable(String),
    AlreadyCanonical,
    NeedsRename(CaptureTime),
}

pub fn generate_plan(
    options: &PlanOptions,
    extractor: &dyn MetadataExtractor,
) -> Result<RenamePlan> {
    let directory = &options.directory;
    if !directory.is_dir() {
        return Err(RenameError::DirectoryNotFound(directory.clone()).into());
    }

    info!(directory = %directory.display(), "フォルダを走査します");
    let mut stats = RenameStats::default();
    let names = list_file_names(directory, &mut stats)?;

    let mut reserved = ReservedNames::default();
    let mut kept = Vec::new();
    let mut skipped = Vec::new();
    let mut pending = Vec::new();

    for name in names {
        info!(file = %name, "分類中");
        match classify(directory, &name, extractor)? {
            Classification::NotAPhoto => {
                stats.skipped_non_photo += 1;
                info!(file = %name, "写真ではないためスキップします");
                skipped.push(name);
            }
            Classification::MetadataUnavailable(detail) => {
                stats.photo_files += 1;
                stats.metadata_unavailable += 1;
                warn!(file = %name, reason = %detail, "撮影日時を取得できないため現在の名前のまま残します");
                reserved.reserve(&name);
                kept.push(KeptFile {
                    name,
                    reason: KeepReason::MetadataUnavailable { detail },
                });
            }
            Classification::AlreadyCanonical => {
                stats.photo_files += 1;
                stats.already_canonical += 1;
                info!(file = %name, "既に正規の名前です");
                reserved.reserve(&name);
                kept.push(KeptFile {
                    name,
                    reason: KeepReason::AlreadyCanonical,
                });
            }
            Classification::NeedsRename(capture_time) => {
                stats.photo_files += 1;
                pending.push(RenameEntry::pending(name, capture_time));
            }
        }
    }

    resolve_collisions(&mut pending, &mut reserved);
    stats.planned = pending.len();

    let sidecars = plan_sidecars(directory, &pending)?;
    stats.sidecars = sidecars.len();

    let mut entries = pending;
    entries.extend(sidecars);

    Ok(RenamePlan {
        directory: directory.clone(),
        entries,
        kept,
        skipped,
        stats,
        reserved,
    })
}

/// Assigns each pending entry the first free collision index, in slice order.
pub fn resolve_collisions(pending: &mut [RenameEntry], reserved: &mut ReservedNames) {
    for entry in pending.iter_mut() {
        if entry.new_name.is_some() {
            continue;
        }

        let (_, extension) = split_extension(&entry.original_name);
        let mut collision_index = 0usize;
        let mut candidate = format_name(&entry.capture_time, extension, collision_index);
        while !reserved.reserve(&candidate) {
            collision_index += 1;
            candidate = format_name(&entry.capture_time, extension, collision_index);
        }

        info!(from = %entry.original_name, to = %candidate, "リネーム予定");
        entry.new_name = Some(candidate);
    }
}

fn classify(
    directory: &Path,
    name: &str,
    extractor: &dyn MetadataExtractor,
) -> Result<Classification> {
    if !is_photo(name) {
        return Ok(Classification::NotAPhoto);
    }

    let raw = match extractor.read_capture_date(&directory.join(name))? {
        RawCaptureDate::Found(raw) => raw,
        RawCaptureDate::Unavailable(reason) => {
            return Ok(Classification::MetadataUnavailable(reason))
        }
    };

    let capture_time = match parse_capture_time(&raw) {
        Ok(time) => time,
        Err(err) => return Ok(Classification::MetadataUnavailable(err.to_string())),
    };
    debug!(file = %name, raw = %raw, parsed = %capture_time, "撮影日時を解析しました");

    if is_already_canonical(name, &capture_time) {
        Ok(Classification::AlreadyCanonical)
    } else {
        Ok(Classification::NeedsRename(capture_time))
    }
}

fn list_file_names(directory: &Path, stats: &mut RenameStats) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("フォルダ走査に失敗しました: {}", directory.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        stats.scanned_files += 1;

        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_string()),
            None => {
                stats.skipped_non_photo += 1;
                warn!(path = %entry.path().display(), "UTF-8でないファイル名はスキップします");
            }
        }
    }
    Ok(names)
}

fn plan_sidecars(directory: &Path, photos: &[RenameEntry]) -> Result<Vec<RenameEntry>> {
    let mut claimed_sources = HashSet::<String>::new();
    let mut planned_targets = HashSet::<String>::new();
    let mut sidecars = Vec::new();

    for photo in photos {
        let new_name = photo
            .new_name
            .as_deref()
            .ok_or_else(|| RenameError::UnassignedTarget(photo.original_name.clone()))?;

        let source = sidecar_name(&photo.original_name);
        let source_path = directory.join(&source);
        if !path_exists(&source_path)? {
            continue;
        }
        if !claimed_sources.insert(source.clone()) {
            warn!(
                sidecar = %source,
                photo = %photo.original_name,
                "サイドカーは先に処理した写真と一緒にリネームされます"
            );
            continue;
        }

        let target = sidecar_name(new_name);
        let target_path = directory.join(&target);
        if path_exists(&target_path)? || !planned_targets.insert(target.clone()) {
            return Err(RenameError::SidecarCollision {
                sidecar: source_path,
                target: target_path,
            }
            .into());
        }

        info!(from = %source, to = %target, "サイドカーのリネーム予定");
        sidecars.push(RenameEntry {
            original_name: source,
            capture_time: photo.capture_time,
            new_name: Some(target),
            kind: EntryKind::Sidecar,
        });
    }

    Ok(sidecars)
}

pub(crate) fn path_exists(path: &Path) -> Result<bool> {
    path.try_exists()
        .with_context(|| format!("ファイルの存在確認に失敗しました: {}", path.display()))
}
