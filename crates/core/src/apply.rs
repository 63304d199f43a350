use crate::error::RenameError;
use crate::planner::{path_exists, RenameEntry, RenamePlan};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyResult {
    pub applied: usize,
    pub dry_run: bool,
}

/// Runs the plan in order. A failure stops the run; earlier renames stay.
pub fn apply_plan(plan: &RenamePlan, options: &ApplyOptions) -> Result<ApplyResult> {
    let mut applied = 0usize;
    for entry in &plan.entries {
        apply_entry(&plan.directory, entry, options.dry_run)?;
        applied += 1;
    }

    Ok(ApplyResult {
        applied,
        dry_run: options.dry_run,
    })
}

fn apply_entry(directory: &Path, entry: &RenameEntry, dry_run: bool) -> Result<()> {
    let new_name = entry
        .new_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RenameError::UnassignedTarget(entry.original_name.clone()))?;

    let from = directory.join(&entry.original_name);
    let to = directory.join(new_name);

    if path_exists(&to)? {
        return Err(RenameError::TargetExists(to).into());
    }

    if dry_run {
        info!(from = %from.display(), to = %to.display(), "DRY RUN: リネーム予定");
        return Ok(());
    }

    info!(from = %from.display(), to = %to.display(), "リネームします");
    fs::rename(&from, &to).with_context(|| {
        format!(
            "リネームに失敗しました: {} -> {}",
            from.display(),
            to.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{apply_plan, ApplyOptions};
    use crate::error::RenameError;
    use crate::planner::tests::StubExtractor;
    use crate::planner::{generate_plan, PlanOptions, RenameEntry, RenamePlan};
    use crate::timestamp::parse_capture_time;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn sorted_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn plan_for(directory: PathBuf, entries: Vec<RenameEntry>) -> RenamePlan {
        RenamePlan {
            directory,
            entries,
            kept: Vec::new(),
            skipped: Vec::new(),
            stats: Default::default(),
            reserved: Default::default(),
        }
    }

    fn entry(from: &str, to: Option<&str>) -> RenameEntry {
        let mut entry = RenameEntry::pending(
            from,
            parse_capture_time("2021:05:01 10:00:00+00:00").expect("parse"),
        );
        entry.new_name = to.map(str::to_string);
        entry
    }

    #[test]
    fn apply_plan_renames_photos_and_sidecars() {
        let temp = tempdir().expect("tempdir");
        for name in ["IMG_0001.jpg", "IMG_0001.xmp", "IMG_0002.JPG", "notes.txt"] {
            fs::write(temp.path().join(name), name.as_bytes()).expect("write");
        }
        let extractor = StubExtractor::default()
            .with("IMG_0001.jpg", "2021:05:01 10:00:00+00:00")
            .with("IMG_0002.JPG", "2021:05:01 11:00:00");
        let plan = generate_plan(
            &PlanOptions {
                directory: temp.path().to_path_buf(),
            },
            &extractor,
        )
        .expect("plan");

        let result = apply_plan(&plan, &ApplyOptions::default()).expect("apply");
        assert_eq!(result.applied, 3);
        assert!(!result.dry_run);
        assert_eq!(
            sorted_names(temp.path()),
            vec![
                "2021-05-01_10-00-00.jpg",
                "2021-05-01_10-00-00.xmp",
                "2021-05-01_11-00-00.JPG",
                "notes.txt",
            ]
        );
        let moved = fs::read(temp.path().join("2021-05-01_10-00-00.xmp")).expect("read");
        assert_eq!(moved, b"IMG_0001.xmp");
    }

    #[test]
    fn dry_run_touches_nothing() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("IMG_0001.jpg"), b"x").expect("write");
        fs::write(temp.path().join("IMG_0001.xmp"), b"x").expect("write");
        let plan = plan_for(
            temp.path().to_path_buf(),
            vec![
                entry("IMG_0001.jpg", Some("2021-05-01_10-00-00.jpg")),
                entry("IMG_0001.xmp", Some("2021-05-01_10-00-00.xmp")),
            ],
        );

        let result = apply_plan(&plan, &ApplyOptions { dry_run: true }).expect("dry run");
        assert_eq!(result.applied, 2);
        assert!(result.dry_run);
        assert_eq!(
            sorted_names(temp.path()),
            vec!["IMG_0001.jpg", "IMG_0001.xmp"]
        );
    }

    #[test]
    fn existing_target_aborts_and_keeps_earlier_renames() {
        let temp = tempdir().expect("tempdir");
        for name in ["a.jpg", "b.jpg", "taken.jpg"] {
            fs::write(temp.path().join(name), b"x").expect("write");
        }
        let plan = plan_for(
            temp.path().to_path_buf(),
            vec![
                entry("a.jpg", Some("renamed.jpg")),
                entry("b.jpg", Some("taken.jpg")),
            ],
        );

        let err = apply_plan(&plan, &ApplyOptions::default()).expect_err("collision");
        assert!(matches!(
            err.downcast_ref::<RenameError>(),
            Some(RenameError::TargetExists(_))
        ));
        assert_eq!(
            sorted_names(temp.path()),
            vec!["b.jpg", "renamed.jpg", "taken.jpg"]
        );
    }

    #[test]
    fn dry_run_still_reports_existing_targets() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.jpg"), b"x").expect("write");
        fs::write(temp.path().join("taken.jpg"), b"x").expect("write");
        let plan = plan_for(
            temp.path().to_path_buf(),
            vec![entry("a.jpg", Some("taken.jpg"))],
        );

        let err = apply_plan(&plan, &ApplyOptions { dry_run: true }).expect_err("collision");
        assert!(matches!(
            err.downcast_ref::<RenameError>(),
            Some(RenameError::TargetExists(_))
        ));
    }

    #[test]
    fn unassigned_or_empty_target_is_rejected() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.jpg"), b"x").expect("write");

        for target in [None, Some("")] {
            let plan = plan_for(temp.path().to_path_buf(), vec![entry("a.jpg", target)]);
            let err = apply_plan(&plan, &ApplyOptions::default()).expect_err("invalid");
            assert!(matches!(
                err.downcast_ref::<RenameError>(),
                Some(RenameError::UnassignedTarget(_))
            ));
        }
        assert!(temp.path().join("a.jpg").exists());
    }

    #[test]
    fn missing_source_surfaces_rename_error() {
        let temp = tempdir().expect("tempdir");
        let plan = plan_for(
            temp.path().to_path_buf(),
            vec![entry("gone.jpg", Some("2021-05-01_10-00-00.jpg"))],
        );

        let err = apply_plan(&plan, &ApplyOptions::default()).expect_err("missing source");
        assert!(err.to_string().contains("リネームに失敗しました"));
    }
}
