use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort the whole run.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("対象フォルダが存在しません: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error(
        "サイドカーのリネーム先が既に存在します: {} -> {}",
        .sidecar.display(),
        .target.display()
    )]
    SidecarCollision { sidecar: PathBuf, target: PathBuf },
    #[error("リネーム先が既に存在します: {}", .0.display())]
    TargetExists(PathBuf),
    #[error("リネーム先が未確定のエントリがあります: {0}")]
    UnassignedTarget(String),
}
