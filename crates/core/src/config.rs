use crate::metadata::{ExtractorKind, DEFAULT_EXIFTOOL};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub exiftool_path: String,
    pub extractor: ExtractorKind,
    pub dry_run_default: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exiftool_path: DEFAULT_EXIFTOOL.to_string(),
            extractor: ExtractorKind::default(),
            dry_run_default: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "photostamp", "photostamp")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("設定ファイルを読めませんでした: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("設定ファイルのパースに失敗しました: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let paths = app_paths()?;
    save_config_to(config, &paths.config_path)?;
    Ok(paths.config_path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| {
            format!("設定ディレクトリを作成できませんでした: {}", dir.display())
        })?;
    }
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(path, body)
        .with_context(|| format!("設定ファイルを書き込めませんでした: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config_from, save_config_to, AppConfig};
    use crate::metadata::ExtractorKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_from(&temp.path().join("config.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.exiftool_path, "exiftool");
        assert_eq!(config.extractor, ExtractorKind::ExifTool);
    }

    #[test]
    fn saved_config_loads_back() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let config = AppConfig {
            exiftool_path: "/opt/bin/exiftool".to_string(),
            extractor: ExtractorKind::Builtin,
            dry_run_default: true,
        };

        save_config_to(&config, &path).expect("save");
        assert_eq!(load_config_from(&path).expect("load"), config);
    }

    #[test]
    fn partial_file_fills_missing_keys_with_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "extractor = \"builtin\"\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.extractor, ExtractorKind::Builtin);
        assert_eq!(config.exiftool_path, "exiftool");
        assert!(!config.dry_run_default);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "extractor = [").expect("write");

        let err = load_config_from(&path).expect_err("malformed");
        assert!(err.to_string().contains("設定ファイルのパースに失敗しました"));
    }
}
