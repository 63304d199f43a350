use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use photostamp_core::{
    app_paths, apply_plan, build_extractor, generate_plan, load_config, load_config_from,
    save_config, AppConfig, AppPaths, ApplyOptions, ExtractorKind, KeepReason, PlanOptions,
    RenamePlan,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "photostamp")]
#[command(about = "撮影日時をもとに写真のファイル名を一括リネームします")]
struct Cli {
    /// ログを詳細にします (繰り返し指定可)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Init {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// 対象フォルダ (サブフォルダは対象外)
    dir: PathBuf,
    /// 実ファイルを変更せずに予定だけを表示します
    #[arg(long, default_value_t = false, conflicts_with = "apply")]
    dry_run: bool,
    /// 設定の dry_run_default に関わらず実際にリネームします
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum)]
    extractor: Option<ExtractorArg>,
    #[arg(long)]
    exiftool: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExtractorArg {
    Exiftool,
    Builtin,
}

impl From<ExtractorArg> for ExtractorKind {
    fn from(value: ExtractorArg) -> Self {
        match value {
            ExtractorArg::Exiftool => ExtractorKind::ExifTool,
            ExtractorArg::Builtin => ExtractorKind::Builtin,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init { force } => cmd_config_init(force),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("photostamp={level},photostamp_core={level}"))
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = config_or_default(app_paths())?;
    let kind = args.extractor.map(Into::into).unwrap_or(config.extractor);
    let exiftool = args.exiftool.unwrap_or(config.exiftool_path);
    let dry_run = resolve_dry_run(args.apply, args.dry_run, config.dry_run_default);

    let directory = fs::canonicalize(&args.dir)
        .with_context(|| format!("対象フォルダを解決できませんでした: {}", args.dir.display()))?;
    info!(directory = %directory.display(), dry_run, extractor = ?kind, "開始します");

    let extractor = build_extractor(kind, &exiftool);
    let plan = generate_plan(&PlanOptions { directory }, extractor.as_ref())?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Table => {
            print_table(&plan);
        }
    }

    let result = apply_plan(&plan, &ApplyOptions { dry_run })?;
    if result.dry_run {
        eprintln!(
            "dry-runモード: {}件のリネームを確認しました。実ファイルは変更していません。",
            result.applied
        );
    } else {
        eprintln!("適用完了: {}件", result.applied);
    }

    Ok(())
}

fn resolve_dry_run(apply: bool, dry_run: bool, default: bool) -> bool {
    apply
        .then_some(false)
        .or(dry_run.then_some(true))
        .unwrap_or(default)
}

fn config_or_default(paths: Result<AppPaths>) -> Result<AppConfig> {
    match paths {
        Ok(paths) => load_config_from(&paths.config_path),
        Err(err) => {
            warn!("{err:#}: 既定の設定で続行します");
            Ok(AppConfig::default())
        }
    }
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() && !force {
        anyhow::bail!(
            "設定ファイルが既に存在します: {} (上書きするには --force を指定してください)",
            paths.config_path.display()
        );
    }
    let path = save_config(&AppConfig::default())?;
    println!("設定ファイルを作成しました: {}", path.display());
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル (種別)");
    for entry in &plan.entries {
        println!(
            "{} -> {} ({:?})",
            entry.original_name,
            entry.new_name.as_deref().unwrap_or("?"),
            entry.kind
        );
    }

    if !plan.kept.is_empty() {
        println!("\n変更なし:");
        for kept in &plan.kept {
            match &kept.reason {
                KeepReason::AlreadyCanonical => println!("{} (正規の名前)", kept.name),
                KeepReason::MetadataUnavailable { detail } => {
                    println!("{} (撮影日時なし: {})", kept.name, detail)
                }
            }
        }
    }

    if !plan.skipped.is_empty() {
        println!("\n対象外: {}", plan.skipped.join(", "));
    }

    println!(
        "\n集計: scanned={} photo={} non_photo_skip={} no_metadata={} canonical={} planned={} sidecars={}",
        plan.stats.scanned_files,
        plan.stats.photo_files,
        plan.stats.skipped_non_photo,
        plan.stats.metadata_unavailable,
        plan.stats.already_canonical,
        plan.stats.planned,
        plan.stats.sidecars
    );
}
