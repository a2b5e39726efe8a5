// src/main.rs

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use route_manifest_compiler::logging::{LogFormat, init_logging};
use route_manifest_compiler::{LoadResult, ProjectConfig, RoutesPlugin};

/// CLI 引数定義
#[derive(Parser, Debug)]
#[command(
    name = "route-manifest-compiler",
    version,
    about = "ルート定義ファイルを変換し、バンドラのロードフックと同じ結果を JSON で出力する"
)]
struct Cli {
    /// プロジェクトルート (package.json のあるディレクトリ)
    #[arg(short = 'r', long = "project-root", value_name = "DIR", default_value = ".")]
    project_root: PathBuf,

    /// ルートファイル。省略時は package.json の `"rr-bundler".routes` か `app/routes.*`
    #[arg(long, value_name = "FILE")]
    routes: Option<PathBuf>,

    /// インライン source map を付ける
    #[arg(long = "source-map")]
    source_map: bool,

    /// ログ形式
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.log_format, "warn") {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(result) if !result.is_error() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<LoadResult> {
    // 1) プロジェクトルートを絶対化し、ルートファイルを決める
    let project_dir = cli.project_root.canonicalize()?;
    let config = match &cli.routes {
        Some(routes) => ProjectConfig::with_routes(&project_dir, routes),
        None => ProjectConfig::load(&project_dir)?,
    };

    // 2) ロードフックと同じ経路で変換
    let plugin = RoutesPlugin::from_config(&config, cli.source_map);
    let result = plugin
        .on_load(&config.routes)
        .ok_or_else(|| anyhow::anyhow!("routes file was not handled by the plugin"))?;

    // 3) 結果を JSON 化して標準出力
    let json = serde_json::to_string_pretty(&result)?;
    println!("{json}");

    Ok(result)
}
