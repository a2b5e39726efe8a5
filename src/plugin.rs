// src/plugin.rs
//
// バンドラのロードフックとの境界。
// ルートファイルが読み込まれたときだけ変換し、結果かエラーのどちらかを返す。

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, error};

use crate::compiler::RouteCompiler;
use crate::config::ProjectConfig;
use crate::error::CompileError;
use crate::model::{Diagnostic, LoadResult};

/// ルートファイル変換プラグイン
#[derive(Debug, Clone)]
pub struct RoutesPlugin {
    routes: PathBuf,
    compiler: RouteCompiler,
}

impl RoutesPlugin {
    pub const NAME: &'static str = "transform-routes";

    pub fn new(routes: impl Into<PathBuf>, project_root: impl Into<PathBuf>, source_map: bool) -> Self {
        RoutesPlugin {
            routes: routes.into(),
            compiler: RouteCompiler::new(project_root).with_source_map(source_map),
        }
    }

    pub fn from_config(config: &ProjectConfig, source_map: bool) -> Self {
        Self::new(&config.routes, &config.project_root, source_map)
    }

    pub fn routes(&self) -> &Path {
        &self.routes
    }

    /// ファイル読み込み時のフック
    ///
    /// ルートファイル以外は `None` (他のローダに任せる)。
    pub fn on_load(&self, path: &Path) -> Option<LoadResult> {
        if path != self.routes {
            return None;
        }

        let source = match fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
        {
            Ok(source) => source,
            Err(err) => return Some(unexpected(&err.to_string(), format!("{err:?}"))),
        };

        Some(self.transform(&source, path))
    }

    /// メモリ上のソースを変換してホスト向けの結果にする
    pub fn transform(&self, source: &str, path: &Path) -> LoadResult {
        debug!(plugin = Self::NAME, file = %path.display(), "ルートファイルを変換");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.compiler.compile(source, path)));

        match outcome {
            Ok(Ok(contents)) => LoadResult::Loaded {
                contents,
                loader: loader_kind(path),
                resolve_dir: path
                    .parent()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default(),
            },
            Ok(Err(err)) => {
                error!(plugin = Self::NAME, error = %err, "ルートファイルの変換に失敗");
                LoadResult::Failed {
                    errors: vec![diagnostic(&err)],
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(plugin = Self::NAME, panic = %message, "ルートファイルの変換中に panic");
                unexpected("internal error while transforming routes", message)
            }
        }
    }
}

/// 拡張子をローダ名として使う (`routes.tsx` → "tsx")
fn loader_kind(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("js")
        .to_string()
}

/// コンパイルエラーを診断に変換する
///
/// 既知のエラーはメッセージ・原因の要約・位置だけ。
/// 想定外のエラーは原因チェーンなどの詳細をすべて載せる。
pub fn diagnostic(err: &CompileError) -> Diagnostic {
    if err.is_known() {
        Diagnostic {
            text: err.to_string(),
            detail: err.cause_summary(),
            location: err.location().cloned(),
        }
    } else {
        Diagnostic {
            text: err.to_string(),
            detail: Some(match err {
                CompileError::Internal(inner) => format!("{inner:?}"),
                other => format!("{other:?}"),
            }),
            location: None,
        }
    }
}

fn unexpected(text: &str, detail: String) -> LoadResult {
    LoadResult::Failed {
        errors: vec![Diagnostic {
            text: text.to_string(),
            detail: Some(detail),
            location: None,
        }],
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
