// src/error.rs
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::SourceLocation;

/// ルートファイル変換中のエラー
///
/// `Internal` 以外はすべて利用者のコードに原因がある「既知のエラー」。
#[derive(Debug, Error)]
pub enum CompileError {
    /// `defineRoutes` の引数が 1 個ではない
    #[error("defineRoutes must have exactly one argument, found {count}")]
    InvalidCallArity {
        location: SourceLocation,
        count: usize,
    },

    /// 引数が配列リテラルではない (変数参照など)
    #[error("defineRoutes must be called with an array literal of route definitions")]
    InvalidCallArgumentShape { location: SourceLocation },

    #[error("route definition must be an object literal")]
    InvalidRouteShape { location: SourceLocation },

    #[error("{reason}")]
    InvalidChildrenShape {
        location: SourceLocation,
        reason: ChildrenShape,
    },

    #[error("a route module must be an inline arrow like `() => import('...')` if defined")]
    InvalidModuleShape { location: SourceLocation },

    /// ルートが参照するモジュールのエクスポート解析に失敗した
    ///
    /// 位置は失敗したファイル内ではなく、参照元の `module` プロパティを指す。
    #[error("failed to read the exports of route module \"{module}\"")]
    ExportExtractionFailed {
        location: SourceLocation,
        module: String,
        #[source]
        source: ExtractError,
    },

    /// ルートファイル自体の構文エラー
    #[error("{message}")]
    Syntax {
        location: SourceLocation,
        message: String,
    },

    /// 想定外の内部エラー (出力や source map 生成の失敗)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CompileError {
    /// 利用者向けの既知エラーかどうか
    pub fn is_known(&self) -> bool {
        !matches!(self, CompileError::Internal(_))
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompileError::InvalidCallArity { location, .. }
            | CompileError::InvalidCallArgumentShape { location }
            | CompileError::InvalidRouteShape { location }
            | CompileError::InvalidChildrenShape { location, .. }
            | CompileError::InvalidModuleShape { location }
            | CompileError::ExportExtractionFailed { location, .. }
            | CompileError::Syntax { location, .. } => Some(location),
            CompileError::Internal(_) => None,
        }
    }

    /// 原因の要約 (ホストの `detail` 欄に出す)
    pub fn cause_summary(&self) -> Option<String> {
        match self {
            CompileError::ExportExtractionFailed { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}

/// `children` が不正な理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenShape {
    /// `children,` や `children() {}` のようにキー/値の形になっていない
    NotAssignment,
    /// 値が配列リテラルではない
    NotArrayLiteral,
}

impl fmt::Display for ChildrenShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildrenShape::NotAssignment => {
                f.write_str("children must be a property assignment if defined")
            }
            ChildrenShape::NotArrayLiteral => f.write_str("children must be an array if defined"),
        }
    }
}

/// 単一モジュールのエクスポート解析エラー
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("module not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{location}: {message}")]
    Syntax {
        location: SourceLocation,
        message: String,
    },
}

/// プロジェクト設定の読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "No routes file found, please create one at `app/routes.ts` or configure it in `package.json` at `\"rr-bundler\".routes`."
    )]
    RoutesNotFound,
}
