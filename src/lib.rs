//! `rr-routes` のルート定義ファイルを変換するビルド時コンパイラ。
//!
//! `defineRoutes([...])` に渡されたルート配列を検証し、
//! `module: () => import("./x")` を持つ各ルートに、そのモジュールが
//! エクスポートしている名前の一覧 (`_ex`) を埋め込む。

pub mod compiler;
pub mod config;
pub mod error;
pub mod exports;
pub mod logging;
pub mod model;
pub mod parser;
pub mod plugin;
pub mod resolver;
pub mod routes;

pub use compiler::{DEFINE_ROUTES, ROUTES_PACKAGE, RouteCompiler, compile};
pub use config::ProjectConfig;
pub use error::{ChildrenShape, CompileError, ConfigError, ExtractError};
pub use exports::{ExtractionCache, extract_exports};
pub use model::{Diagnostic, ExportNameSet, LoadResult, SourceLocation};
pub use plugin::RoutesPlugin;
