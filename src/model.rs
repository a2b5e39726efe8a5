// src/model.rs
use serde::Serialize;
use std::path::Path;

/// モジュールがエクスポートしている名前の一覧 (宣言順)
///
/// ルート定義の `_ex` プロパティとしてそのまま埋め込まれる。
pub type ExportNameSet = Vec<String>;

/// 診断メッセージに付与するソース位置
///
/// 行・列ともに 0 始まり (ホスト側の表示形式に合わせる)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// 位置を含むファイルのパス
    pub file: String,
    /// 0 始まりの行番号
    pub line: u32,
    /// 0 始まりの列番号
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: &Path, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.display().to_string(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // エディタでジャンプできるよう 1 始まりで表示する
        write!(f, "{}:{}:{}", self.file, self.line + 1, self.column + 1)
    }
}

/// ホスト (バンドラ) に返す診断 1 件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

/// ロードフックの戻り値
///
/// 成功時は変換後のソース、失敗時は診断のみ。どちらか一方だけを返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LoadResult {
    Loaded {
        contents: String,
        /// 拡張子 (ドットなし)。例: "tsx"
        loader: String,
        #[serde(rename = "resolveDir")]
        resolve_dir: String,
    },
    Failed { errors: Vec<Diagnostic> },
}

impl LoadResult {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadResult::Failed { .. })
    }
}
