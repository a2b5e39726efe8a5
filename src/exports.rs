// src/exports.rs
//
// ルートモジュール 1 ファイルだけを単独でパースして、エクスポート名を調べる。
// 依存モジュールの解決・バンドル・実行は一切しない。

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use swc_common::{SourceMap, sync::Lrc};
use swc_ecma_ast::*;
use tracing::debug;

use crate::error::ExtractError;
use crate::model::ExportNameSet;
use crate::parser;
use crate::resolver::resolve_module_file;

/// `module_path` が指すモジュールのエクスポート名を宣言順に返す
///
/// 相対パスは `project_root` 基準で解決する。
pub fn extract_exports(
    module_path: &Path,
    project_root: &Path,
) -> Result<ExportNameSet, ExtractError> {
    // 1) 実ファイルを特定
    let path = resolve_module_file(module_path, project_root).ok_or_else(|| {
        ExtractError::NotFound {
            path: module_path.to_path_buf(),
        }
    })?;

    // 2) 読み込み & 独立した SourceMap でパース
    let src = fs::read_to_string(&path).map_err(|source| ExtractError::Io {
        path: path.clone(),
        source,
    })?;
    let cm: Lrc<SourceMap> = Default::default();
    let module = parser::parse_module(&cm, &path, src, None).map_err(|failure| {
        ExtractError::Syntax {
            location: failure.location,
            message: failure.message,
        }
    })?;

    // 3) トップレベルの export 宣言を収集
    let names = collect_export_names(&module);
    debug!(module = %path.display(), exports = ?names, "エクスポート解析完了");
    Ok(names)
}

/// 1 回のコンパイルの間だけ有効なエクスポート解析結果のキャッシュ
///
/// 同じモジュールを複数のルートが参照していても解析は 1 回で済む。
/// 失敗はキャッシュしない (失敗した時点でファイル全体の変換が中断されるため)。
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: HashMap<PathBuf, ExportNameSet>,
    extractions: usize,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exports_of(
        &mut self,
        module_path: &Path,
        project_root: &Path,
    ) -> Result<ExportNameSet, ExtractError> {
        if let Some(names) = self.entries.get(module_path) {
            debug!(module = %module_path.display(), "キャッシュ済みのエクスポートを再利用");
            return Ok(names.clone());
        }

        let names = extract_exports(module_path, project_root)?;
        self.extractions += 1;
        self.entries.insert(module_path.to_path_buf(), names.clone());
        Ok(names)
    }

    /// 実際にモジュールを解析した回数
    pub fn extractions(&self) -> usize {
        self.extractions
    }
}

/// 重複を除きつつ出現順を保つ名前リスト
#[derive(Default)]
struct ExportNames {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl ExportNames {
    fn push(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.ordered.push(name.to_string());
        }
    }

    fn push_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Fn(FnDecl { ident, declare, .. }) | Decl::Class(ClassDecl { ident, declare, .. }) => {
                if !declare {
                    self.push(&ident.sym);
                }
            }
            Decl::Var(var) => {
                if !var.declare {
                    for declarator in &var.decls {
                        self.push_pat(&declarator.name);
                    }
                }
            }
            Decl::TsEnum(ts_enum) => {
                if !ts_enum.declare {
                    self.push(&ts_enum.id.sym);
                }
            }
            // TODO: 型だけを含む namespace は実行時には出力されないので除外する
            Decl::TsModule(ts_module) => {
                if let TsModuleName::Ident(id) = &ts_module.id {
                    if !ts_module.declare && !ts_module.global {
                        self.push(&id.sym);
                    }
                }
            }
            // interface / type alias は実行時に存在しない
            _ => {}
        }
    }

    /// 分割代入を含む束縛パターンから名前を拾う
    fn push_pat(&mut self, pat: &Pat) {
        match pat {
            Pat::Ident(binding) => self.push(&binding.id.sym),
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.push_pat(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => self.push_pat(&kv.value),
                        ObjectPatProp::Assign(assign) => self.push(&assign.key.sym),
                        ObjectPatProp::Rest(rest) => self.push_pat(&rest.arg),
                    }
                }
            }
            Pat::Rest(rest) => self.push_pat(&rest.arg),
            Pat::Assign(assign) => self.push_pat(&assign.left),
            Pat::Invalid(_) | Pat::Expr(_) => {}
        }
    }
}

fn module_export_name(name: &ModuleExportName) -> &str {
    match name {
        ModuleExportName::Ident(ident) => &ident.sym,
        ModuleExportName::Str(s) => &s.value,
    }
}

/// トップレベルの export を宣言順に列挙する
///
/// `export * from "..."` は依存先を読まないと分からないので数えない。
pub fn collect_export_names(module: &Module) -> ExportNameSet {
    let mut names = ExportNames::default();

    for item in &module.body {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };

        match decl {
            ModuleDecl::ExportDecl(export) => names.push_decl(&export.decl),
            ModuleDecl::ExportNamed(named) => {
                if named.type_only {
                    continue;
                }
                for specifier in &named.specifiers {
                    match specifier {
                        ExportSpecifier::Named(spec) => {
                            if !spec.is_type_only {
                                let exported = spec.exported.as_ref().unwrap_or(&spec.orig);
                                names.push(module_export_name(exported));
                            }
                        }
                        ExportSpecifier::Namespace(spec) => {
                            names.push(module_export_name(&spec.name));
                        }
                        ExportSpecifier::Default(spec) => names.push(&spec.exported.sym),
                    }
                }
            }
            ModuleDecl::ExportDefaultDecl(default) => {
                if !matches!(default.decl, DefaultDecl::TsInterfaceDecl(_)) {
                    names.push("default");
                }
            }
            ModuleDecl::ExportDefaultExpr(_) => names.push("default"),
            ModuleDecl::TsImportEquals(import) => {
                if import.is_export && !import.is_type_only {
                    names.push(&import.id.sym);
                }
            }
            _ => {}
        }
    }

    names.ordered
}
