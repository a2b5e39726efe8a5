// src/compiler.rs
//
// ルートファイル 1 つを変換するエントリポイント。
// `import { defineRoutes } from "rr-routes"` で束縛された関数の呼び出しを探し、
// その引数の配列リテラルを RouteTransformer に渡して書き換える。

use std::path::{Path, PathBuf};

use swc_common::{GLOBALS, Globals, SourceMap, comments::SingleThreadedComments, sync::Lrc};
use swc_ecma_ast::*;
use swc_ecma_visit::{VisitMut, VisitMutWith};
use tracing::{debug, info};

use crate::error::CompileError;
use crate::exports::ExtractionCache;
use crate::parser;
use crate::routes::RouteTransformer;

/// ルート定義用パッケージ名
pub const ROUTES_PACKAGE: &str = "rr-routes";

/// 変換対象の関数名 (パッケージ側のエクスポート名)
pub const DEFINE_ROUTES: &str = "defineRoutes";

/// ルートファイルのコンパイラ
#[derive(Debug, Clone)]
pub struct RouteCompiler {
    project_root: PathBuf,
    source_map: bool,
}

impl RouteCompiler {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        RouteCompiler {
            project_root: project_root.into(),
            source_map: false,
        }
    }

    /// 出力の末尾にインライン source map を付けるかどうか
    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// ソースを変換して出力テキストを返す
    ///
    /// 途中で失敗した場合は部分的な結果を一切返さない。
    pub fn compile(&self, source: &str, file_path: &Path) -> Result<String, CompileError> {
        // 1) パース (コメントは出力に残す)
        let cm: Lrc<SourceMap> = Default::default();
        let comments = SingleThreadedComments::default();
        let mut module = parser::parse_module(&cm, file_path, source.to_string(), Some(&comments))
            .map_err(|failure| CompileError::Syntax {
                location: failure.location,
                message: failure.message,
            })?;

        GLOBALS.set(&Globals::new(), || -> Result<String, CompileError> {
            // 2) 識別子の束縛を解決し、defineRoutes の import を探す
            parser::resolve_bindings(&mut module, parser::is_typescript(file_path));
            let bindings = define_routes_bindings(&module);

            // 3) 呼び出し箇所を書き換え
            if bindings.is_empty() {
                debug!(file = %file_path.display(), "{DEFINE_ROUTES} の import なし");
            } else {
                let mut cache = ExtractionCache::new();
                let mut visitor = DefineRoutesVisitor {
                    bindings: &bindings,
                    cm: &cm,
                    file_path,
                    project_root: &self.project_root,
                    cache: &mut cache,
                    calls: 0,
                    error: None,
                };
                module.visit_mut_with(&mut visitor);

                let DefineRoutesVisitor { calls, error, .. } = visitor;
                if let Some(err) = error {
                    return Err(err);
                }
                info!(
                    file = %file_path.display(),
                    calls,
                    modules = cache.extractions(),
                    "ルートファイル変換完了"
                );
            }

            // 4) 再出力
            let source_map_root = self.source_map.then_some(self.project_root.as_path());
            let output = parser::print_module(&cm, &module, Some(&comments), source_map_root)?;
            Ok(output)
        })
    }
}

/// `compile` の関数版
pub fn compile(
    source_text: &str,
    file_path: &Path,
    project_root: &Path,
    emit_source_map: bool,
) -> Result<String, CompileError> {
    RouteCompiler::new(project_root)
        .with_source_map(emit_source_map)
        .compile(source_text, file_path)
}

/// トップレベルの import から `defineRoutes` のローカル束縛をすべて集める
///
/// `import { defineRoutes as routes } from "rr-routes"` のような別名にも対応。
/// 型のみの import は無視する。
fn define_routes_bindings(module: &Module) -> Vec<Id> {
    let mut bindings = Vec::new();

    for item in &module.body {
        let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item else {
            continue;
        };
        if import.type_only || &*import.src.value != ROUTES_PACKAGE {
            continue;
        }

        for specifier in &import.specifiers {
            let ImportSpecifier::Named(named) = specifier else {
                continue;
            };
            if named.is_type_only {
                continue;
            }
            let imported: &str = match &named.imported {
                Some(ModuleExportName::Ident(ident)) => &ident.sym,
                Some(ModuleExportName::Str(s)) => &s.value,
                None => &named.local.sym,
            };
            if imported == DEFINE_ROUTES {
                bindings.push(named.local.to_id());
            }
        }
    }

    bindings
}

/// `defineRoutes(...)` 呼び出しを探して書き換える Visitor
struct DefineRoutesVisitor<'a> {
    bindings: &'a [Id],
    cm: &'a SourceMap,
    file_path: &'a Path,
    project_root: &'a Path,
    cache: &'a mut ExtractionCache,
    /// 書き換えた呼び出しの数
    calls: usize,
    /// 最初に起きたエラー (以降の走査は打ち切る)
    error: Option<CompileError>,
}

impl DefineRoutesVisitor<'_> {
    fn is_define_routes(&self, call: &CallExpr) -> bool {
        match &call.callee {
            Callee::Expr(callee) => match &**callee {
                Expr::Ident(ident) => self.bindings.contains(&ident.to_id()),
                _ => false,
            },
            _ => false,
        }
    }

    fn rewrite(&mut self, call: &mut CallExpr) -> Result<(), CompileError> {
        let location = parser::location_of(self.cm, self.file_path, call.span);

        if call.args.len() != 1 {
            return Err(CompileError::InvalidCallArity {
                location,
                count: call.args.len(),
            });
        }

        let routes = match &mut call.args[0] {
            ExprOrSpread { spread: None, expr } => match &mut **expr {
                Expr::Array(routes) => routes,
                _ => return Err(CompileError::InvalidCallArgumentShape { location }),
            },
            ExprOrSpread { spread: Some(_), .. } => {
                return Err(CompileError::InvalidCallArgumentShape { location });
            }
        };

        RouteTransformer::new(self.cm, self.file_path, self.project_root, self.cache)
            .transform(routes)?;
        self.calls += 1;
        Ok(())
    }
}

impl VisitMut for DefineRoutesVisitor<'_> {
    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        if self.error.is_some() {
            return;
        }

        if self.is_define_routes(call) {
            if let Err(err) = self.rewrite(call) {
                self.error = Some(err);
                return;
            }
        }

        call.visit_mut_children_with(self);
    }
}
