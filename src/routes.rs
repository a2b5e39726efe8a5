// src/routes.rs
//
// `defineRoutes([...])` の配列リテラルをその場で書き換える。
// 各ルートを検証し、`module: () => import("...")` を持つルートに
// エクスポート名の一覧 `_ex` を追加する。

use std::path::Path;

use swc_common::{DUMMY_SP, SourceMap, Span, Spanned};
use swc_ecma_ast::*;
use tracing::debug;

use crate::error::{ChildrenShape, CompileError};
use crate::exports::ExtractionCache;
use crate::model::{ExportNameSet, SourceLocation};
use crate::parser::location_of;
use crate::resolver::resolve_route_module;

/// ルートに付与するエクスポート一覧のプロパティ名
pub const EXPORTS_KEY: &str = "_ex";

const CHILDREN_KEY: &str = "children";
const MODULE_KEY: &str = "module";

/// ルート配列の変換器
///
/// 1 回のコンパイル (1 ファイル) の間だけ生きる。
pub struct RouteTransformer<'a> {
    cm: &'a SourceMap,
    file_path: &'a Path,
    project_root: &'a Path,
    cache: &'a mut ExtractionCache,
}

impl<'a> RouteTransformer<'a> {
    pub fn new(
        cm: &'a SourceMap,
        file_path: &'a Path,
        project_root: &'a Path,
        cache: &'a mut ExtractionCache,
    ) -> Self {
        RouteTransformer {
            cm,
            file_path,
            project_root,
            cache,
        }
    }

    /// ルート配列 (と、その `children` 以下すべて) を変換する
    ///
    /// 再帰の代わりに作業リストで階層をたどる。各階層は兄弟順に処理され、
    /// 最初のエラーで中断する。
    pub fn transform(&mut self, routes: &mut ArrayLit) -> Result<(), CompileError> {
        let mut pending: Vec<&mut ArrayLit> = vec![routes];
        let mut transformed = 0usize;

        while let Some(array) = pending.pop() {
            let array_span = array.span;
            let mut nested = Vec::new();

            for elem in array.elems.iter_mut() {
                let route = match elem {
                    Some(ExprOrSpread { spread: None, expr }) => match &mut **expr {
                        Expr::Object(route) => route,
                        other => return Err(self.invalid_route(other.span())),
                    },
                    Some(ExprOrSpread {
                        spread: Some(dots), ..
                    }) => return Err(self.invalid_route(*dots)),
                    // `[a, , b]` の穴
                    None => return Err(self.invalid_route(array_span)),
                };

                nested.extend(self.transform_route(route)?);
                transformed += 1;
            }

            // 先頭の兄弟の子から処理されるよう逆順で積む
            pending.extend(nested.into_iter().rev());
        }

        debug!(file = %self.file_path.display(), routes = transformed, "ルート変換完了");
        Ok(())
    }

    /// ルート 1 件を検証・変換し、下の階層の `children` 配列を返す
    fn transform_route<'r>(
        &mut self,
        route: &'r mut ObjectLit,
    ) -> Result<Vec<&'r mut ArrayLit>, CompileError> {
        // 1) プロパティを名前で分類 (children の形もここで検証)
        let mut module_prop = None;
        for prop in &route.props {
            let PropOrSpread::Prop(prop) = prop else {
                continue;
            };
            match prop_name(prop) {
                Some(CHILDREN_KEY) => self.check_children(prop)?,
                Some(MODULE_KEY) if module_prop.is_none() => module_prop = Some(&**prop),
                _ => {}
            }
        }

        // 2) module があればエクスポートを調べる
        let exports = match module_prop {
            Some(prop) => Some(self.module_exports(prop)?),
            None => None,
        };

        // 3) `_ex` は元のプロパティの後ろに追加
        if let Some(names) = exports {
            route.props.push(export_metadata(&names));
        }

        // 4) 子ルートの配列を次の作業として返す
        let children = route
            .props
            .iter_mut()
            .filter_map(|prop| match prop {
                PropOrSpread::Prop(prop) => match &mut **prop {
                    Prop::KeyValue(kv) if key_name(&kv.key) == Some(CHILDREN_KEY) => {
                        match &mut *kv.value {
                            Expr::Array(children) => Some(children),
                            _ => None,
                        }
                    }
                    _ => None,
                },
                PropOrSpread::Spread(_) => None,
            })
            .collect();

        Ok(children)
    }

    fn check_children(&self, prop: &Prop) -> Result<(), CompileError> {
        match prop {
            Prop::KeyValue(KeyValueProp { value, .. }) => match &**value {
                Expr::Array(_) => Ok(()),
                other => Err(CompileError::InvalidChildrenShape {
                    location: self.location(other.span()),
                    reason: ChildrenShape::NotArrayLiteral,
                }),
            },
            other => Err(CompileError::InvalidChildrenShape {
                location: self.location(other.span()),
                reason: ChildrenShape::NotAssignment,
            }),
        }
    }

    /// `module` プロパティの参照先を解析してエクスポート名を得る
    fn module_exports(&mut self, prop: &Prop) -> Result<ExportNameSet, CompileError> {
        let specifier = deferred_import(prop).map_err(|span| CompileError::InvalidModuleShape {
            location: self.location(span),
        })?;
        let specifier = specifier.value.to_string();

        let resolved = resolve_route_module(&specifier, self.file_path, self.project_root);
        debug!(module = %specifier, resolved = %resolved.display(), "ルートモジュールを解析");

        self.cache
            .exports_of(&resolved, self.project_root)
            .map_err(|source| CompileError::ExportExtractionFailed {
                location: self.location(prop.span()),
                module: specifier,
                source,
            })
    }

    fn invalid_route(&self, span: Span) -> CompileError {
        CompileError::InvalidRouteShape {
            location: self.location(span),
        }
    }

    fn location(&self, span: Span) -> SourceLocation {
        location_of(self.cm, self.file_path, span)
    }
}

/// `() => import("./path")` の文字列リテラルを取り出す
///
/// 形が違う場合は、最も具体的に指せるノードの span を返す
/// (import の引数 → 呼び出し → アロー本体・関数本体 → プロパティの値)。
fn deferred_import(prop: &Prop) -> Result<&Str, Span> {
    let Prop::KeyValue(KeyValueProp { value, .. }) = prop else {
        return Err(prop.span());
    };
    let arrow = match &**value {
        Expr::Arrow(arrow) => arrow,
        // function 式は本体のブロックを指す
        Expr::Fn(fn_expr) => {
            return Err(fn_expr
                .function
                .body
                .as_ref()
                .map_or(fn_expr.function.span, |body| body.span));
        }
        other => return Err(other.span()),
    };
    let BlockStmtOrExpr::Expr(body) = &*arrow.body else {
        return Err(arrow.body.span());
    };
    let Expr::Call(call) = &**body else {
        return Err(body.span());
    };

    let well_formed = !arrow.is_async
        && !arrow.is_generator
        && arrow.params.is_empty()
        && matches!(call.callee, Callee::Import(_))
        && call.args.len() == 1;

    match call.args.first() {
        Some(ExprOrSpread { spread: None, expr }) if well_formed => match &**expr {
            Expr::Lit(Lit::Str(specifier)) => Ok(specifier),
            other => Err(other.span()),
        },
        Some(arg) => Err(arg.expr.span()),
        None => Err(call.span),
    }
}

/// プロパティ名 (識別子か文字列キーのみ。計算キーは名前なし扱い)
fn prop_name(prop: &Prop) -> Option<&str> {
    match prop {
        Prop::KeyValue(kv) => key_name(&kv.key),
        Prop::Shorthand(ident) => Some(&ident.sym),
        Prop::Assign(assign) => Some(&assign.key.sym),
        Prop::Getter(getter) => key_name(&getter.key),
        Prop::Setter(setter) => key_name(&setter.key),
        Prop::Method(method) => key_name(&method.key),
    }
}

fn key_name(key: &PropName) -> Option<&str> {
    match key {
        PropName::Ident(ident) => Some(&ident.sym),
        PropName::Str(s) => Some(&s.value),
        _ => None,
    }
}

/// `_ex: ["loader", "default"]` を作る
fn export_metadata(names: &[String]) -> PropOrSpread {
    let elems = names
        .iter()
        .map(|name| {
            Some(ExprOrSpread {
                spread: None,
                expr: Box::new(Expr::Lit(Lit::Str(Str {
                    span: DUMMY_SP,
                    value: name.as_str().into(),
                    raw: None,
                }))),
            })
        })
        .collect();

    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
        key: PropName::Ident(Ident::new(EXPORTS_KEY.into(), DUMMY_SP)),
        value: Box::new(Expr::Array(ArrayLit {
            span: DUMMY_SP,
            elems,
        })),
    })))
}
