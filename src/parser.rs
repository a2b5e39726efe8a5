// src/parser.rs
//
// SWC を使ったパース・束縛解決・再出力のアダプタ。
// ルート変換そのものはここでは扱わない。

use std::path::Path;

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use swc_common::{
    BytePos, FileName, LineCol, Mark, SourceMap, Span, Spanned, comments::Comments,
    source_map::SourceMapGenConfig, sync::Lrc,
};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_codegen::{Emitter, text_writer::JsWriter};
use swc_ecma_parser::{EsConfig, Parser as SwcParser, StringInput, Syntax, TsConfig, lexer::Lexer};
use swc_ecma_transforms_base::resolver;
use swc_ecma_visit::VisitMutWith;

use crate::model::SourceLocation;

/// パースに失敗したときの情報 (呼び出し側でエラー種別に変換する)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub location: SourceLocation,
    pub message: String,
}

/// TypeScript として扱う拡張子かどうか
pub fn is_typescript(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("ts" | "tsx" | "mts" | "cts")
    )
}

/// 拡張子から構文設定を決める
///
/// `.js` でも JSX を許可する (バンドラの既定ローダと同じ挙動)。
pub fn syntax_for(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts" | "mts" | "cts") => Syntax::Typescript(TsConfig {
            tsx: false,
            decorators: true,
            ..Default::default()
        }),
        Some("tsx") => Syntax::Typescript(TsConfig {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
        _ => Syntax::Es(EsConfig {
            jsx: true,
            ..Default::default()
        }),
    }
}

/// ソース文字列を ES モジュールとしてパースする
///
/// 回復可能なエラーも失敗として扱う。最初の 1 件だけを返す。
pub fn parse_module(
    cm: &Lrc<SourceMap>,
    file_path: &Path,
    src: String,
    comments: Option<&dyn Comments>,
) -> Result<Module, ParseFailure> {
    let fm = cm.new_source_file(FileName::Real(file_path.to_path_buf()), src);

    let lexer = Lexer::new(
        syntax_for(file_path),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        comments,
    );
    let mut parser = SwcParser::new_from(lexer);

    let module = parser.parse_module().map_err(|err| ParseFailure {
        location: location_of(cm, file_path, err.span()),
        message: err.kind().msg().into_owned(),
    })?;

    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(ParseFailure {
            location: location_of(cm, file_path, err.span()),
            message: err.kind().msg().into_owned(),
        });
    }

    Ok(module)
}

/// 識別子に束縛情報 (SyntaxContext) を付ける
///
/// `swc_common::GLOBALS` のスコープ内で呼ぶこと。
pub fn resolve_bindings(module: &mut Module, typescript: bool) {
    let unresolved_mark = Mark::new();
    let top_level_mark = Mark::new();
    module.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, typescript));
}

/// span の開始位置を 0 始まりの行・列に変換する
pub fn location_of(cm: &SourceMap, file_path: &Path, span: Span) -> SourceLocation {
    let loc = cm.lookup_char_pos(span.lo);
    SourceLocation::new(
        file_path,
        loc.line.saturating_sub(1) as u32,
        loc.col.0 as u32,
    )
}

/// source map の `sources` をプロジェクトルートからの相対パスにする
struct ProjectRelativeSources<'a> {
    project_root: &'a Path,
}

impl SourceMapGenConfig for ProjectRelativeSources<'_> {
    fn file_name_to_source(&self, f: &FileName) -> String {
        match f {
            FileName::Real(path) => path
                .strip_prefix(self.project_root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/"),
            other => other.to_string(),
        }
    }
}

/// モジュールを文字列に出力する
///
/// `source_map_root` を渡すと、インライン source map を末尾に付ける。
pub fn print_module(
    cm: &Lrc<SourceMap>,
    module: &Module,
    comments: Option<&dyn Comments>,
    source_map_root: Option<&Path>,
) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let mut mappings: Vec<(BytePos, LineCol)> = Vec::new();

    {
        let srcmap = source_map_root.is_some().then_some(&mut mappings);
        let wr = JsWriter::new(cm.clone(), "\n", &mut buf, srcmap);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default(),
            cm: cm.clone(),
            comments,
            wr,
        };
        emitter
            .emit_module(module)
            .context("failed to print the transformed module")?;
    }

    let mut code = String::from_utf8(buf).context("printed module is not valid UTF-8")?;

    if let Some(project_root) = source_map_root {
        let map = cm.build_source_map_with_config(
            &mut mappings,
            None,
            ProjectRelativeSources { project_root },
        );
        let mut json = Vec::new();
        map.to_writer(&mut json)
            .context("failed to serialize the source map")?;

        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("//# sourceMappingURL=data:application/json;base64,");
        code.push_str(&STANDARD.encode(json));
        code.push('\n');
    }

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::comments::SingleThreadedComments;

    fn parse(path: &str, src: &str) -> (Lrc<SourceMap>, Result<Module, ParseFailure>) {
        let cm: Lrc<SourceMap> = Default::default();
        let result = parse_module(&cm, Path::new(path), src.to_string(), None);
        (cm, result)
    }

    #[test]
    fn chooses_syntax_by_extension() {
        assert!(matches!(
            syntax_for(Path::new("routes.tsx")),
            Syntax::Typescript(TsConfig { tsx: true, .. })
        ));
        assert!(matches!(
            syntax_for(Path::new("routes.ts")),
            Syntax::Typescript(TsConfig { tsx: false, .. })
        ));
        assert!(matches!(
            syntax_for(Path::new("routes.js")),
            Syntax::Es(EsConfig { jsx: true, .. })
        ));
        assert!(is_typescript(Path::new("a.mts")));
        assert!(!is_typescript(Path::new("a.jsx")));
    }

    #[test]
    fn parses_typescript_with_types() {
        let (_, result) = parse("routes.ts", "const a: number = 1;\nexport { a };\n");
        assert_eq!(result.unwrap().body.len(), 2);
    }

    #[test]
    fn reports_zero_based_location_of_syntax_error() {
        let (_, result) = parse("/app/routes.ts", "const ok = 1;\nconst = ;\n");
        let failure = result.unwrap_err();
        assert_eq!(failure.location.file, "/app/routes.ts");
        assert_eq!(failure.location.line, 1);
        assert!(!failure.message.is_empty());
    }

    #[test]
    fn prints_without_source_map_by_default() {
        let cm: Lrc<SourceMap> = Default::default();
        let comments = SingleThreadedComments::default();
        let module = parse_module(
            &cm,
            Path::new("/app/routes.js"),
            "// keep me\nexport const a = 1;\n".to_string(),
            Some(&comments),
        )
        .unwrap();

        let code = print_module(&cm, &module, Some(&comments), None).unwrap();
        assert!(code.contains("// keep me"));
        assert!(code.contains("export const a = 1;"));
        assert!(!code.contains("sourceMappingURL"));
    }

    #[test]
    fn appends_inline_source_map_relative_to_root() {
        let cm: Lrc<SourceMap> = Default::default();
        let module = parse_module(
            &cm,
            Path::new("/app/src/routes.js"),
            "export const a = 1;\n".to_string(),
            None,
        )
        .unwrap();

        let code = print_module(&cm, &module, None, Some(Path::new("/app"))).unwrap();
        let (_, encoded) = code
            .trim_end()
            .rsplit_once("base64,")
            .expect("inline source map trailer");
        let map: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(map["sources"][0], "src/routes.js");
    }
}
