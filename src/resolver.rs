use path_absolutize::Absolutize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// モジュール解決で試す拡張子 (バンドラの既定と同じ順)
pub const MODULE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mjs", "cjs"];

/// `module: () => import("...")` の文字列を、参照元ファイルのディレクトリ基準で絶対パス化する。
///
/// - `specifier`: import に渡された文字列 (例: "./routes/about")
/// - `importer`: その式を持つファイルのパス (例: `/proj/app/routes.ts`)
/// - `project_root`: `importer` が相対パスのときの基準
///
/// 拡張子の補完はここでは行わない (`resolve_module_file` の役目)。
/// 戻り値の例: `/proj/app/routes/about`
pub fn resolve_route_module(specifier: &str, importer: &Path, project_root: &Path) -> PathBuf {
    let parent_dir = importer.parent().unwrap_or_else(|| Path::new(""));
    let candidate = parent_dir.join(specifier);
    absolutize(&candidate, project_root)
}

/// 実在するモジュールファイルを探す。
///
/// 1) そのままのパス
/// 2) 拡張子を付けたもの (`MODULE_EXTENSIONS` の順)
/// 3) `.js` 指定を TypeScript ソースに読み替えたもの
/// 4) ディレクトリなら `index.<ext>`
///
/// 相対パスは `project_root` 基準。どれにも該当しなければ None。
pub fn resolve_module_file(module_path: &Path, project_root: &Path) -> Option<PathBuf> {
    let base = absolutize(module_path, project_root);

    if base.is_file() {
        return Some(base);
    }

    if let Some(found) = find_with_extensions(&base, MODULE_EXTENSIONS) {
        return Some(found);
    }

    // import "./about.js" → about.ts / about.tsx
    if matches!(
        base.extension().and_then(|ext| ext.to_str()),
        Some("js" | "jsx")
    ) {
        if let Some(found) = find_with_extensions(&base.with_extension(""), &["ts", "tsx"]) {
            return Some(found);
        }
    }

    if base.is_dir() {
        return find_with_extensions(&base.join("index"), MODULE_EXTENSIONS);
    }

    None
}

/// `base` に各拡張子を付け足して、最初に存在するファイルを返す
///
/// `with_extension` と違い、既存の拡張子 (例: `about.page`) は残したまま付け足す。
pub fn find_with_extensions(base: &Path, extensions: &[&str]) -> Option<PathBuf> {
    extensions.iter().find_map(|ext| {
        let mut name = OsString::from(base.as_os_str());
        name.push(".");
        name.push(ext);
        let candidate = PathBuf::from(name);
        candidate.is_file().then_some(candidate)
    })
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    match path.absolutize_from(cwd) {
        Ok(abs) => abs.to_path_buf(),
        // カレントディレクトリが取れない場合などはそのまま使う
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, rel: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "export {};\n").unwrap();
        path
    }

    #[test]
    fn resolves_specifier_against_importer_directory() {
        let root = Path::new("/proj");
        let resolved = resolve_route_module("./routes/about", Path::new("/proj/app/routes.ts"), root);
        assert_eq!(resolved, PathBuf::from("/proj/app/routes/about"));

        let resolved = resolve_route_module("../shared/home", Path::new("/proj/app/routes.ts"), root);
        assert_eq!(resolved, PathBuf::from("/proj/shared/home"));
    }

    #[test]
    fn relative_importer_is_based_on_project_root() {
        let root = Path::new("/proj");
        let resolved = resolve_route_module("./routes/about", Path::new("app/routes.ts"), root);
        assert_eq!(resolved, PathBuf::from("/proj/app/routes/about"));

        let resolved = resolve_route_module("../shared/home", Path::new("app/routes.ts"), root);
        assert_eq!(resolved, PathBuf::from("/proj/shared/home"));
    }

    #[test]
    fn prefers_exact_file_then_extension_order() {
        let dir = TempDir::new().unwrap();
        let ts = touch(&dir, "app/about.ts");
        let tsx = touch(&dir, "app/about.tsx");

        let base = dir.path().join("app/about");
        assert_eq!(resolve_module_file(&base, dir.path()), Some(tsx));
        assert_eq!(resolve_module_file(&ts, dir.path()), Some(ts.clone()));
    }

    #[test]
    fn keeps_existing_dotted_names() {
        let dir = TempDir::new().unwrap();
        let page = touch(&dir, "app/about.page.tsx");
        assert_eq!(
            resolve_module_file(&dir.path().join("app/about.page"), dir.path()),
            Some(page)
        );
    }

    #[test]
    fn maps_js_specifier_to_typescript_source() {
        let dir = TempDir::new().unwrap();
        let ts = touch(&dir, "app/about.ts");
        assert_eq!(
            resolve_module_file(&dir.path().join("app/about.js"), dir.path()),
            Some(ts)
        );
    }

    #[test]
    fn falls_back_to_directory_index() {
        let dir = TempDir::new().unwrap();
        let index = touch(&dir, "app/dashboard/index.jsx");
        assert_eq!(
            resolve_module_file(Path::new("app/dashboard"), dir.path()),
            Some(index)
        );
    }

    #[test]
    fn missing_module_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_module_file(Path::new("app/nope"), dir.path()), None);
    }
}
