// src/config.rs
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::resolver::find_with_extensions;

/// `app/routes.*` を探すときの拡張子 (この順で探す)
const ROUTES_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// package.json のうち、このツールが読む部分
#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(rename = "rr-bundler", default)]
    bundler: BundlerSection,
}

#[derive(Debug, Default, Deserialize)]
struct BundlerSection {
    /// ルートファイルのパス (プロジェクトルート基準)
    routes: Option<PathBuf>,
}

/// プロジェクト設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project_root: PathBuf,
    /// 変換対象のルートファイル (絶対パス)
    pub routes: PathBuf,
}

impl ProjectConfig {
    /// `<project_root>/package.json` を読み、ルートファイルを決める
    ///
    /// 1) `"rr-bundler".routes` があればそれを使う
    /// 2) なければ `app/routes.{tsx,ts,jsx,js}` を探す
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let package_json_path = project_root.join("package.json");
        let raw = fs::read_to_string(&package_json_path).map_err(|source| ConfigError::Io {
            path: package_json_path.clone(),
            source,
        })?;
        let pkg: PackageJson = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: package_json_path.clone(),
            source,
        })?;

        let routes = match pkg.bundler.routes {
            Some(routes) => absolutize(&routes, project_root),
            None => find_with_extensions(&project_root.join("app").join("routes"), ROUTES_EXTENSIONS)
                .ok_or(ConfigError::RoutesNotFound)?,
        };
        debug!(routes = %routes.display(), "ルートファイルを決定");

        Ok(ProjectConfig {
            project_root: project_root.to_path_buf(),
            routes,
        })
    }

    /// package.json を読まずにルートファイルを直接指定する
    pub fn with_routes(project_root: &Path, routes: &Path) -> Self {
        ProjectConfig {
            project_root: project_root.to_path_buf(),
            routes: absolutize(routes, project_root),
        }
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    path.absolutize_from(cwd)
        .map(|abs| abs.to_path_buf())
        .unwrap_or_else(|_| cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn uses_configured_routes_path() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "package.json",
            r#"{ "name": "app", "rr-bundler": { "routes": "./src/my-routes.tsx", "browser": {} } }"#,
        );

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.routes, dir.path().join("src/my-routes.tsx"));
        assert_eq!(config.project_root, dir.path());
    }

    #[test]
    fn finds_app_routes_by_extension_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "package.json", r#"{ "name": "app" }"#);
        write(&dir, "app/routes.js", "");
        let ts = write(&dir, "app/routes.ts", "");

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.routes, ts);
    }

    #[test]
    fn missing_routes_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "package.json", "{}");
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(ConfigError::RoutesNotFound)
        ));
    }

    #[test]
    fn invalid_package_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "package.json", "{ not json");
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn explicit_routes_are_relative_to_root() {
        let config = ProjectConfig::with_routes(Path::new("/proj"), Path::new("app/routes.ts"));
        assert_eq!(config.routes, PathBuf::from("/proj/app/routes.ts"));
    }
}
