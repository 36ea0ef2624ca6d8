use dashmap::DashMap;
use log::trace;
use path_clean::clean;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::types::{Ecosystem, SpecKind, Specifier};

/// Resolves specifiers to files inside a project.
///
/// One resolver belongs to one analyzer within one scan; its cache is keyed by
/// `(importing file, request)` and dies with it.
#[derive(Debug)]
pub struct Resolver {
    alias_prefix: String,
    extensions: &'static [&'static str],
    cache: DashMap<(PathBuf, String), Option<PathBuf>>,
}

impl Resolver {
    pub fn new(alias_prefix: impl Into<String>, extensions: &'static [&'static str]) -> Self {
        Self { alias_prefix: alias_prefix.into(), extensions, cache: DashMap::new() }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    /// Resolves any extracted specifier, dispatching module paths of other
    /// ecosystems to their own lookup rules.
    pub fn resolve_specifier(
        &self,
        spec: &Specifier,
        from_file: &Path,
        project_root: &Path,
        tsconfig_paths: &HashMap<String, Vec<String>>,
    ) -> Option<PathBuf> {
        match spec.kind {
            SpecKind::Module(ecosystem) => {
                resolve_module(&spec.request, ecosystem, from_file, project_root)
            }
            _ => self.resolve(&spec.request, from_file, project_root, tsconfig_paths),
        }
    }

    pub fn resolve(
        &self,
        request: &str,
        from_file: &Path,
        project_root: &Path,
        tsconfig_paths: &HashMap<String, Vec<String>>,
    ) -> Option<PathBuf> {
        let key = (from_file.to_path_buf(), request.to_string());
        if let Some(v) = self.cache.get(&key) {
            trace!("Cache hit for resolve: '{}' from {}", request, from_file.display());
            return v.clone();
        }

        let resolved = self.resolve_uncached(request, from_file, project_root, tsconfig_paths);
        match &resolved {
            Some(p) => trace!("Resolved '{}' to {}", request, p.display()),
            None => trace!("Could not resolve '{}' from {}", request, from_file.display()),
        }
        self.cache.insert(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(
        &self,
        request: &str,
        from_file: &Path,
        project_root: &Path,
        tsconfig_paths: &HashMap<String, Vec<String>>,
    ) -> Option<PathBuf> {
        // Longest tsconfig alias first so `@app/ui` beats `@app`
        let mut aliases: Vec<&String> = tsconfig_paths
            .keys()
            .filter(|alias| request == alias.as_str() || request.starts_with(&format!("{}/", alias)))
            .collect();
        aliases.sort_by_key(|alias| std::cmp::Reverse(alias.len()));
        for alias in aliases {
            let remainder = request[alias.len()..].trim_start_matches('/');
            for target in &tsconfig_paths[alias] {
                let base = if remainder.is_empty() {
                    PathBuf::from(target)
                } else {
                    PathBuf::from(target).join(remainder)
                };
                if let Some(found) = self.probe(&base) {
                    trace!("Resolved tsconfig alias '{}' for '{}'", alias, request);
                    return Some(found);
                }
            }
        }

        let base = if !self.alias_prefix.is_empty() && request.starts_with(&self.alias_prefix) {
            source_root(project_root).join(&request[self.alias_prefix.len()..])
        } else if request.starts_with('.') {
            from_file.parent().unwrap_or(project_root).join(request)
        } else if let Some(stripped) = request.strip_prefix('/') {
            project_root.join(stripped)
        } else {
            project_root.join("src").join(request)
        };

        self.probe(&clean(base))
    }

    /// Extension variants first, then the bare path, then index files.
    fn probe(&self, base: &Path) -> Option<PathBuf> {
        let base = clean(base);
        for ext in self.extensions {
            let candidate = PathBuf::from(format!("{}.{}", base.display(), ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if base.is_file() {
            return Some(base);
        }

        for ext in self.extensions {
            let candidate = base.join(format!("index.{}", ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        None
    }
}

/// `<root>/src` when it exists, otherwise the root itself.
pub fn source_root(project_root: &Path) -> PathBuf {
    let src = project_root.join("src");
    if src.is_dir() { src } else { project_root.to_path_buf() }
}

/// Maps a module path of a non-JS ecosystem onto the conventional file layout.
pub fn resolve_module(
    request: &str,
    ecosystem: Ecosystem,
    from_file: &Path,
    project_root: &Path,
) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = match ecosystem {
        Ecosystem::Python => {
            let rel = request.replace('.', "/");
            vec![
                project_root.join(format!("{}.py", rel)),
                project_root.join(&rel).join("__init__.py"),
                project_root.join("src").join(format!("{}.py", rel)),
                from_file.parent().unwrap_or(project_root).join(format!("{}.py", rel)),
            ]
        }
        Ecosystem::Java => {
            if request.ends_with('*') {
                return None;
            }
            let rel = format!("{}.java", request.replace('.', "/"));
            vec![
                project_root.join("src/main/java").join(&rel),
                project_root.join("src").join(&rel),
                project_root.join(&rel),
            ]
        }
        Ecosystem::Php => {
            let rel = request.replace('\\', "/");
            // PSR-4: the vendor namespace usually maps onto src/ or app/
            let without_ns = rel.split_once('/').map(|(_, rest)| rest.to_string());
            let mut c = vec![project_root.join(format!("{}.php", rel))];
            if let Some(rest) = without_ns {
                c.push(project_root.join("src").join(format!("{}.php", rest)));
                c.push(project_root.join("app").join(format!("{}.php", rest)));
            }
            c
        }
        Ecosystem::Ruby => {
            let dir = from_file.parent().unwrap_or(project_root);
            let rel = if request.ends_with(".rb") {
                request.to_string()
            } else {
                format!("{}.rb", request)
            };
            vec![dir.join(rel)]
        }
        _ => return None,
    };

    candidates.into_iter().map(clean).find(|c| c.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BACKEND_EXTENSIONS, COMPONENT_EXTENSIONS};
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn no_aliases() -> HashMap<String, Vec<String>> {
        HashMap::new()
    }

    #[test]
    fn test_relative_import() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/pages/index.tsx", "");
        let target = create_test_file(root, "src/components/Button.tsx", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        let resolved = resolver.resolve("../components/Button", &from, root, &no_aliases());
        assert_eq!(resolved, Some(target));
    }

    #[test]
    fn test_extension_precedence_is_fixed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/index.js", "");
        create_test_file(root, "src/Button.js", "");
        create_test_file(root, "src/Button.jsx", "");
        let tsx = create_test_file(root, "src/Button.tsx", "");
        create_test_file(root, "src/Button.ts", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("./Button", &from, root, &no_aliases()), Some(tsx));
    }

    #[test]
    fn test_backend_precedence_prefers_ts_over_js() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "index.js", "");
        create_test_file(root, "db.js", "");
        let ts = create_test_file(root, "db.ts", "");

        let resolver = Resolver::new("@/", BACKEND_EXTENSIONS);
        assert_eq!(resolver.resolve("./db", &from, root, &no_aliases()), Some(ts));
    }

    #[test]
    fn test_index_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/app.ts", "");
        create_test_file(root, "src/lib/index.js", "");
        let index_ts = create_test_file(root, "src/lib/index.ts", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("./lib", &from, root, &no_aliases()), Some(index_ts));
    }

    #[test]
    fn test_sibling_file_wins_over_index() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/app.ts", "");
        let file = create_test_file(root, "src/lib.js", "");
        create_test_file(root, "src/lib/index.tsx", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("./lib", &from, root, &no_aliases()), Some(file));
    }

    #[test]
    fn test_alias_resolves_against_src() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/app/page.tsx", "");
        let target = create_test_file(root, "src/lib/db.ts", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("@/lib/db", &from, root, &no_aliases()), Some(target));
    }

    #[test]
    fn test_alias_without_src_dir_uses_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "app/page.tsx", "");
        let target = create_test_file(root, "lib/db.ts", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("@/lib/db", &from, root, &no_aliases()), Some(target));
    }

    #[test]
    fn test_root_absolute_import() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "routes/users.js", "");
        let target = create_test_file(root, "models/user.js", "");

        let resolver = Resolver::new("@/", BACKEND_EXTENSIONS);
        assert_eq!(resolver.resolve("/models/user", &from, root, &no_aliases()), Some(target));
    }

    #[test]
    fn test_explicit_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/app.tsx", "");
        let css = create_test_file(root, "src/app.css", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("./app.css", &from, root, &no_aliases()), Some(css));
    }

    #[test]
    fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/app.ts", "");

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("./missing", &from, root, &no_aliases()), None);
        // Negative results are cached too
        assert_eq!(resolver.cache.len(), 1);
    }

    #[test]
    fn test_tsconfig_alias() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/app.ts", "");
        let target = create_test_file(root, "packages/ui/Button.tsx", "");

        let mut aliases = HashMap::new();
        aliases.insert(
            "@ui".to_string(),
            vec![root.join("packages/ui").to_string_lossy().to_string()],
        );

        let resolver = Resolver::new("@/", COMPONENT_EXTENSIONS);
        assert_eq!(resolver.resolve("@ui/Button", &from, root, &aliases), Some(target));
    }

    #[test]
    fn test_python_module() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "main.py", "");
        let models = create_test_file(root, "app/models.py", "");
        let pkg = create_test_file(root, "app/utils/__init__.py", "");

        assert_eq!(resolve_module("app.models", Ecosystem::Python, &from, root), Some(models));
        assert_eq!(resolve_module("app.utils", Ecosystem::Python, &from, root), Some(pkg));
        assert_eq!(resolve_module("os.path", Ecosystem::Python, &from, root), None);
    }

    #[test]
    fn test_java_module() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "src/main/java/com/acme/App.java", "");
        let user = create_test_file(root, "src/main/java/com/acme/model/User.java", "");

        assert_eq!(resolve_module("com.acme.model.User", Ecosystem::Java, &from, root), Some(user));
        assert_eq!(resolve_module("com.acme.model.*", Ecosystem::Java, &from, root), None);
    }

    #[test]
    fn test_php_module_psr4() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "public/index.php", "");
        let user = create_test_file(root, "src/Models/User.php", "");

        assert_eq!(resolve_module("App\\Models\\User", Ecosystem::Php, &from, root), Some(user));
    }

    #[test]
    fn test_ruby_require_relative() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let from = create_test_file(root, "lib/app.rb", "");
        let parser = create_test_file(root, "lib/parser.rb", "");

        assert_eq!(resolve_module("parser", Ecosystem::Ruby, &from, root), Some(parser));
    }
}
