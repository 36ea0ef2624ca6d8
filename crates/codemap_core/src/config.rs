use anyhow::{Context, Result, anyhow};
use log::{debug, trace};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    env, fs,
    path::{Path, PathBuf},
};

pub fn find_git_root() -> Result<PathBuf> {
    debug!("Searching for git root");
    let mut current_dir = env::current_dir()?;
    trace!("Starting search from: {:?}", current_dir);

    loop {
        let git_dir = current_dir.join(".git");
        trace!("Checking for .git at: {:?}", git_dir);
        if git_dir.exists() {
            debug!("Found git root at: {:?}", current_dir);
            return Ok(current_dir);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                debug!("Could not find .git directory in any parent folder");
                return Err(anyhow!("Could not find .git directory in any parent folder"));
            }
        }
    }
}

/// The parts of `package.json` the analyzers look at.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,
}

impl PackageManifest {
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    pub fn has_any_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

pub fn read_manifest(project_root: &Path) -> Result<PackageManifest> {
    let path = project_root.join("package.json");
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let manifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(manifest)
}

/// Cuts a trailing `//` comment, leaving `//` inside string values alone.
fn strip_line_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    let mut prev_slash = false;
    for (idx, c) in line.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                prev_slash = false;
            }
            '/' if prev_slash => return &line[..idx - 1],
            '/' => prev_slash = true,
            _ => prev_slash = false,
        }
    }
    line
}

/// Loads `compilerOptions.paths` from the project's `tsconfig.json` (or
/// `jsconfig.json`), with alias keys and targets stripped of their `/*` glob.
///
/// Targets are absolute, anchored at `baseUrl`.
pub fn read_tsconfig_paths(project_root: &Path) -> HashMap<String, Vec<String>> {
    let mut paths = HashMap::new();

    for name in ["tsconfig.json", "jsconfig.json"] {
        let config_path = project_root.join(name);
        let Ok(content) = fs::read_to_string(&config_path) else {
            continue;
        };
        trace!("Found {} at: {:?}", name, config_path);

        let content_no_comments: String = content
            .lines()
            .map(strip_line_comment)
            .collect::<Vec<_>>()
            .join("\n");

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&content_no_comments)
            && let Some(compiler_options) = json.get("compilerOptions")
            && let Some(paths_obj) = compiler_options.get("paths").and_then(|p| p.as_object())
        {
            let base_url = compiler_options.get("baseUrl").and_then(|b| b.as_str()).unwrap_or(".");
            let base_path = project_root.join(base_url);

            for (alias, targets) in paths_obj {
                let Some(target_arr) = targets.as_array() else {
                    continue;
                };
                let resolved_targets: Vec<String> = target_arr
                    .iter()
                    .filter_map(|t| t.as_str())
                    .map(|t| {
                        path_clean::clean(base_path.join(t.trim_end_matches("/*")))
                            .to_string_lossy()
                            .to_string()
                    })
                    .collect();

                if !resolved_targets.is_empty() {
                    let alias_key = alias.trim_end_matches("/*").to_string();
                    trace!("Found path alias: '{}' -> {:?}", alias_key, resolved_targets);
                    paths.entry(alias_key).or_insert(resolved_targets);
                }
            }
        }
    }

    debug!("Loaded {} path aliases for {}", paths.len(), project_root.display());
    paths
}
