//! IPS resource model and discovery.
//!
//! A resource is a discoverable extension unit of an IPS install: an
//! application or a plugin. Each one yields hooks (from its `hooks.json`
//! manifest, in declared order) and templates (from its `dev/html` tree, in
//! sorted order).

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

/// File extension of raw templates.
const TEMPLATE_EXT: &str = "phtml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Application,
    Plugin,
}

/// An extension unit, identified by its root path. Immutable once
/// constructed; one per discovery pass.
#[derive(Debug, Clone)]
pub struct Resource {
    kind: ResourceKind,
    path: PathBuf,
}

/// A class overlay declared in a resource's manifest.
#[derive(Debug, Clone)]
pub struct Hook {
    pub name: String,
    /// Theme hooks customize presentation only and have no base class.
    pub theme_hook: bool,
    /// Qualified name of the overlaid class.
    pub class: String,
    pub path: PathBuf,
}

/// One manifest entry; `type == "S"` marks a theme hook.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "type")]
    kind: String,
    class: String,
}

impl Resource {
    pub fn new(kind: ResourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name derived from the root path's last segment.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    pub fn hooks_manifest_path(&self) -> PathBuf {
        match self.kind {
            ResourceKind::Application => self.path.join("data/hooks.json"),
            ResourceKind::Plugin => self.path.join("dev/hooks.json"),
        }
    }

    /// Hooks in manifest-declared order. A missing manifest is logged and
    /// yields no hooks.
    pub fn hooks(&self) -> anyhow::Result<Vec<Hook>> {
        let manifest = self.hooks_manifest_path();
        if !manifest.exists() {
            warn!(path = %self.path.display(), "no hooks.json file found");
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&manifest)
            .with_context(|| format!("reading {}", manifest.display()))?;
        // serde_json's preserve_order feature keeps the declared order.
        let entries: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", manifest.display()))?;
        let mut hooks = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let entry: ManifestEntry = serde_json::from_value(value)
                .with_context(|| format!("manifest entry {name} in {}", manifest.display()))?;
            let path = self.path.join("hooks").join(format!("{name}.php"));
            hooks.push(Hook {
                theme_hook: entry.kind == "S",
                class: entry.class,
                name,
                path,
            });
        }
        Ok(hooks)
    }

    /// Raw template files under `dev/html`, in sorted order.
    pub fn templates(&self) -> Vec<PathBuf> {
        let root = self.path.join("dev/html");
        if !root.exists() {
            return Vec::new();
        }
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path().extension().and_then(|x| x.to_str()) == Some(TEMPLATE_EXT)
            })
            .map(|e| e.into_path())
            .collect()
    }
}

/// Locate the IPS install root: the given path if explicit, otherwise a
/// search upward from `near` for a directory containing `init.php`.
pub fn locate_install(explicit: Option<&Path>, near: &Path) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.join("init.php").exists() {
            anyhow::bail!("failed to find init.php in {}", path.display());
        }
        return Ok(path.to_path_buf());
    }
    let mut candidate = near.to_path_buf();
    for _ in 0..3 {
        if candidate.join("init.php").exists() {
            return Ok(candidate);
        }
        if !candidate.pop() {
            break;
        }
    }
    anyhow::bail!("failed to find IPS root path - try specifying it explicitly")
}

/// Recursively discover resources under `path`.
///
/// An install root (containing `init.php`) recurses into `applications/`
/// and `plugins/`; a directory with `Application.php` is an application; a
/// directory with `dev/` is a plugin; a bare `hooks/` directory without a
/// `dev/` tree is skipped. Anything else descends into visible
/// subdirectories.
pub fn find_resources(path: &Path) -> anyhow::Result<Vec<Resource>> {
    if path.join("init.php").exists() {
        let mut resources = find_resources(&path.join("applications"))?;
        resources.extend(find_resources(&path.join("plugins"))?);
        return Ok(resources);
    }
    if path.join("Application.php").exists() {
        return Ok(vec![Resource::new(ResourceKind::Application, path)]);
    }
    if path.join("dev").exists() {
        return Ok(vec![Resource::new(ResourceKind::Plugin, path)]);
    }
    if path.join("hooks").exists() {
        return Ok(Vec::new());
    }

    let mut resources = Vec::new();
    if !path.is_dir() {
        return Ok(resources);
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("reading {}", path.display()))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();
    for entry in entries {
        let hidden = entry
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(true);
        if entry.is_dir() && !hidden {
            resources.extend(find_resources(&entry)?);
        }
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn manifest_order_is_preserved() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("myplugin");
        write(
            &root.join("dev/hooks.json"),
            r#"{
                "zeta": {"type": "C", "class": "\\IPS\\Theme"},
                "alpha": {"type": "S", "class": "\\IPS\\Text\\Parser"},
                "mid": {"type": "C", "class": "\\IPS\\Http\\Url"}
            }"#,
        );
        let resource = Resource::new(ResourceKind::Plugin, &root);
        let hooks = resource.hooks().unwrap();
        let names: Vec<&str> = hooks.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert!(hooks[1].theme_hook);
        assert!(!hooks[0].theme_hook);
        assert_eq!(hooks[2].class, "\\IPS\\Http\\Url");
        assert_eq!(hooks[0].path, root.join("hooks/zeta.php"));
    }

    #[test]
    fn missing_manifest_yields_no_hooks() {
        let temp = tempfile::tempdir().unwrap();
        let resource = Resource::new(ResourceKind::Plugin, temp.path());
        assert!(resource.hooks().unwrap().is_empty());
    }

    #[test]
    fn application_and_plugin_manifest_paths_differ() {
        let app = Resource::new(ResourceKind::Application, "/x/app");
        let plugin = Resource::new(ResourceKind::Plugin, "/x/plug");
        assert_eq!(
            app.hooks_manifest_path(),
            PathBuf::from("/x/app/data/hooks.json")
        );
        assert_eq!(
            plugin.hooks_manifest_path(),
            PathBuf::from("/x/plug/dev/hooks.json")
        );
    }

    #[test]
    fn templates_are_sorted_phtml_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("app");
        write(&root.join("dev/html/b.phtml"), "b");
        write(&root.join("dev/html/sub/c.phtml"), "c");
        write(&root.join("dev/html/a.phtml"), "a");
        write(&root.join("dev/html/notes.txt"), "skip me");
        let resource = Resource::new(ResourceKind::Application, &root);
        let templates = resource.templates();
        let names: Vec<String> = templates
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.phtml", "b.phtml", "c.phtml"]);
    }

    #[test]
    fn discovery_classifies_applications_and_plugins() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(&root.join("init.php"), "<?php");
        write(&root.join("applications/forums/Application.php"), "<?php");
        write(&root.join("plugins/myplugin/dev/hooks.json"), "{}");
        // A hooks/ directory without dev/ is not a valid plugin.
        fs::create_dir_all(root.join("plugins/broken/hooks")).unwrap();

        let resources = find_resources(root).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].kind(), ResourceKind::Application);
        assert_eq!(resources[0].name(), "forums");
        assert_eq!(resources[1].kind(), ResourceKind::Plugin);
        assert_eq!(resources[1].name(), "myplugin");
    }

    #[test]
    fn locate_install_searches_upward() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(&root.join("init.php"), "<?php");
        let nested = root.join("applications/forums");
        fs::create_dir_all(&nested).unwrap();
        let found = locate_install(None, &nested).unwrap();
        assert_eq!(found, root);
        assert!(locate_install(Some(&nested), &nested).is_err());
    }
}
