//! Lint configuration.

use std::path::Path;

use serde::Deserialize;

/// Default configuration file names to search for.
const DEFAULT_CONF_NAMES: &[&str] = &["ips-lint.yaml", ".ips-lint.yaml"];

/// Parameter names too generic for the rename check to be a useful signal.
const DEFAULT_RENAME_IGNORED: &[&str] = &["val", "value", "data", "arg"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Conf {
    /// Flag hook parameters whose names drifted from the base method's.
    pub check_renames: bool,
    /// Names exempt from the rename check, on either side.
    pub rename_ignored_names: Vec<String>,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            check_renames: true,
            rename_ignored_names: DEFAULT_RENAME_IGNORED
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Conf {
    /// Load configuration from an explicit file, or from the first default
    /// file name that exists, or fall back to the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => DEFAULT_CONF_NAMES
                .iter()
                .map(Path::new)
                .find(|p| p.exists())
                .map(Path::to_path_buf),
        };
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                let conf = serde_yaml::from_str(&contents)?;
                Ok(conf)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn is_rename_ignored(&self, name: &str) -> bool {
        self.rename_ignored_names.iter().any(|n| n == name)
    }
}
