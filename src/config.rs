use std::path::Path;

use crate::error::Error;

/// Name of the optional project configuration file.
pub const CONFIG_FILE: &str = ".linkmend.toml";

/// Project configuration loaded from `.linkmend.toml`.
/// Include/exclude patterns are path prefixes applied to documents found by
/// directory traversal, relative to the scanned directory.
#[derive(Debug)]
pub struct Config {
    /// Prefixes a document must skip.
    exclude: Vec<String>,
    /// Prefixes a document must start with, if any are set.
    include: Vec<String>,
    /// Whether to report references to auto-suffixed anchors.
    pub unstable_anchors: bool,
}

/// Raw TOML structure for `.linkmend.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkmendTomlConfig {
    /// Skip documents under these prefixes.
    #[serde(default)]
    exclude: Vec<String>,
    /// Only documents under these prefixes.
    #[serde(default)]
    include: Vec<String>,
    /// Emit unstable-anchor advisories.
    #[serde(default = "default_unstable_anchors")]
    unstable_anchors: bool,
}

/// Advisories are on unless the user turns them off.
const fn default_unstable_anchors() -> bool {
    return true;
}

impl Default for Config {
    /// Check everything, exclude nothing, report unstable anchors.
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            include: Vec::new(),
            unstable_anchors: true,
        };
    }
}

impl Config {
    /// Load config from `.linkmend.toml` in the given directory.
    /// Returns the default if the file doesn't exist, and an error if it
    /// exists but is malformed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::from_toml(&content);
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let raw: LinkmendTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            unstable_anchors: raw.unstable_anchors,
        });
    }

    /// Check whether a document path should be processed.
    ///
    /// A path is included if no include patterns are set, or if it starts
    /// with at least one include pattern. An included path is then excluded
    /// if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_scans_everything() {
        let config = Config::from_toml("").unwrap();
        assert!(config.should_scan("docs/a.md"));
        assert!(config.unstable_anchors);
    }

    #[test]
    fn exclude_overrides_include() {
        let config = Config::from_toml(
            "include = [\"docs/\"]\nexclude = [\"docs/archive/\"]\nunstable_anchors = false\n",
        )
        .unwrap();
        assert!(config.should_scan("docs/guide.md"));
        assert!(!config.should_scan("docs/archive/old.md"));
        assert!(!config.should_scan("README.md"));
        assert!(!config.unstable_anchors);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(Config::from_toml("include = 3"), Err(Error::TomlDe(_))));
        assert!(matches!(Config::from_toml("colour = true"), Err(Error::TomlDe(_))));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::Builder::new().prefix("linkmend").tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.should_scan("anything.md"));
    }
}
