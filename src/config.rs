//! Process-wide configuration, threaded explicitly through every call rather
//! than living as statics.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use getset::Getters;
use serde::Deserialize;

/// Output-directory constants and the build-file name, threaded as an
/// immutable value rather than living as process-wide statics. Each
/// `buck-out` subdirectory is independently overridable (`buck.buck_android_dir`,
/// `buck.buck_gen_dir`, `buck.buck_bin_dir`, `buck.buck_annotation_dir`); the
/// core itself never reads or writes under these paths, it only hands them to
/// downstream collaborators that do.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct Config {
    build_rules_file_name: String,
    output_android_dir: PathBuf,
    output_gen_dir: PathBuf,
    output_bin_dir: PathBuf,
    output_annotation_dir: PathBuf,
}

impl Config {
    /// A default config with `build_rules_file_name` overridden, for callers
    /// (such as the CLI) that accept the build-file name as an argument and
    /// must keep every collaborator that derives build-file paths consistent
    /// with it.
    pub fn with_build_rules_file_name(build_rules_file_name: impl Into<String>) -> Self {
        Config {
            build_rules_file_name: build_rules_file_name.into(),
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            build_rules_file_name: "BUCK".to_string(),
            output_android_dir: PathBuf::from("buck-out/android"),
            output_gen_dir: PathBuf::from("buck-out/gen"),
            output_bin_dir: PathBuf::from("buck-out/bin"),
            output_annotation_dir: PathBuf::from("buck-out/annotation"),
        }
    }
}

/// `aliases.toml`: `alias_name = "fully:qualified:target"`, deserialized
/// straight out of TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasMap {
    #[serde(flatten)]
    aliases: HashMap<String, String>,
}

impl AliasMap {
    pub fn empty() -> Self {
        AliasMap {
            aliases: HashMap::new(),
        }
    }

    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading alias map at {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing alias map at {}", path.display()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_uses_buck_out_conventions() {
        let config = Config::default();
        assert_eq!(config.build_rules_file_name(), "BUCK");
        assert_eq!(config.output_gen_dir(), &PathBuf::from("buck-out/gen"));
        assert_eq!(config.output_android_dir(), &PathBuf::from("buck-out/android"));
        assert_eq!(config.output_bin_dir(), &PathBuf::from("buck-out/bin"));
        assert_eq!(config.output_annotation_dir(), &PathBuf::from("buck-out/annotation"));
    }

    #[test]
    fn with_build_rules_file_name_overrides_only_that_field() {
        let config = Config::with_build_rules_file_name("TARGETS");
        assert_eq!(config.build_rules_file_name(), "TARGETS");
        assert_eq!(config.output_gen_dir(), &PathBuf::from("buck-out/gen"));
    }

    #[test]
    fn resolves_known_alias() {
        let map: AliasMap = toml::from_str("web = \"//services/web:main\"").unwrap();
        assert_eq!(map.resolve("web"), Some("//services/web:main"));
    }

    #[test]
    fn unknown_alias_resolves_to_none() {
        assert_eq!(AliasMap::empty().resolve("nope"), None);
    }
}
