//! Raw build-file evaluation and the project-wide build-file index — two
//! interfaces the core consumes without knowing their implementation, plus
//! one concrete implementation of each so the crate runs end to end.

use std::collections::BTreeSet;
use std::fs;

use anyhow::bail;
use anyhow::Context;
use getset::Getters;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::paths::BuildFilePath;
use crate::paths::ProjectRoot;
use crate::paths::RelPath;
use crate::util::command_runner::MockableCommandRunner;

/// One rule's raw attribute map as handed back by the external evaluator:
/// `type`/`name`/`buck_base_path` pulled out as required fields, everything
/// else kept opaque for the [`crate::registry::RuleBuilderFactory`] to
/// interpret. `buck_base_path` is the rule's own declared base path (possibly
/// empty, meaning the project root) and may legitimately differ from the
/// directory the declaring build file lives in.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct RawRule {
    rule_type: String,
    name: String,
    buck_base_path: String,
    attrs: Map<String, Value>,
}

impl RawRule {
    pub fn new(
        rule_type: impl Into<String>,
        name: impl Into<String>,
        buck_base_path: impl Into<String>,
        attrs: Map<String, Value>,
    ) -> Self {
        RawRule {
            rule_type: rule_type.into(),
            name: name.into(),
            buck_base_path: buck_base_path.into(),
            attrs,
        }
    }

    /// Reads a string-list attribute (e.g. `deps`), defaulting to empty when
    /// absent rather than failing.
    pub fn string_list_attr(&self, key: &str) -> anyhow::Result<Vec<String>> {
        match self.attrs.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .with_context(|| format!("attribute `{key}` contains a non-string element"))
                })
                .collect(),
            Some(other) => bail!("attribute `{key}` expected a list of strings, found {other}"),
        }
    }
}

#[derive(Deserialize)]
struct RawRuleOnDisk {
    #[serde(rename = "type")]
    rule_type: String,
    name: String,
    #[serde(default)]
    buck_base_path: String,
    #[serde(flatten)]
    attrs: Map<String, Value>,
}

impl From<RawRuleOnDisk> for RawRule {
    fn from(raw: RawRuleOnDisk) -> Self {
        RawRule {
            rule_type: raw.rule_type,
            name: raw.name,
            buck_base_path: raw.buck_base_path,
            attrs: raw.attrs,
        }
    }
}

/// Evaluates one build file into its declared [`RawRule`]s. Deliberately left
/// abstract: a real build tool has a language interpreter behind it, but the
/// core only ever calls through this trait.
pub trait RawRuleLoader {
    fn load_rules(&self, project_root: &ProjectRoot, build_file_path: &BuildFilePath) -> anyhow::Result<Vec<RawRule>>;
}

/// Reads a build file as a JSON array of `{type, name, ...}` objects — the
/// simplest possible stand-in for a real evaluator.
pub struct JsonFileRawRuleLoader;

impl RawRuleLoader for JsonFileRawRuleLoader {
    fn load_rules(&self, project_root: &ProjectRoot, build_file_path: &BuildFilePath) -> anyhow::Result<Vec<RawRule>> {
        let path = project_root.resolve(build_file_path.as_rel_path());
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading build file {}", path.display()))?;
        let on_disk: Vec<RawRuleOnDisk> = serde_json::from_str(&content)
            .with_context(|| format!("parsing build file {}", path.display()))?;
        Ok(on_disk.into_iter().map(RawRule::from).collect())
    }
}

/// Shells out to an external evaluator binary and parses its stdout as a
/// JSON array, via the mockable command runner.
pub struct CommandRawRuleLoader {
    evaluator_bin: String,
    runner: MockableCommandRunner,
}

impl CommandRawRuleLoader {
    pub fn new(evaluator_bin: impl Into<String>) -> Self {
        CommandRawRuleLoader {
            evaluator_bin: evaluator_bin.into(),
            runner: MockableCommandRunner::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_runner(evaluator_bin: impl Into<String>, runner: MockableCommandRunner) -> Self {
        CommandRawRuleLoader {
            evaluator_bin: evaluator_bin.into(),
            runner,
        }
    }
}

impl RawRuleLoader for CommandRawRuleLoader {
    fn load_rules(&self, project_root: &ProjectRoot, build_file_path: &BuildFilePath) -> anyhow::Result<Vec<RawRule>> {
        let args = vec!["eval".to_string(), build_file_path.to_string()];
        let output = self
            .runner
            .run(&self.evaluator_bin, &args, project_root.as_path())
            .context("invoking raw rule evaluator")?;
        if !output.status.success() {
            bail!(
                "evaluator `{}` failed on {build_file_path}: {}",
                self.evaluator_bin,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        let on_disk: Vec<RawRuleOnDisk> = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing evaluator output for {build_file_path}"))?;
        Ok(on_disk.into_iter().map(RawRule::from).collect())
    }
}

/// Finds build files relative to the project root. Left abstract; the
/// concrete implementation below walks the filesystem directly.
pub trait BuildFileTree {
    /// Walks up from `path` looking for the nearest directory holding a
    /// build file, returning that directory's base path.
    fn nearest_enclosing_build_file(&self, path: &RelPath) -> Option<BuildFilePath>;

    /// Every build file under the project root, for `PartialGraph::create_full_graph`.
    fn all_build_files(&self) -> anyhow::Result<BTreeSet<BuildFilePath>>;
}

pub struct FsBuildFileTree {
    project_root: ProjectRoot,
    build_rules_file_name: String,
}

impl FsBuildFileTree {
    pub fn new(project_root: ProjectRoot, build_rules_file_name: impl Into<String>) -> Self {
        FsBuildFileTree {
            project_root,
            build_rules_file_name: build_rules_file_name.into(),
        }
    }
}

impl BuildFileTree for FsBuildFileTree {
    fn nearest_enclosing_build_file(&self, path: &RelPath) -> Option<BuildFilePath> {
        let mut dir = self.project_root.resolve(path);
        if !dir.is_dir() {
            dir.pop();
        }
        loop {
            let candidate = dir.join(&self.build_rules_file_name);
            if candidate.is_file() {
                let rel = candidate
                    .strip_prefix(self.project_root.as_path())
                    .ok()?
                    .to_path_buf();
                return Some(BuildFilePath::new(RelPath::new(rel)));
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    fn all_build_files(&self) -> anyhow::Result<BTreeSet<BuildFilePath>> {
        let pattern = format!(
            "{}/**/{}",
            self.project_root.as_path().display(),
            self.build_rules_file_name
        );
        let mut found = BTreeSet::new();
        for entry in glob::glob(&pattern).context("globbing for build files")? {
            let path = entry.context("reading glob entry")?;
            let rel = path
                .strip_prefix(self.project_root.as_path())
                .context("build file outside project root")?
                .to_path_buf();
            found.insert(BuildFilePath::new(RelPath::new(rel)));
        }
        Ok(found)
    }
}
