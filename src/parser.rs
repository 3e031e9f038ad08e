//! `Parser` — lazy build-file loading, deduplication, builder registration,
//! and the "populated-from-raw" one-way latch. Build files are loaded
//! on demand as targets are referenced, or bulk-ingested up front from an
//! already-fetched raw rule set (used by `PartialGraph::create_full_graph`).

use std::collections::HashMap;
use std::collections::HashSet;

use anyhow::bail;
use anyhow::Context;
use slog::debug;
use slog::trace;
use slog::Logger;

use crate::error::BuildGraphError;
use crate::paths::BasePath;
use crate::paths::BuildFilePath;
use crate::paths::ProjectRoot;
use crate::paths::RelPath;
use crate::raw_rule::RawRule;
use crate::raw_rule::RawRuleLoader;
use crate::registry::FactoryParams;
use crate::registry::RuleRegistry;
use crate::rule::RuleBuilder;
use crate::target_name::TargetName;
use crate::target_name::TargetNameParser;

pub struct Parser<'a> {
    project_root: ProjectRoot,
    raw_rule_loader: &'a dyn RawRuleLoader,
    registry: &'a RuleRegistry,
    target_name_parser: TargetNameParser,
    logger: Logger,

    known_builders: HashMap<TargetName, Box<dyn RuleBuilder>>,
    parsed_build_files: HashSet<BuildFilePath>,
    /// One-way latch: once any raw rules have been injected directly via
    /// [`Parser::parse_raw_rules`], the parser never again falls back to
    /// `raw_rule_loader` for a build file it hasn't already seen — a missing
    /// target is then always `NoSuchBuildTarget`, never a trigger to load
    /// more from disk.
    populated_from_raw: bool,
}

impl<'a> Parser<'a> {
    pub fn new(
        project_root: ProjectRoot,
        raw_rule_loader: &'a dyn RawRuleLoader,
        registry: &'a RuleRegistry,
        target_name_parser: TargetNameParser,
        logger: Logger,
    ) -> Self {
        Parser {
            project_root,
            raw_rule_loader,
            registry,
            target_name_parser,
            logger,
            known_builders: HashMap::new(),
            parsed_build_files: HashSet::new(),
            populated_from_raw: false,
        }
    }

    pub fn project_root(&self) -> &ProjectRoot {
        &self.project_root
    }

    pub fn target_name_parser(&self) -> &TargetNameParser {
        &self.target_name_parser
    }

    pub fn is_populated_from_raw(&self) -> bool {
        self.populated_from_raw
    }

    pub fn has_parsed(&self, build_file_path: &BuildFilePath) -> bool {
        self.parsed_build_files.contains(build_file_path)
    }

    pub fn known_builder(&self, target: &TargetName) -> Option<&dyn RuleBuilder> {
        self.known_builders.get(target).map(|b| b.as_ref())
    }

    pub fn known_targets(&self) -> impl Iterator<Item = &TargetName> {
        self.known_builders.keys()
    }

    /// Loads and registers every rule declared by one build file, unless it
    /// has already been parsed (dedup) — a no-op either way once
    /// `populated_from_raw` has latched.
    pub fn parse_build_file(&mut self, build_file_path: &BuildFilePath) -> anyhow::Result<()> {
        if self.populated_from_raw {
            trace!(self.logger, "skipping lazy load, parser is raw-populated"; "build_file" => %build_file_path);
            return Ok(());
        }
        if self.parsed_build_files.contains(build_file_path) {
            return Ok(());
        }
        debug!(self.logger, "loading build file"; "build_file" => %build_file_path);
        let raw_rules = self
            .raw_rule_loader
            .load_rules(&self.project_root, build_file_path)
            .with_context(|| format!("loading raw rules for {build_file_path}"))?;
        self.register_raw_rules(build_file_path, raw_rules)?;
        self.parsed_build_files.insert(build_file_path.clone());
        Ok(())
    }

    /// Bulk-ingests an already-fetched raw rule set for a set of build
    /// files, bypassing `raw_rule_loader` entirely and latching
    /// `populated_from_raw`. Used by `PartialGraph::create_full_graph`, which
    /// needs every build file loaded up front to answer "what targets
    /// exist" queries.
    pub fn parse_raw_rules(
        &mut self,
        raw_rules_by_file: HashMap<BuildFilePath, Vec<RawRule>>,
    ) -> anyhow::Result<()> {
        for (build_file_path, raw_rules) in raw_rules_by_file {
            if self.parsed_build_files.contains(&build_file_path) {
                continue;
            }
            self.register_raw_rules(&build_file_path, raw_rules)?;
            self.parsed_build_files.insert(build_file_path);
        }
        self.populated_from_raw = true;
        Ok(())
    }

    fn register_raw_rules(&mut self, build_file_path: &BuildFilePath, raw_rules: Vec<RawRule>) -> anyhow::Result<()> {
        for raw in raw_rules {
            // Each rule's own `buck_base_path` (not necessarily the directory
            // the declaring build file lives in) determines its base path and,
            // in turn, the effective source path a `TargetName` must carry.
            let base_path = if raw.buck_base_path().is_empty() {
                BasePath::root()
            } else {
                BasePath::from_rel_path(RelPath::new(raw.buck_base_path().clone()))
            };
            let rule_build_file_path = self.target_name_parser.build_file_path_for(&base_path);
            let target = TargetName::from_parts(rule_build_file_path, base_path, raw.name().clone());
            if self.known_builders.contains_key(&target) {
                bail!(BuildGraphError::DuplicateTarget(target));
            }
            let builder = self
                .registry
                .builder_for(FactoryParams { target: target.clone(), raw: &raw })?;
            trace!(
                self.logger,
                "registered builder";
                "target" => %target,
                "rule_type" => builder.rule_type(),
                "declared_in" => %build_file_path,
            );
            self.known_builders.insert(target, builder);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use maplit::hashmap;
    use serde_json::json;

    use super::*;
    use crate::paths::RelPath;
    use crate::registry::RuleRegistry;
    use crate::util::logger::logger;

    struct NoopLoader;
    impl RawRuleLoader for NoopLoader {
        fn load_rules(&self, _project_root: &ProjectRoot, _build_file_path: &BuildFilePath) -> anyhow::Result<Vec<RawRule>> {
            panic!("should not be called once raw-populated");
        }
    }

    fn raw(rule_type: &str, name: &str, deps: Vec<&str>) -> RawRule {
        RawRule::new(
            rule_type,
            name,
            "foo",
            json!({ "deps": deps }).as_object().unwrap().clone(),
        )
    }

    #[test]
    fn duplicate_target_in_same_build_file_errors() {
        let registry = RuleRegistry::with_builtin_generic_rules();
        let loader = NoopLoader;
        let mut parser = Parser::new(
            ProjectRoot::new("/repo"),
            &loader,
            &registry,
            TargetNameParser::new("BUCK"),
            logger(),
        );
        let bf = BuildFilePath::new(RelPath::new("foo/BUCK"));
        let err = parser
            .parse_raw_rules(hashmap! {
                bf => vec![raw("generic_library", "x", vec![]), raw("generic_library", "x", vec![])],
            })
            .unwrap_err();
        assert!(err.downcast_ref::<BuildGraphError>().is_some());
    }

    #[test]
    fn raw_populated_latches_and_blocks_lazy_loads() {
        let registry = RuleRegistry::with_builtin_generic_rules();
        let loader = NoopLoader;
        let mut parser = Parser::new(
            ProjectRoot::new("/repo"),
            &loader,
            &registry,
            TargetNameParser::new("BUCK"),
            logger(),
        );
        let bf = BuildFilePath::new(RelPath::new("foo/BUCK"));
        parser
            .parse_raw_rules(hashmap! { bf.clone() => vec![raw("generic_library", "x", vec![])] })
            .unwrap();
        assert!(parser.is_populated_from_raw());
        // Does not panic even though NoopLoader would: the latch short-circuits.
        parser.parse_build_file(&BuildFilePath::new(RelPath::new("bar/BUCK"))).unwrap();
    }
}
