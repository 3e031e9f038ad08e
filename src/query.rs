//! `PartialGraph`/`Query` — full-graph construction, filtering, alias
//! resolution, and output rendering for the `targets` command.

use std::collections::HashMap;
use std::collections::HashSet;

use anyhow::Context;
use itertools::Itertools;
use serde_json::Map;
use serde_json::Value;
use slog::Logger;

use crate::config::AliasMap;
use crate::error::BuildGraphError;
use crate::graph::DependencyGraph;
use crate::paths::BasePath;
use crate::paths::ProjectRoot;
use crate::paths::RelPath;
use crate::raw_rule::BuildFileTree;
use crate::raw_rule::RawRuleLoader;
use crate::parser::Parser;
use crate::resolver::DependencyResolver;
use crate::target_name::ParseContext;
use crate::target_name::TargetName;

pub struct PartialGraph;

impl PartialGraph {
    /// Loads every build file under the project root and resolves every
    /// target any of them declares, producing one graph containing the
    /// entire project — the seed set `Query::targets` filters down from.
    pub fn create_full_graph(
        parser: &mut Parser,
        build_file_tree: &dyn BuildFileTree,
        logger: Logger,
    ) -> anyhow::Result<DependencyGraph> {
        for build_file in build_file_tree.all_build_files()? {
            parser.parse_build_file(&build_file)?;
        }
        let seeds: Vec<TargetName> = parser.known_targets().cloned().collect();
        let mut resolver = DependencyResolver::new(parser, logger);
        resolver.resolve(seeds)
    }
}

#[derive(Debug, Default, Clone)]
pub struct TargetsFilter {
    rule_types: HashSet<String>,
    pub referenced_files: HashSet<RelPath>,
}

impl TargetsFilter {
    /// Rule-type tags are matched case-insensitively, so the filter set is
    /// normalized to lowercase up front.
    pub fn new(rule_types: impl IntoIterator<Item = String>, referenced_files: HashSet<RelPath>) -> Self {
        TargetsFilter {
            rule_types: rule_types.into_iter().map(|t| t.to_lowercase()).collect(),
            referenced_files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rule_types.is_empty() && self.referenced_files.is_empty()
    }
}

/// Filters `graph` down to the targets matching `filter`, in deterministic
/// ascending order. A type filter keeps only matching rule types; a
/// referenced-files filter keeps a target if it (or anything in its
/// transitive dependency closure) lists one of `referenced_files` as an
/// input — computed bottom-up over `graph.build_order()`, which is already a
/// valid post-order by construction.
pub fn query_targets(graph: &DependencyGraph, filter: &TargetsFilter) -> Vec<TargetName> {
    let mut matched: Vec<TargetName> = graph
        .nodes()
        .filter(|target| {
            if filter.rule_types.is_empty() {
                return true;
            }
            graph
                .get(target)
                .map(|rule| filter.rule_types.contains(&rule.rule_type().to_lowercase()))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    if !filter.referenced_files.is_empty() {
        let mut affected: HashSet<TargetName> = HashSet::new();
        for target in graph.build_order() {
            let rule = graph.get(target).expect("build_order only lists recorded nodes");
            let directly_affected = rule.inputs().iter().any(|input| filter.referenced_files.contains(input));
            let transitively_affected = graph.deps_of(target).iter().any(|dep| affected.contains(dep));
            if directly_affected || transitively_affected {
                affected.insert(target.clone());
            }
        }
        matched.retain(|target| affected.contains(target));
    }

    matched.into_iter().sorted().collect()
}

/// Resolves one CLI argument into a [`TargetName`]: fully qualified and
/// relative target strings parse directly, everything else is looked up in
/// the alias map (`--resolvealias`), failing with
/// `BuildGraphError::UnknownAlias` if not found there either.
pub fn resolve_alias(arg: &str, alias_map: &AliasMap, parser: &Parser) -> anyhow::Result<TargetName> {
    if arg.starts_with("//") || arg.starts_with(':') {
        let ctx = ParseContext::for_base_path(BasePath::root());
        return parser
            .target_name_parser()
            .parse(arg, &ctx)
            .map_err(anyhow::Error::from);
    }
    let resolved = alias_map
        .resolve(arg)
        .ok_or_else(|| BuildGraphError::UnknownAlias(arg.to_string()))?;
    let ctx = ParseContext::for_base_path(BasePath::root());
    parser.target_name_parser().parse(resolved, &ctx).map_err(Into::into)
}

pub fn render_plain(targets: &[TargetName]) -> String {
    targets.iter().map(TargetName::to_string).collect::<Vec<_>>().join("\n")
}

/// Renders `targets` as a JSON object keyed by FQN, with each value the raw
/// attribute map the build file declared for it, keys sorted. The core
/// discards raw attribute maps once a rule is built, so this re-reads each
/// target's containing build file through the same `RawRuleLoader` the
/// `Parser` used, caching one read per build file. Output entries are
/// inserted in `targets`' order (callers pass the already-sorted result of
/// [`query_targets`]), so the top-level object is sorted too.
pub fn render_json(
    targets: &[TargetName],
    project_root: &ProjectRoot,
    raw_rule_loader: &dyn RawRuleLoader,
) -> anyhow::Result<String> {
    let mut loaded: HashMap<&crate::paths::BuildFilePath, Vec<crate::raw_rule::RawRule>> = HashMap::new();

    let mut out = Map::new();
    for target in targets {
        let build_file_path = target.build_file_path();
        if !loaded.contains_key(build_file_path) {
            let raw_rules = raw_rule_loader
                .load_rules(project_root, build_file_path)
                .with_context(|| format!("re-reading {build_file_path} for --json output"))?;
            loaded.insert(build_file_path, raw_rules);
        }
        let Some(raw) = loaded[build_file_path].iter().find(|r| r.name() == target.short_name()) else {
            continue;
        };

        let mut sorted_attrs: std::collections::BTreeMap<String, Value> =
            raw.attrs().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        sorted_attrs.insert("type".to_string(), Value::String(raw.rule_type().clone()));
        sorted_attrs.insert("name".to_string(), Value::String(raw.name().clone()));
        let attrs: Map<String, Value> = sorted_attrs.into_iter().collect();
        out.insert(target.to_string(), Value::Object(attrs));
    }
    serde_json::to_string_pretty(&Value::Object(out)).context("serializing --json output")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_plain_is_sorted_newline_joined() {
        let parser = TargetNameParserFixture::new();
        let a = parser.target("//a:a");
        let b = parser.target("//b:b");
        assert_eq!(render_plain(&[a, b]), "//a:a\n//b:b");
    }

    #[test]
    fn type_filter_is_case_insensitive() {
        let parser = TargetNameParserFixture::new();
        let mut graph = DependencyGraph::new();
        let lib: std::sync::Arc<dyn crate::rule::BuiltRule> = std::sync::Arc::new(crate::rule::GenericBuiltRule::new(
            parser.target("//foo:lib"),
            "generic_library",
            vec![],
            vec![],
        ));
        let test_rule: std::sync::Arc<dyn crate::rule::BuiltRule> = std::sync::Arc::new(crate::rule::GenericBuiltRule::new(
            parser.target("//foo:test"),
            "generic_test",
            vec![],
            vec![],
        ));
        graph.record(lib);
        graph.record(test_rule);

        let filter = TargetsFilter::new(vec!["GENERIC_TEST".to_string()], HashSet::new());
        assert_eq!(query_targets(&graph, &filter), vec![parser.target("//foo:test")]);
    }

    #[test]
    fn referenced_files_filter_keeps_producer_and_transitive_consumer() {
        let parser = TargetNameParserFixture::new();
        let mut graph = DependencyGraph::new();
        let core: std::sync::Arc<dyn crate::rule::BuiltRule> = std::sync::Arc::new(crate::rule::GenericBuiltRule::new(
            parser.target("//lib:core"),
            "generic_library",
            vec![RelPath::new("lib/Core.java")],
            vec![],
        ));
        graph.record(core.clone());
        let bin: std::sync::Arc<dyn crate::rule::BuiltRule> = std::sync::Arc::new(crate::rule::GenericBuiltRule::new(
            parser.target("//app:bin"),
            "generic_binary",
            vec![],
            vec![core],
        ));
        graph.record(bin);

        let mut files = HashSet::new();
        files.insert(RelPath::new("lib/Core.java"));
        let filter = TargetsFilter::new(Vec::new(), files);
        assert_eq!(
            query_targets(&graph, &filter),
            vec![parser.target("//app:bin"), parser.target("//lib:core")]
        );
    }

    #[test]
    fn render_json_sorts_attribute_keys_and_reparses_as_raw_rule() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("BUCK"),
            r#"[{"type": "generic_library", "name": "foo", "srcs": ["foo.rs"], "deps": [":bar"]}]"#,
        )
        .unwrap();
        let project_root = ProjectRoot::new(dir.path());
        let loader = crate::raw_rule::JsonFileRawRuleLoader;
        let parser = TargetNameParserFixture::new();
        let target = parser.target("//:foo");

        let json = render_json(&[target], &project_root, &loader).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let attrs = value.get("//:foo").unwrap().as_object().unwrap();
        let keys: Vec<&String> = attrs.keys().collect();
        let mut sorted_keys = keys.clone();
        sorted_keys.sort();
        assert_eq!(keys, sorted_keys);

        let rebuilt = crate::raw_rule::RawRule::new(
            attrs["type"].as_str().unwrap(),
            attrs["name"].as_str().unwrap(),
            "",
            attrs.clone(),
        );
        assert_eq!(rebuilt.string_list_attr("deps").unwrap(), vec![":bar".to_string()]);
    }

    #[test]
    fn resolve_alias_rejects_unknown_alias() {
        let registry = crate::registry::RuleRegistry::with_builtin_generic_rules();
        let loader = crate::raw_rule::JsonFileRawRuleLoader;
        let parser = Parser::new(
            ProjectRoot::new("/repo"),
            &loader,
            &registry,
            crate::target_name::TargetNameParser::new("BUCK"),
            crate::util::logger::logger(),
        );
        let err = resolve_alias("no-such-alias", &AliasMap::empty(), &parser).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildGraphError>(),
            Some(BuildGraphError::UnknownAlias(_))
        ));
    }

    struct TargetNameParserFixture {
        inner: crate::target_name::TargetNameParser,
    }

    impl TargetNameParserFixture {
        fn new() -> Self {
            TargetNameParserFixture {
                inner: crate::target_name::TargetNameParser::new("BUCK"),
            }
        }

        fn target(&self, s: &str) -> TargetName {
            self.inner
                .parse(s, &ParseContext::for_base_path(BasePath::root()))
                .unwrap()
        }
    }
}
