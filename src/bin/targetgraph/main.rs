//! CLI entry point for the `targets` command surface.

mod args;

use std::collections::HashSet;

use anyhow::Result;
use clap::Parser as _;
use slog::info;
use targetgraph::config::AliasMap;
use targetgraph::config::Config;
use targetgraph::error::exit_code_for;
use targetgraph::error::BuildGraphError;
use targetgraph::paths::ProjectRoot;
use targetgraph::paths::RelPath;
use targetgraph::query;
use targetgraph::query::PartialGraph;
use targetgraph::query::TargetsFilter;
use targetgraph::raw_rule::FsBuildFileTree;
use targetgraph::raw_rule::JsonFileRawRuleLoader;
use targetgraph::registry::RuleRegistry;
use targetgraph::target_name::TargetNameParser;
use targetgraph::util::logger::logger;
use targetgraph::Parser;

use crate::args::Command;
use crate::args::TargetGraphArgs;
use crate::args::TargetsArgs;

fn main() {
    let args = TargetGraphArgs::parse();
    let logger = logger();
    let result = match &args.command {
        Command::Targets(targets_args) => run_targets(&args, targets_args, logger.clone()),
    };
    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run_targets(args: &TargetGraphArgs, targets_args: &TargetsArgs, logger: slog::Logger) -> Result<()> {
    let project_root = ProjectRoot::new(
        args.project_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().expect("current directory must be readable")),
    );
    let config = Config::with_build_rules_file_name(args.build_file_name.clone());
    let target_name_parser = TargetNameParser::new(args.build_file_name.clone());
    let registry = RuleRegistry::with_builtin_generic_rules();
    let raw_rule_loader = JsonFileRawRuleLoader;

    if targets_args.resolvealias {
        let alias_map = AliasMap::load(&args.aliases).unwrap_or_else(|_| AliasMap::empty());
        let mut parser = Parser::new(
            project_root,
            &raw_rule_loader,
            &registry,
            target_name_parser,
            logger.clone(),
        );
        for arg in &targets_args.args {
            let resolved = match query::resolve_alias(arg, &alias_map, &parser) {
                Ok(target) => target,
                Err(err) => return Err(reject_unresolvable(arg, err)),
            };
            // Loading the containing build file confirms the alias actually
            // names a declared target, not just a syntactically valid one.
            parser.parse_build_file(resolved.build_file_path())?;
            if parser.known_builder(&resolved).is_none() {
                return Err(BuildGraphError::NoSuchBuildTarget(resolved).into());
            }
            println!("{resolved}");
        }
        return Ok(());
    }

    for rule_type in &targets_args.r#type {
        if !registry.is_registered(rule_type) {
            return Err(BuildGraphError::UnknownRuleType(rule_type.clone()).into());
        }
    }

    let build_file_tree = FsBuildFileTree::new(project_root.clone(), config.build_rules_file_name().clone());
    let mut parser = Parser::new(
        project_root.clone(),
        &raw_rule_loader,
        &registry,
        target_name_parser,
        logger.clone(),
    );
    let graph = PartialGraph::create_full_graph(&mut parser, &build_file_tree, logger.clone())?;
    info!(logger, "resolved full project graph"; "nodes" => graph.len());

    let referenced_files: HashSet<RelPath> = targets_args
        .referenced_files
        .iter()
        .map(RelPath::new)
        .collect();
    let filter = TargetsFilter::new(targets_args.r#type.clone(), referenced_files);
    let matched = query::query_targets(&graph, &filter);

    if targets_args.json {
        let json = query::render_json(&matched, &project_root, &raw_rule_loader)?;
        println!("{json}");
    } else {
        println!("{}", query::render_plain(&matched));
    }

    Ok(())
}

fn reject_unresolvable(arg: &str, err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<BuildGraphError>() {
        Some(_) => err,
        None => anyhow::anyhow!("could not resolve `{arg}`: {err}"),
    }
}
