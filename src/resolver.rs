//! `DependencyResolver` — cycle-safe, explicit-stack post-order DFS over the
//! transitive dependency graph. Uses an explicit frame stack rather than
//! recursion or a future-driven traversal, since this crate's core runs on a
//! single thread.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use slog::debug;
use slog::Logger;

use crate::error::BuildGraphError;
use crate::graph::DependencyGraph;
use crate::parser::Parser;
use crate::rule::BuiltRule;
use crate::target_name::ParseContext;
use crate::target_name::TargetName;

struct Frame {
    target: TargetName,
    dep_strings: Vec<String>,
    next_dep_idx: usize,
    resolved_deps: Vec<Arc<dyn BuiltRule>>,
}

pub struct DependencyResolver<'p, 'a> {
    parser: &'p mut Parser<'a>,
    logger: Logger,
}

impl<'p, 'a> DependencyResolver<'p, 'a> {
    pub fn new(parser: &'p mut Parser<'a>, logger: Logger) -> Self {
        DependencyResolver { parser, logger }
    }

    /// Resolves one or more seed targets into a single [`DependencyGraph`]
    /// containing every seed and everything transitively reachable from
    /// them. Targets already present in a prior call's resulting graph are
    /// deduplicated for free: completing a target inserts it into an
    /// internal `completed` set this call's loop consults for every seed.
    pub fn resolve(&mut self, seeds: Vec<TargetName>) -> anyhow::Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut rule_index: HashMap<TargetName, Arc<dyn BuiltRule>> = HashMap::new();
        let mut completed: HashSet<TargetName> = HashSet::new();
        let mut on_stack: HashSet<TargetName> = HashSet::new();
        let mut stack: Vec<Frame> = Vec::new();

        for seed in seeds {
            if completed.contains(&seed) {
                continue;
            }

            self.push_frame(&mut stack, &mut on_stack, seed)?;

            while let Some(top) = stack.last_mut() {
                if top.next_dep_idx < top.dep_strings.len() {
                    let dep_str = top.dep_strings[top.next_dep_idx].clone();
                    top.next_dep_idx += 1;

                    let ctx = ParseContext::for_base_path(top.target.base_path().clone());
                    let dep_target = self
                        .parser
                        .target_name_parser()
                        .parse(&dep_str, &ctx)
                        .map_err(anyhow::Error::from)?;

                    if let Some(built) = rule_index.get(&dep_target) {
                        stack.last_mut().unwrap().resolved_deps.push(built.clone());
                        continue;
                    }

                    if on_stack.contains(&dep_target) {
                        let pos = stack.iter().position(|f| f.target == dep_target).expect("on_stack implies present in stack");
                        let mut cycle: Vec<TargetName> = stack[pos..].iter().map(|f| f.target.clone()).collect();
                        cycle.push(dep_target);
                        return Err(BuildGraphError::CycleInDependencyGraph(cycle).into());
                    }

                    self.push_frame(&mut stack, &mut on_stack, dep_target)?;
                    continue;
                }

                let frame = stack.pop().unwrap();
                on_stack.remove(&frame.target);
                debug!(self.logger, "finalizing rule"; "target" => %frame.target);
                let built = {
                    let builder = self
                        .parser
                        .known_builder(&frame.target)
                        .expect("push_frame guarantees a builder exists for every pushed target");
                    builder.build(frame.resolved_deps)?
                };
                graph.record(built.clone());
                completed.insert(frame.target.clone());
                rule_index.insert(frame.target, built);
            }
        }

        Ok(graph)
    }

    /// Ensures `target` has a registered builder (lazily loading its build
    /// file if the parser's raw-mode latch allows it), then pushes a fresh
    /// traversal frame for it.
    fn push_frame(&mut self, stack: &mut Vec<Frame>, on_stack: &mut HashSet<TargetName>, target: TargetName) -> anyhow::Result<()> {
        self.ensure_builder_loaded(&target)?;
        let dep_strings = self
            .parser
            .known_builder(&target)
            .expect("ensure_builder_loaded guarantees presence")
            .declared_deps()
            .to_vec();
        on_stack.insert(target.clone());
        stack.push(Frame {
            target,
            dep_strings,
            next_dep_idx: 0,
            resolved_deps: Vec::new(),
        });
        Ok(())
    }

    fn ensure_builder_loaded(&mut self, target: &TargetName) -> anyhow::Result<()> {
        if self.parser.known_builder(target).is_some() {
            return Ok(());
        }

        if self.parser.is_populated_from_raw() {
            return Err(BuildGraphError::NoSuchBuildTarget(target.clone()).into());
        }

        if self.parser.has_parsed(target.build_file_path()) {
            return Err(BuildGraphError::TargetNotFoundInParsedFile {
                fqn: target.clone(),
                build_file: target.build_file_path().clone(),
            }
            .into());
        }

        self.parser.parse_build_file(target.build_file_path())?;

        if self.parser.known_builder(target).is_none() {
            return Err(BuildGraphError::NoSuchBuildTarget(target.clone()).into());
        }
        Ok(())
    }
}
