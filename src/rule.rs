//! `RuleBuilder`/`BuiltRule` — the two-phase construction pattern that lets
//! the dependency graph build exactly once in post-order without forward
//! references.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::paths::RelPath;
use crate::target_name::TargetName;

/// Already-built rules, keyed by [`TargetName`] — the `DependencyResolver`'s
/// working set.
pub type RuleIndex = HashMap<TargetName, Arc<dyn BuiltRule>>;

/// An unresolved rule: knows its own declared dependency strings but has not
/// yet resolved them into built rules. Holds raw dependency strings until
/// `.build()` is called with the rest of the graph available.
pub trait RuleBuilder: fmt::Debug {
    fn target(&self) -> &TargetName;

    fn rule_type(&self) -> &str;

    /// Target strings this rule depends on, exactly as declared (not yet
    /// parsed into `TargetName`s — the `DependencyResolver` does that before
    /// any builder finalizes).
    fn declared_deps(&self) -> &[String];

    /// Finalizes this builder into a [`BuiltRule`], given the already-built
    /// [`BuiltRule`] for each of `declared_deps`, resolved and looked up by
    /// the `DependencyResolver` (in `declared_deps` order). The resolver's
    /// post-order discipline guarantees each one already exists by the time
    /// this is called.
    fn build(&self, resolved_deps: Vec<Arc<dyn BuiltRule>>) -> anyhow::Result<Arc<dyn BuiltRule>>;
}

/// A fully resolved rule: its own identity plus `Arc`-shared handles to its
/// already-built dependencies instead of raw strings.
pub trait BuiltRule: fmt::Debug {
    fn target(&self) -> &TargetName;

    fn rule_type(&self) -> &str;

    fn inputs(&self) -> &[RelPath];

    fn deps(&self) -> &[Arc<dyn BuiltRule>];
}

/// A minimal concrete rule kind used by the crate's own tests and by the
/// default [`crate::registry::RuleRegistry`] factories. Concrete rule *kinds*
/// (library, binary, genrule, ...) are deliberately left out of this crate's
/// core; this one exists only so the crate is runnable end to end.
#[derive(Debug, Clone)]
pub struct GenericRuleBuilder {
    target: TargetName,
    rule_type: String,
    declared_deps: Vec<String>,
    inputs: Vec<RelPath>,
}

impl GenericRuleBuilder {
    pub fn new(
        target: TargetName,
        rule_type: impl Into<String>,
        declared_deps: Vec<String>,
        inputs: Vec<RelPath>,
    ) -> Self {
        GenericRuleBuilder {
            target,
            rule_type: rule_type.into(),
            declared_deps,
            inputs,
        }
    }
}

impl RuleBuilder for GenericRuleBuilder {
    fn target(&self) -> &TargetName {
        &self.target
    }

    fn rule_type(&self) -> &str {
        &self.rule_type
    }

    fn declared_deps(&self) -> &[String] {
        &self.declared_deps
    }

    fn build(&self, resolved_deps: Vec<Arc<dyn BuiltRule>>) -> anyhow::Result<Arc<dyn BuiltRule>> {
        Ok(Arc::new(GenericBuiltRule {
            target: self.target.clone(),
            rule_type: self.rule_type.clone(),
            inputs: self.inputs.clone(),
            deps: resolved_deps,
        }))
    }
}

#[derive(Debug)]
pub struct GenericBuiltRule {
    target: TargetName,
    rule_type: String,
    inputs: Vec<RelPath>,
    deps: Vec<Arc<dyn BuiltRule>>,
}

impl GenericBuiltRule {
    pub fn new(
        target: TargetName,
        rule_type: impl Into<String>,
        inputs: Vec<RelPath>,
        deps: Vec<Arc<dyn BuiltRule>>,
    ) -> Self {
        GenericBuiltRule {
            target,
            rule_type: rule_type.into(),
            inputs,
            deps,
        }
    }
}

impl BuiltRule for GenericBuiltRule {
    fn target(&self) -> &TargetName {
        &self.target
    }

    fn rule_type(&self) -> &str {
        &self.rule_type
    }

    fn inputs(&self) -> &[RelPath] {
        &self.inputs
    }

    fn deps(&self) -> &[Arc<dyn BuiltRule>] {
        &self.deps
    }
}
