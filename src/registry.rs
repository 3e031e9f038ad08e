//! `RuleRegistry` — tag-to-builder-factory dispatch. Concrete rule kinds are
//! deliberately left out of this crate's core, so the factory contract is an
//! open, registrable map rather than a fixed enum of rule types.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;

use crate::error::BuildGraphError;
use crate::paths::RelPath;
use crate::raw_rule::RawRule;
use crate::rule::GenericRuleBuilder;
use crate::rule::RuleBuilder;
use crate::target_name::TargetName;

/// Everything a factory needs to turn one [`RawRule`] into a [`RuleBuilder`]:
/// the resolved identity of the target it's building, plus the raw attribute
/// map itself.
pub struct FactoryParams<'a> {
    pub target: TargetName,
    pub raw: &'a RawRule,
}

pub type RuleBuilderFactory = Arc<dyn Fn(FactoryParams) -> anyhow::Result<Box<dyn RuleBuilder>> + Send + Sync>;

/// Maps a rule-type tag (e.g. `"generic_library"`) to the factory that
/// builds a [`RuleBuilder`] for it. Unknown tags fail with
/// `BuildGraphError::UnknownRuleType`: every declared rule must be
/// buildable, so there is no tolerance for a tag nothing registered.
#[derive(Clone)]
pub struct RuleRegistry {
    factories: HashMap<String, RuleBuilderFactory>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        RuleRegistry {
            factories: HashMap::new(),
        }
    }

    /// Rule-type tags are matched case-insensitively, so both registration
    /// and lookup normalize to lowercase.
    pub fn register(&mut self, rule_type: impl Into<String>, factory: RuleBuilderFactory) {
        self.factories.insert(rule_type.into().to_lowercase(), factory);
    }

    /// Whether `rule_type` (matched case-insensitively) has a registered
    /// factory — used to validate `--type` filter arguments up front, the
    /// same way `builder_for` validates a raw rule's own `type` field.
    pub fn is_registered(&self, rule_type: &str) -> bool {
        self.factories.contains_key(&rule_type.to_lowercase())
    }

    pub fn builder_for(&self, params: FactoryParams) -> anyhow::Result<Box<dyn RuleBuilder>> {
        let factory = self
            .factories
            .get(&params.raw.rule_type().to_lowercase())
            .ok_or_else(|| BuildGraphError::UnknownRuleType(params.raw.rule_type().clone()))?
            .clone();
        let target = params.target.clone();
        factory(params).with_context(|| format!("building rule `{target}`"))
    }

    /// A registry pre-populated with the crate's own [`GenericRuleBuilder`]
    /// under a handful of illustrative tags, so the crate and its tests have
    /// something runnable without requiring a caller to register real rule
    /// kinds first.
    pub fn with_builtin_generic_rules() -> Self {
        let mut registry = RuleRegistry::new();
        let factory: RuleBuilderFactory = Arc::new(|params: FactoryParams| {
            let deps = params.raw.string_list_attr("deps")?;
            let inputs = params
                .raw
                .string_list_attr("srcs")
                .unwrap_or_default()
                .into_iter()
                .map(RelPath::new)
                .collect();
            Ok(Box::new(GenericRuleBuilder::new(
                params.target,
                params.raw.rule_type().clone(),
                deps,
                inputs,
            )) as Box<dyn RuleBuilder>)
        });
        for rule_type in ["generic_library", "generic_binary", "generic_test", "genrule"] {
            registry.register(rule_type, factory.clone());
        }
        registry
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
