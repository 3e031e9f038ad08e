//! Error taxonomy: a `thiserror`-derived enum composed into `anyhow::Error`
//! via `.into()`, so the CLI boundary can downcast an arbitrary
//! `anyhow::Error` back to a typed variant and recover the right exit code.

use thiserror::Error;

use crate::paths::BuildFilePath;
use crate::target_name::TargetName;

#[derive(Debug, Error)]
pub enum BuildGraphError {
    #[error("no such build target: {0}")]
    NoSuchBuildTarget(TargetName),

    #[error("build file `{build_file}` was parsed but does not declare `{fqn}`")]
    TargetNotFoundInParsedFile {
        fqn: TargetName,
        build_file: BuildFilePath,
    },

    #[error("cycle in dependency graph: {}", render_cycle(.0))]
    CycleInDependencyGraph(Vec<TargetName>),

    #[error("duplicate target: {0}")]
    DuplicateTarget(TargetName),

    #[error("unknown rule type: {0}")]
    UnknownRuleType(String),

    #[error("badly formatted target: {0}")]
    BadlyFormattedTarget(String),

    #[error("unknown alias: {0}")]
    UnknownAlias(String),
}

fn render_cycle(cycle: &[TargetName]) -> String {
    cycle
        .iter()
        .map(TargetName::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl BuildGraphError {
    /// User-facing errors map to exit code 1; anything else (IO failures,
    /// internal invariant breaks) is not a `BuildGraphError` at all and falls
    /// through to a generic non-zero failure code.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            BuildGraphError::NoSuchBuildTarget(_)
                | BuildGraphError::TargetNotFoundInParsedFile { .. }
                | BuildGraphError::CycleInDependencyGraph(_)
                | BuildGraphError::DuplicateTarget(_)
                | BuildGraphError::UnknownRuleType(_)
                | BuildGraphError::BadlyFormattedTarget(_)
                | BuildGraphError::UnknownAlias(_)
        )
    }

    /// Exit code this error should produce at the CLI boundary.
    pub fn exit_code(&self) -> i32 {
        if self.is_user_facing() {
            1
        } else {
            2
        }
    }
}

/// Exit code for an arbitrary `anyhow::Error` surfaced at the CLI boundary:
/// downcast to `BuildGraphError` if possible, otherwise treat as an
/// `IOFailure`/internal catch-all failure.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BuildGraphError>() {
        Some(e) => e.exit_code(),
        None => 2,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::paths::BasePath;
    use crate::paths::RelPath;
    use crate::target_name::ParseContext;
    use crate::target_name::TargetNameParser;

    fn target(s: &str) -> TargetName {
        TargetNameParser::new("BUCK")
            .parse(s, &ParseContext::for_base_path(BasePath::from_rel_path(RelPath::new(""))))
            .unwrap()
    }

    #[test]
    fn no_such_build_target_is_user_facing_exit_1() {
        let err = BuildGraphError::NoSuchBuildTarget(target("//foo:bar"));
        assert!(err.is_user_facing());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn cycle_message_renders_chain() {
        let err = BuildGraphError::CycleInDependencyGraph(vec![target("//a:a"), target("//b:b")]);
        assert_eq!(
            err.to_string(),
            "cycle in dependency graph: //a:a -> //b:b"
        );
    }

    #[test]
    fn anyhow_wrapped_non_taxonomy_error_is_exit_2() {
        let err = anyhow::anyhow!("disk on fire");
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn anyhow_wrapped_taxonomy_error_keeps_exit_code() {
        let err: anyhow::Error = BuildGraphError::DuplicateTarget(target("//foo:bar")).into();
        assert_eq!(exit_code_for(&err), 1);
    }
}
