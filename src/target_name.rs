//! Target-string parsing: turning `//base/path:name` and `:name` strings
//! into fully resolved [`TargetName`]s.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::BuildGraphError;
use crate::paths::BasePath;
use crate::paths::BuildFilePath;
use crate::paths::RelPath;

/// A fully resolved, fully qualified target: a base path, a short name, and
/// the build file that declares it. Used directly as a map key throughout the
/// crate (no separate stringified "FQN" type) rather than its `Display`
/// string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetName {
    build_file_path: BuildFilePath,
    base_path: BasePath,
    short_name: String,
}

impl TargetName {
    /// Builds a `TargetName` whose fields are already known to be
    /// consistent (e.g. when a `Parser` derives a target directly from one
    /// raw rule's `name` plus the build file it came from), bypassing string
    /// parsing entirely. Not exposed outside the crate: every externally
    /// supplied target string must go through [`TargetNameParser::parse`].
    pub(crate) fn from_parts(build_file_path: BuildFilePath, base_path: BasePath, short_name: String) -> Self {
        TargetName {
            build_file_path,
            base_path,
            short_name,
        }
    }

    pub fn build_file_path(&self) -> &BuildFilePath {
        &self.build_file_path
    }

    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.base_path, self.short_name)
    }
}

/// The enclosing base path a relative (`:name`) target string resolves
/// against when parsing a rule's `deps` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    base_path: BasePath,
}

impl ParseContext {
    pub fn for_base_path(base_path: BasePath) -> Self {
        ParseContext { base_path }
    }

    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }
}

static FULLY_QUALIFIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^//([A-Za-z0-9_./+-]*):([A-Za-z0-9_.+-]+)$").unwrap());
static RELATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z0-9_.+-]+)$").unwrap());

/// Turns a target string plus a [`ParseContext`] into a [`TargetName`].
/// Never touches the filesystem: the result's `build_file_path` is a
/// deterministic function of `base_path` and the configured build-file name,
/// not a fact checked against disk.
pub struct TargetNameParser {
    build_rules_file_name: String,
}

impl TargetNameParser {
    pub fn new(build_rules_file_name: impl Into<String>) -> Self {
        TargetNameParser {
            build_rules_file_name: build_rules_file_name.into(),
        }
    }

    pub fn parse(&self, s: &str, ctx: &ParseContext) -> Result<TargetName, BuildGraphError> {
        if let Some(caps) = FULLY_QUALIFIED_RE.captures(s) {
            let base = &caps[1];
            let short_name = caps[2].to_string();
            let base_path = BasePath::from_rel_path(RelPath::new(base));
            let build_file_path = self.build_file_path_for(&base_path);
            return Ok(TargetName {
                build_file_path,
                base_path,
                short_name,
            });
        }

        if s.starts_with("//") {
            return Err(BuildGraphError::BadlyFormattedTarget(s.to_string()));
        }

        if let Some(caps) = RELATIVE_RE.captures(s) {
            let short_name = caps[1].to_string();
            let base_path = ctx.base_path.clone();
            let build_file_path = self.build_file_path_for(&base_path);
            return Ok(TargetName {
                build_file_path,
                base_path,
                short_name,
            });
        }

        Err(BuildGraphError::BadlyFormattedTarget(s.to_string()))
    }

    /// The build file a given base path's targets are declared in: the
    /// forward direction of [`TargetNameParser::base_path_of`]. Used by the
    /// `Parser` to derive a raw rule's own `TargetName::build_file_path` from
    /// its declared `buck_base_path`, which may differ from the build file
    /// that was actually loaded to discover it.
    pub fn build_file_path_for(&self, base_path: &BasePath) -> BuildFilePath {
        BuildFilePath::new(
            base_path
                .as_rel_path()
                .join(&self.build_rules_file_name),
        )
    }

    /// Inverse of `build_file_path_for`: the base path a given build file
    /// declares targets under. Used by the `Parser` to build a
    /// [`ParseContext`] for the rules it loads from one build file.
    pub fn base_path_of(&self, build_file_path: &BuildFilePath) -> BasePath {
        match build_file_path.as_rel_path().parent() {
            Some(parent) => BasePath::from_rel_path(parent),
            None => BasePath::root(),
        }
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    fn parser() -> TargetNameParser {
        TargetNameParser::new("BUCK")
    }

    fn ctx(base: &str) -> ParseContext {
        ParseContext::for_base_path(BasePath::from_rel_path(RelPath::new(base)))
    }

    #[test]
    fn fully_qualified() {
        let target = parser().parse("//foo/bar:baz", &ctx("unused")).unwrap();
        assert_eq!(target.base_path().to_string(), "//foo/bar");
        assert_eq!(target.short_name(), "baz");
        assert_eq!(target.build_file_path().to_string(), "foo/bar/BUCK");
    }

    #[test]
    fn fully_qualified_root() {
        let target = parser().parse("//:baz", &ctx("unused")).unwrap();
        assert_eq!(target.base_path().to_string(), "//");
        assert_eq!(target.build_file_path().to_string(), "BUCK");
    }

    #[test]
    fn relative_resolves_against_context() {
        let target = parser().parse(":baz", &ctx("foo/bar")).unwrap();
        assert_eq!(target.base_path().to_string(), "//foo/bar");
        assert_eq!(target.short_name(), "baz");
    }

    #[test]
    fn bare_colon_prefixed_path_is_badly_formatted_if_not_relative() {
        assert_matches!(
            parser().parse("foo/bar:baz", &ctx("unused")),
            Err(BuildGraphError::BadlyFormattedTarget(s)) if s == "foo/bar:baz"
        );
    }

    #[test]
    fn no_colon_is_badly_formatted() {
        assert_matches!(
            parser().parse("justaword", &ctx("unused")),
            Err(BuildGraphError::BadlyFormattedTarget(_))
        );
    }

    #[test]
    fn fully_qualified_missing_name_is_badly_formatted() {
        assert_matches!(
            parser().parse("//foo/bar:", &ctx("unused")),
            Err(BuildGraphError::BadlyFormattedTarget(_))
        );
    }

    #[test]
    fn equal_targets_are_equal_and_ordered() {
        let a = parser().parse("//foo:bar", &ctx("unused")).unwrap();
        let b = parser().parse("//foo:bar", &ctx("unused")).unwrap();
        assert_eq!(a, b);
    }

    /// A restricted identifier alphabet for quickcheck-generated base-path
    /// segments and short names, matching `TargetNameParser`'s regexes — an
    /// arbitrary-driven round-trip property rather than a handful of example
    /// cases.
    #[derive(Clone, Debug)]
    struct Ident(String);

    impl quickcheck::Arbitrary for Ident {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            const ALPHABET: &[char] = &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't',
                'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '_',
            ];
            let len = 1 + usize::arbitrary(g) % 8;
            Ident((0..len).map(|_| *g.choose(ALPHABET).unwrap()).collect())
        }
    }

    #[quickcheck_macros::quickcheck]
    fn fully_qualified_roundtrips_for_any_base_and_name(base: Ident, name: Ident) -> bool {
        let s = format!("//{}:{}", base.0, name.0);
        match parser().parse(&s, &ctx("unused")) {
            Ok(target) => target.base_path().to_string() == format!("//{}", base.0) && target.short_name() == name.0,
            Err(_) => false,
        }
    }

    #[quickcheck_macros::quickcheck]
    fn relative_dep_string_always_resolves_under_its_context(base: Ident, name: Ident) -> bool {
        let context = ctx(&base.0);
        let dep_string = format!(":{}", name.0);
        match parser().parse(&dep_string, &context) {
            Ok(target) => {
                target.base_path() == context.base_path()
                    && target.short_name() == name.0
                    && target.build_file_path() == &parser().build_file_path_for(context.base_path())
            }
            Err(_) => false,
        }
    }
}
