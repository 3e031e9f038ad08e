use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

const DEFAULT_BUILD_FILE_NAME: &str = "BUCK";
const DEFAULT_ALIASES_FILE: &str = "aliases.toml";

#[derive(Parser, Debug)]
#[command(about = "Parses build files and resolves the transitive dependency graph")]
pub struct TargetGraphArgs {
    /// Root of the monorepo being parsed. Defaults to the current directory.
    #[clap(long, global = true, value_name = "PATH")]
    pub project_root: Option<PathBuf>,

    /// Name of the build-definition file the project uses.
    #[clap(long, global = true, default_value = DEFAULT_BUILD_FILE_NAME)]
    pub build_file_name: String,

    /// Path to the alias map used by `--resolvealias`.
    #[clap(long, global = true, default_value = DEFAULT_ALIASES_FILE)]
    pub aliases: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lists targets in the project, optionally filtered.
    Targets(TargetsArgs),
}

#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Alias names, or fully qualified targets when `--resolvealias` is set.
    pub args: Vec<String>,

    /// Restrict output to these rule-type tags (case-insensitive). Unknown tag is a user error.
    #[clap(long, num_args = 1.., value_name = "TYPE")]
    pub r#type: Vec<String>,

    /// Restrict output to rules affected by these project-root-relative files.
    #[clap(long = "referenced_files", num_args = 1.., value_name = "FILE")]
    pub referenced_files: Vec<String>,

    /// Emit the matching targets' raw attribute maps as pretty-printed JSON.
    #[clap(long)]
    pub json: bool,

    /// Short-circuit: resolve each positional argument to a fully qualified name and print it.
    #[clap(long)]
    pub resolvealias: bool,
}
