//! Mockable external-process runner. Runs `std::process::Command`
//! synchronously, since this core runs single-threaded, swapped out for a
//! mock under `#[cfg(test)]` via the `cfg_if!`-gated alias below.

use std::process::Output;

use anyhow::Context;
use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(test)] {
        pub(crate) use self::r#impl::MockCommandRunner as MockableCommandRunner;
    } else {
        pub(crate) use self::r#impl::CommandRunner as MockableCommandRunner;
    }
}

mod r#impl {
    use super::*;

    #[derive(Default)]
    pub struct CommandRunner {}

    #[cfg_attr(test, mockall::automock)]
    impl CommandRunner {
        pub fn run(&self, program: &str, args: &[String], cwd: &std::path::Path) -> anyhow::Result<Output> {
            std::process::Command::new(program)
                .args(args)
                .current_dir(cwd)
                .output()
                .with_context(|| format!("running `{program} {}`", args.join(" ")))
        }
    }
}
