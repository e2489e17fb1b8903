//! Git adapter for branch setup.
//!
//! A small, explicit wrapper around `git` subprocess calls, behind the
//! [`BranchOps`] trait so mode preparation can be tested without a repository.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Branch operations Tag mode performs before the agent runs.
pub trait BranchOps {
    /// Fetch `branch` from origin and check it out.
    fn checkout_existing(&self, branch: &str) -> Result<()>;

    /// Fetch `base` from origin and create `branch` from it.
    fn create_from(&self, base: &str, branch: &str) -> Result<()>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl BranchOps for Git {
    #[instrument(skip_all, fields(branch = %branch))]
    fn checkout_existing(&self, branch: &str) -> Result<()> {
        debug!("fetching and checking out existing branch");
        self.run_checked(&["fetch", "origin", "--depth=20", branch])?;
        self.run_checked(&checkout_args(branch))?;
        Ok(())
    }

    #[instrument(skip_all, fields(base = %base, branch = %branch))]
    fn create_from(&self, base: &str, branch: &str) -> Result<()> {
        debug!("creating branch from remote base");
        self.run_checked(&["fetch", "origin", "--depth=1", &tracking_refspec(base)])?;
        let start = format!("refs/remotes/origin/{base}");
        self.run_checked(&["checkout", "-b", branch, &start])?;
        Ok(())
    }
}

/// `--` pins `branch` as a ref so a same-named path is never checked out.
fn checkout_args(branch: &str) -> [&str; 3] {
    ["checkout", branch, "--"]
}

/// Forced update of the remote-tracking ref for `base`.
fn tracking_refspec(base: &str) -> String {
    format!("+refs/heads/{base}:refs/remotes/origin/{base}")
}
