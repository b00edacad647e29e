#![allow(async_fn_in_trait)]

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations for interacting with local git checkouts
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Clone `url` into `working_dir/name`.
    async fn clone_repo(&self, working_dir: &Path, url: &str, name: &str) -> Result<()>;

    /// Update an existing checkout with `git pull --rebase`.
    async fn pull_rebase(&self, repo: &Path) -> Result<()>;

    /// List remote-tracking branches with the "origin/" prefix stripped
    /// (e.g. ["HEAD", "master", "feature/x"]).
    async fn remote_branches(&self, repo: &Path) -> Result<Vec<String>>;

    /// List local branch names.
    async fn local_branches(&self, repo: &Path) -> Result<Vec<String>>;

    /// Create a local branch tracking `origin/<branch>`.
    async fn track_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    async fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;

    /// Commit all tracked changes.
    async fn commit_all(&self, repo: &Path, message: &str) -> Result<()>;

    /// Push all local branches to origin.
    async fn push_branches(&self, repo: &Path) -> Result<()>;

    /// Push all tags to origin.
    async fn push_tags(&self, repo: &Path) -> Result<()>;
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
pub struct RealGit;

impl GitOps for RealGit {
    async fn clone_repo(&self, working_dir: &Path, url: &str, name: &str) -> Result<()> {
        let output = Command::new("git")
            .current_dir(working_dir)
            .args(["clone", url, name])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn pull_rebase(&self, repo: &Path) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["pull", "--rebase"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn remote_branches(&self, repo: &Path) -> Result<Vec<String>> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["branch", "-r", "--format=%(refname:short)"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let branches: Vec<String> = String::from_utf8(output.stdout)?
            .lines()
            .filter_map(|line| line.trim().strip_prefix("origin/").map(|s| s.to_string()))
            .collect();

        Ok(branches)
    }

    async fn local_branches(&self, repo: &Path) -> Result<Vec<String>> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["branch", "--format=%(refname:short)"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let branches: Vec<String> = String::from_utf8(output.stdout)?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        Ok(branches)
    }

    async fn track_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["branch", "--track", branch, &format!("origin/{}", branch)])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["remote", "set-url", remote, url])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn commit_all(&self, repo: &Path, message: &str) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["commit", "-a", "-m", message])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn push_branches(&self, repo: &Path) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["push", "--all"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn push_tags(&self, repo: &Path) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(["push", "--tags"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }
}
