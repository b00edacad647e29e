use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

use crate::config::Config;
use crate::gitmodules;
use crate::gitmodules::GITMODULES_FILE;
use crate::ops::git::GitOps;
use crate::ops::gitea::GiteaOps;
use crate::ops::stash::StashOps;

/// Repositories whose name carries this marker are already migrated
pub const MOVED_MARKER: &str = "MOVED";

/// Commit message used for submodule configuration rewrites
pub const GITMODULES_COMMIT_MESSAGE: &str = "update gitmodules";

pub struct App<S, G, P> {
    pub config: Config,
    pub stash: S,
    pub git: G,
    pub gitea: P,
}

impl<S: StashOps, G: GitOps, P: GiteaOps> App<S, G, P> {
    pub fn new(config: Config, stash: S, git: G, gitea: P) -> Self {
        Self {
            config,
            stash,
            git,
            gitea,
        }
    }
}

// -----------------------------------------------------------------------------
// Per-repository outcome

/// Migration step that can fail without excluding the repository from the
/// result list. The clone/update step is not listed here: its failure drops
/// the repository entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    Branches,
    Remote,
    Gitmodules,
}

impl Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationStep::Branches => f.write_str("branch materialization"),
            MigrationStep::Remote => f.write_str("remote rewrite"),
            MigrationStep::Gitmodules => f.write_str("gitmodules rewrite"),
        }
    }
}

#[derive(Debug)]
pub struct StepError {
    pub step: MigrationStep,
    pub message: String,
}

/// Record of one migrated repository, consumed by the publish phase.
#[derive(Debug)]
pub struct RepoOutcome {
    pub name: String,
    pub local_path: PathBuf,
    pub errors: Vec<StepError>,
}

impl RepoOutcome {
    pub fn new(name: String, local_path: PathBuf) -> Self {
        Self {
            name,
            local_path,
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, step: MigrationStep, error: &anyhow::Error) {
        self.errors.push(StepError {
            step,
            message: format!("{error:#}"),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Shared helper methods for App

impl<S: StashOps, G: GitOps, P: GiteaOps> App<S, G, P> {
    /// Create a local tracking branch for every remote branch except HEAD and
    /// master. Branches that already exist locally are left alone, so re-runs
    /// are no-ops. Returns the number of branches created.
    pub(crate) async fn materialize_branches(&self, repo: &Path) -> Result<usize> {
        let remote = self.git.remote_branches(repo).await?;
        let local = self.git.local_branches(repo).await?;

        let mut created = 0;
        for branch in &remote {
            if branch == "HEAD" || branch == "master" {
                continue;
            }
            if local.contains(branch) {
                continue;
            }
            self.git
                .track_branch(repo, branch)
                .await
                .with_context(|| format!("failed to track branch {branch}"))?;
            created += 1;
        }

        Ok(created)
    }

    /// Apply the configured mappings to the checkout's submodule configuration
    /// and commit the result. Returns true when a commit was made; false when
    /// the file is absent or no mapping matched.
    pub(crate) async fn rewrite_gitmodules(&self, repo: &Path) -> Result<bool> {
        let path = repo.join(GITMODULES_FILE);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }

        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let rewritten = gitmodules::apply_mappings(&text, &self.config.gitmodule_mappings);
        if rewritten == text {
            return Ok(false);
        }

        tokio::fs::write(&path, &rewritten)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.git.commit_all(repo, GITMODULES_COMMIT_MESSAGE).await?;

        Ok(true)
    }
}
