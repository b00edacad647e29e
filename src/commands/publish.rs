use anyhow::Result;
use colored::Colorize;
use tracing::warn;

use crate::App;
use crate::app::RepoOutcome;
use crate::ops::git::GitOps;
use crate::ops::gitea::CreateRepoOutcome;
use crate::ops::gitea::GiteaOps;
use crate::ops::stash::StashOps;

impl<S: StashOps, G: GitOps, P: GiteaOps> App<S, G, P> {
    /// Create each migrated repository on the destination server and push all
    /// branches and tags. Creation is best effort: a failure is reported and
    /// the push is still attempted. A failed branch push skips the tag push
    /// for that repository but never blocks the remaining repositories.
    pub async fn cmd_publish(
        &self,
        outcomes: &[RepoOutcome],
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(
            stdout,
            "pushing {} repositories to new remotes",
            outcomes.len()
        )?;

        for outcome in outcomes {
            if !outcome.is_clean() {
                warn!(
                    "publishing {} despite {} earlier step failures",
                    outcome.name,
                    outcome.errors.len()
                );
            }

            match self.gitea.create_repo(&outcome.name).await {
                Ok(CreateRepoOutcome::Created) => {
                    writeln!(stdout, "created {} on destination", outcome.name)?;
                }
                Ok(CreateRepoOutcome::AlreadyExists) => {
                    writeln!(stdout, "{} already exists on destination", outcome.name)?;
                }
                Err(err) => {
                    writeln!(
                        stdout,
                        "{}",
                        format!("failed to create {}: {:#}", outcome.name, err).red()
                    )?;
                }
            }

            writeln!(stdout, "pushing all branches and tags: {}", outcome.name)?;
            if let Err(err) = self.git.push_branches(&outcome.local_path).await {
                writeln!(
                    stdout,
                    "{}",
                    format!("failed to push branches for {}: {:#}", outcome.name, err).red()
                )?;
                continue;
            }
            if let Err(err) = self.git.push_tags(&outcome.local_path).await {
                writeln!(
                    stdout,
                    "{}",
                    format!("failed to push tags for {}: {:#}", outcome.name, err).red()
                )?;
            }
        }

        Ok(())
    }
}
