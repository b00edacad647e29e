use anyhow::Context;
use anyhow::Result;
use colored::Colorize;
use tracing::warn;

use crate::App;
use crate::app::MOVED_MARKER;
use crate::app::MigrationStep;
use crate::app::RepoOutcome;
use crate::ops::git::GitOps;
use crate::ops::gitea::GiteaOps;
use crate::ops::stash::StashOps;

impl<S: StashOps, G: GitOps, P: GiteaOps> App<S, G, P> {
    /// List the source project's repositories and bring a local copy of each
    /// one up to date, pointed at the destination server.
    ///
    /// One repository's failure never aborts the run: a failed clone or pull
    /// drops the repository from the result list, any later step failure is
    /// recorded on its outcome and the loop moves on.
    pub async fn cmd_migrate(&self, stdout: &mut impl std::io::Write) -> Result<Vec<RepoOutcome>> {
        let working_dir = &self.config.working_dir;
        tokio::fs::create_dir_all(working_dir)
            .await
            .with_context(|| {
                format!("failed to create working directory {}", working_dir.display())
            })?;

        let repos = self
            .stash
            .list_repos(&self.config.bitbucket_project)
            .await
            .context("failed to list source repositories")?;
        writeln!(
            stdout,
            "found {} repositories in project {}",
            repos.len(),
            self.config.bitbucket_project
        )?;

        let mut outcomes = Vec::new();
        for repo in &repos {
            if repo.name.contains(MOVED_MARKER) {
                writeln!(stdout, "skipping {}: already moved", repo.name)?;
                continue;
            }
            let Some(ssh_url) = repo.ssh_url() else {
                warn!("repository {} has no ssh clone link", repo.name);
                writeln!(stdout, "skipping {}: no ssh clone link", repo.name)?;
                continue;
            };

            let local_path = working_dir.join(&repo.name);
            let synced = if local_path.exists() {
                writeln!(stdout, "updating {}", repo.name)?;
                self.git.pull_rebase(&local_path).await
            } else {
                writeln!(stdout, "cloning {}", repo.name)?;
                self.git.clone_repo(working_dir, ssh_url, &repo.name).await
            };
            if let Err(err) = synced {
                writeln!(
                    stdout,
                    "{}",
                    format!("failed to sync {}: {:#}", repo.name, err).red()
                )?;
                continue;
            }

            let mut outcome = RepoOutcome::new(repo.name.clone(), local_path.clone());

            match self.materialize_branches(&local_path).await {
                Ok(created) if created > 0 => {
                    writeln!(stdout, "created {} tracking branches", created)?;
                }
                Ok(_) => {}
                Err(err) => {
                    self.report_step_error(&mut outcome, MigrationStep::Branches, err, stdout)?;
                }
            }

            let destination = self.config.destination_url(&repo.name);
            match self
                .git
                .set_remote_url(&local_path, "origin", &destination)
                .await
            {
                Ok(()) => writeln!(stdout, "origin -> {}", destination)?,
                Err(err) => {
                    self.report_step_error(&mut outcome, MigrationStep::Remote, err, stdout)?;
                }
            }

            match self.rewrite_gitmodules(&local_path).await {
                Ok(true) => writeln!(stdout, "rewrote gitmodules for {}", repo.name)?,
                Ok(false) => {}
                Err(err) => {
                    self.report_step_error(&mut outcome, MigrationStep::Gitmodules, err, stdout)?;
                }
            }

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn report_step_error(
        &self,
        outcome: &mut RepoOutcome,
        step: MigrationStep,
        err: anyhow::Error,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(
            stdout,
            "{}",
            format!("{} failed for {}: {:#}", step, outcome.name, err).red()
        )?;
        outcome.record_error(step, &err);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use crate::App;
    use crate::config::Config;
    use crate::ops::git::MockGitOps;
    use crate::ops::gitea::MockGiteaOps;
    use crate::ops::stash::MockStashOps;
    use crate::ops::stash::Repo;

    fn test_app(
        stash: MockStashOps,
        git: MockGitOps,
        working_dir: &std::path::Path,
    ) -> App<MockStashOps, MockGitOps, MockGiteaOps> {
        let mut config = Config::default_for_tests();
        config.working_dir = working_dir.to_path_buf();
        App::new(config, stash, git, MockGiteaOps::new())
    }

    fn no_branches(git: &mut MockGitOps) {
        git.expect_remote_branches().returning(|_| Ok(Vec::new()));
        git.expect_local_branches().returning(|_| Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_moved_repositories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();

        let mut stash = MockStashOps::new();
        stash.expect_list_repos().returning(|_| {
            Ok(vec![
                Repo::for_tests("svc-a", Some("ssh://git@stash.example.com/proj/svc-a.git")),
                Repo::for_tests("svc-b-MOVED", Some("ssh://git@stash.example.com/proj/svc-b.git")),
            ])
        });

        let mut git = MockGitOps::new();
        git.expect_clone_repo()
            .withf(|_, url, name| {
                name == "svc-a" && url == "ssh://git@stash.example.com/proj/svc-a.git"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        no_branches(&mut git);
        git.expect_set_remote_url().returning(|_, _, _| Ok(()));

        let app = test_app(stash, git, dir.path());
        let mut out = Vec::new();
        let outcomes = app.cmd_migrate(&mut out).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "svc-a");
        assert_eq!(outcomes[0].local_path, dir.path().join("svc-a"));
        assert!(outcomes[0].is_clean());

        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        found 2 repositories in project PROJ
        cloning svc-a
        origin -> git@gitea.example.com:myorg/svc-a.git
        skipping svc-b-MOVED: already moved
        ");
    }

    #[tokio::test]
    async fn test_missing_ssh_link_is_skipped() {
        let dir = tempfile::tempdir().unwrap();

        let mut stash = MockStashOps::new();
        stash
            .expect_list_repos()
            .returning(|_| Ok(vec![Repo::for_tests("svc-a", None)]));

        let app = test_app(stash, MockGitOps::new(), dir.path());
        let mut out = Vec::new();
        let outcomes = app.cmd_migrate(&mut out).await.unwrap();

        assert!(outcomes.is_empty());
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        found 1 repositories in project PROJ
        skipping svc-a: no ssh clone link
        ");
    }

    #[tokio::test]
    async fn test_existing_checkout_is_updated_in_place() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("svc-a")).unwrap();

        let mut stash = MockStashOps::new();
        stash.expect_list_repos().returning(|_| {
            Ok(vec![Repo::for_tests("svc-a", Some("ssh://example/svc-a.git"))])
        });

        let mut git = MockGitOps::new();
        git.expect_pull_rebase().times(1).returning(|_| Ok(()));
        no_branches(&mut git);
        git.expect_set_remote_url().returning(|_, _, _| Ok(()));

        let app = test_app(stash, git, dir.path());
        let mut out = Vec::new();
        let outcomes = app.cmd_migrate(&mut out).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(String::from_utf8(out).unwrap().contains("updating svc-a"));
    }

    #[tokio::test]
    async fn test_failed_sync_excludes_repository() {
        let dir = tempfile::tempdir().unwrap();

        let mut stash = MockStashOps::new();
        stash.expect_list_repos().returning(|_| {
            Ok(vec![
                Repo::for_tests("svc-a", Some("ssh://example/svc-a.git")),
                Repo::for_tests("svc-b", Some("ssh://example/svc-b.git")),
            ])
        });

        let mut git = MockGitOps::new();
        git.expect_clone_repo()
            .returning(|_, _, name: &str| match name {
                "svc-a" => Err(anyhow!("host unreachable")),
                _ => Ok(()),
            });
        no_branches(&mut git);
        git.expect_set_remote_url().returning(|_, _, _| Ok(()));

        let app = test_app(stash, git, dir.path());
        let mut out = Vec::new();
        let outcomes = app.cmd_migrate(&mut out).await.unwrap();

        // svc-a dropped, svc-b still processed
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "svc-b");
        assert!(
            String::from_utf8(out)
                .unwrap()
                .contains("failed to sync svc-a: host unreachable")
        );
    }

    #[tokio::test]
    async fn test_step_failure_is_recorded_but_repository_kept() {
        let dir = tempfile::tempdir().unwrap();

        let mut stash = MockStashOps::new();
        stash.expect_list_repos().returning(|_| {
            Ok(vec![Repo::for_tests("svc-a", Some("ssh://example/svc-a.git"))])
        });

        let mut git = MockGitOps::new();
        git.expect_clone_repo().returning(|_, _, _| Ok(()));
        no_branches(&mut git);
        git.expect_set_remote_url()
            .returning(|_, _, _| Err(anyhow!("no such remote")));

        let app = test_app(stash, git, dir.path());
        let mut out = Vec::new();
        let outcomes = app.cmd_migrate(&mut out).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_clean());
        assert_eq!(outcomes[0].errors.len(), 1);
        assert_eq!(
            outcomes[0].errors[0].step,
            crate::app::MigrationStep::Remote
        );
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let mut stash = MockStashOps::new();
        stash
            .expect_list_repos()
            .returning(|_| Err(anyhow!("connection refused")));

        let app = test_app(stash, MockGitOps::new(), dir.path());
        let mut out = Vec::new();
        assert!(app.cmd_migrate(&mut out).await.is_err());
    }
}
