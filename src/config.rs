use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;

use crate::gitmodules;
use crate::gitmodules::Mapping;

/// Resolved and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bitbucket_http_base: String,
    pub bitbucket_username: String,
    pub bitbucket_project: String,
    /// Base HTTP URL of the Gitea instance, used by the publish phase
    pub gitea_http_base: String,
    /// Base SSH URL the new origin remotes are built from, e.g. "git@gitea.example.com:"
    pub gitea_ssh_base: String,
    pub gitea_api_key: String,
    pub gitea_org: String,
    pub gitmodule_mappings: Vec<Mapping>,
    pub working_dir: PathBuf,
    pub push: bool,
}

impl Config {
    /// SSH URL of a repository on the destination server. The base is
    /// concatenated as-is so scp-style bases ("git@host:") work unchanged.
    pub fn destination_url(&self, repo: &str) -> String {
        format!("{}{}/{}.git", self.gitea_ssh_base, self.gitea_org, repo)
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self {
            bitbucket_http_base: "https://stash.example.com".to_string(),
            bitbucket_username: "tester".to_string(),
            bitbucket_project: "PROJ".to_string(),
            gitea_http_base: "https://gitea.example.com".to_string(),
            gitea_ssh_base: "git@gitea.example.com:".to_string(),
            gitea_api_key: "key".to_string(),
            gitea_org: "myorg".to_string(),
            gitmodule_mappings: Vec::new(),
            working_dir: PathBuf::from("/tmp/repomover"),
            push: false,
        }
    }
}

/// Raw option values before merging and validation. Each field matches one
/// command-line flag and one key of the optional YAML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bitbucket_http_base: Option<String>,
    pub bitbucket_username: Option<String>,
    pub bitbucket_project: Option<String>,
    pub gitea_http_base: Option<String>,
    pub gitea_ssh_base: Option<String>,
    pub gitea_api_key: Option<String>,
    pub gitea_org: Option<String>,
    pub gitmodule_mappings: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub push: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Layer `overrides` on top of this config. Set fields in `overrides` win.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            bitbucket_http_base: overrides.bitbucket_http_base.or(self.bitbucket_http_base),
            bitbucket_username: overrides.bitbucket_username.or(self.bitbucket_username),
            bitbucket_project: overrides.bitbucket_project.or(self.bitbucket_project),
            gitea_http_base: overrides.gitea_http_base.or(self.gitea_http_base),
            gitea_ssh_base: overrides.gitea_ssh_base.or(self.gitea_ssh_base),
            gitea_api_key: overrides.gitea_api_key.or(self.gitea_api_key),
            gitea_org: overrides.gitea_org.or(self.gitea_org),
            gitmodule_mappings: overrides.gitmodule_mappings.or(self.gitmodule_mappings),
            working_dir: overrides.working_dir.or(self.working_dir),
            push: overrides.push.or(self.push),
        }
    }

    /// Validate required options and produce the resolved [`Config`].
    ///
    /// The Gitea HTTP base and API key are only needed by the publish phase,
    /// so they are checked when `push` is set.
    pub fn try_into_config(self) -> Result<Config> {
        let push = self.push.unwrap_or(false);

        let gitea_http_base = self.gitea_http_base.unwrap_or_default();
        let gitea_api_key = self.gitea_api_key.unwrap_or_default();
        if push {
            if gitea_http_base.is_empty() {
                bail!("--push requires --gitea-http-base");
            }
            if gitea_api_key.is_empty() {
                bail!("--push requires --gitea-api-key");
            }
        }

        let gitmodule_mappings =
            gitmodules::parse_mappings(self.gitmodule_mappings.as_deref().unwrap_or(""))?;

        Ok(Config {
            bitbucket_http_base: required(self.bitbucket_http_base, "--bitbucket-http-base")?,
            bitbucket_username: required(self.bitbucket_username, "--bitbucket-username")?,
            bitbucket_project: required(self.bitbucket_project, "--bitbucket-project")?,
            gitea_http_base,
            gitea_ssh_base: required(self.gitea_ssh_base, "--gitea-ssh-base")?,
            gitea_api_key,
            gitea_org: required(self.gitea_org, "--gitea-org")?,
            gitmodule_mappings,
            working_dir: self
                .working_dir
                .filter(|dir| !dir.as_os_str().is_empty())
                .context("missing required option --working-dir (or working_dir in the config file)")?,
            push,
        })
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    value.filter(|v| !v.is_empty()).with_context(|| {
        format!(
            "missing required option {} (or {} in the config file)",
            flag,
            flag.trim_start_matches('-').replace('-', "_")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_file_config() -> FileConfig {
        FileConfig {
            bitbucket_http_base: Some("https://stash.example.com".to_string()),
            bitbucket_username: Some("tester".to_string()),
            bitbucket_project: Some("PROJ".to_string()),
            gitea_http_base: Some("https://gitea.example.com".to_string()),
            gitea_ssh_base: Some("git@gitea.example.com:".to_string()),
            gitea_api_key: Some("key".to_string()),
            gitea_org: Some("myorg".to_string()),
            gitmodule_mappings: Some("old.org/ new.org/".to_string()),
            working_dir: Some(PathBuf::from("/tmp/work")),
            push: Some(true),
        }
    }

    #[test]
    fn test_merge_overrides_win() {
        let file = full_file_config();
        let overrides = FileConfig {
            bitbucket_project: Some("OTHER".to_string()),
            ..FileConfig::default()
        };
        let merged = file.merge(overrides);
        assert_eq!(merged.bitbucket_project.as_deref(), Some("OTHER"));
        assert_eq!(merged.bitbucket_username.as_deref(), Some("tester"));
    }

    #[test]
    fn test_resolve_full_config() {
        let config = full_file_config().try_into_config().unwrap();
        assert_eq!(config.bitbucket_project, "PROJ");
        assert_eq!(config.gitmodule_mappings.len(), 1);
        assert!(config.push);
    }

    #[test]
    fn test_missing_required_option() {
        let mut file = full_file_config();
        file.bitbucket_http_base = None;
        let err = file.try_into_config().unwrap_err();
        assert!(err.to_string().contains("--bitbucket-http-base"));
    }

    #[test]
    fn test_push_requires_gitea_api_key() {
        let mut file = full_file_config();
        file.gitea_api_key = None;
        let err = file.try_into_config().unwrap_err();
        assert!(err.to_string().contains("--gitea-api-key"));
    }

    #[test]
    fn test_gitea_options_not_required_without_push() {
        let mut file = full_file_config();
        file.gitea_http_base = None;
        file.gitea_api_key = None;
        file.push = None;
        let config = file.try_into_config().unwrap();
        assert!(!config.push);
        assert!(config.gitea_http_base.is_empty());
    }

    #[test]
    fn test_destination_url() {
        let config = Config::default_for_tests();
        assert_eq!(
            config.destination_url("svc-a"),
            "git@gitea.example.com:myorg/svc-a.git"
        );
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repomover.yml");
        std::fs::write(
            &path,
            "bitbucket_project: PROJ\npush: true\ngitmodule_mappings: |\n  old.org/ new.org/\n",
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.bitbucket_project.as_deref(), Some("PROJ"));
        assert_eq!(file.push, Some(true));
        assert!(file.gitmodule_mappings.unwrap().contains("old.org/"));
    }
}
