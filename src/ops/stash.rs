#![allow(async_fn_in_trait)]

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::debug;

use super::curl::CurlClient;

/// Page size for repository listing requests
const PAGE_LIMIT: u32 = 100;

// -----------------------------------------------------------------------------
// Types

/// A repository as listed by the source server.
#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    links: Links,
}

#[derive(Debug, Clone, Deserialize)]
struct Links {
    clone: Vec<CloneLink>,
}

#[derive(Debug, Clone, Deserialize)]
struct CloneLink {
    href: String,
    name: String,
}

impl Repo {
    /// First clone link labelled "ssh", if any.
    pub fn ssh_url(&self) -> Option<&str> {
        self.links
            .clone
            .iter()
            .find(|link| link.name == "ssh")
            .map(|link| link.href.as_str())
    }

    #[cfg(test)]
    pub fn for_tests(name: &str, ssh_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            links: Links {
                clone: ssh_url
                    .map(|href| CloneLink {
                        href: href.to_string(),
                        name: "ssh".to_string(),
                    })
                    .into_iter()
                    .collect(),
            },
        }
    }
}

/// One page of the Bitbucket Server repository listing
#[derive(Debug, Deserialize)]
struct RepoPage {
    values: Vec<Repo>,
    #[serde(rename = "isLastPage")]
    is_last_page: bool,
    #[serde(rename = "nextPageStart")]
    next_page_start: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StashErrors {
    errors: Vec<StashError>,
}

#[derive(Debug, Deserialize)]
struct StashError {
    message: String,
}

// -----------------------------------------------------------------------------
// StashOps trait

/// Operations for interacting with the Bitbucket/Stash API
#[cfg_attr(test, automock)]
pub trait StashOps {
    /// List every repository in a project, following pagination.
    async fn list_repos(&self, project_key: &str) -> Result<Vec<Repo>>;
}

// -----------------------------------------------------------------------------
// RealStash

/// Real implementation that calls the Bitbucket Server REST API
pub struct RealStash {
    http_base: String,
    http_client: CurlClient,
}

impl RealStash {
    pub fn new(http_base: String, username: String, password: String) -> Self {
        Self {
            http_base: http_base.trim_end_matches('/').to_string(),
            http_client: CurlClient::with_basic_auth(username, password),
        }
    }

    fn page_url(&self, project_key: &str, start: u32) -> String {
        format!(
            "{}/rest/api/1.0/projects/{}/repos?start={}&limit={}",
            self.http_base, project_key, start, PAGE_LIMIT
        )
    }
}

impl StashOps for RealStash {
    async fn list_repos(&self, project_key: &str) -> Result<Vec<Repo>> {
        let mut repos = Vec::new();
        let mut start = 0;

        loop {
            let url = self.page_url(project_key, start);
            debug!("fetching {}", url);

            let response = self.http_client.get(&url).await?;
            if !response.is_success() {
                // Surface the server's own message when it sends one
                if let Ok(errors) = serde_json::from_str::<StashErrors>(&response.body) {
                    if let Some(error) = errors.errors.first() {
                        bail!("Bitbucket API error: {}", error.message);
                    }
                }
                bail!(
                    "Bitbucket API request failed with status {}: {}",
                    response.status,
                    response.body
                );
            }

            let page: RepoPage = serde_json::from_str(&response.body)
                .context("Failed to parse repository listing")?;
            repos.extend(page.values);

            if page.is_last_page {
                break;
            }
            match page.next_page_start {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(repos)
    }
}
