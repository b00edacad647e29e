#![allow(async_fn_in_trait)]

use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use super::curl::CurlClient;

// -----------------------------------------------------------------------------
// Types

/// Result of an idempotent create-repository request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRepoOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Serialize)]
struct CreateRepo<'a> {
    name: &'a str,
    private: bool,
}

#[derive(Debug, Deserialize)]
struct GiteaError {
    message: String,
}

// -----------------------------------------------------------------------------
// GiteaOps trait

/// Operations for interacting with the Gitea API
#[cfg_attr(test, automock)]
pub trait GiteaOps {
    /// Create a private repository in the configured organization.
    async fn create_repo(&self, name: &str) -> Result<CreateRepoOutcome>;
}

// -----------------------------------------------------------------------------
// RealGitea

/// Real implementation that calls the Gitea REST API
pub struct RealGitea {
    http_base: String,
    api_key: String,
    org: String,
    http_client: CurlClient,
}

impl RealGitea {
    pub fn new(http_base: String, api_key: String, org: String) -> Self {
        Self {
            http_base: http_base.trim_end_matches('/').to_string(),
            api_key,
            org,
            http_client: CurlClient::new(),
        }
    }

    fn repos_url(&self) -> String {
        format!(
            "{}/api/v1/org/{}/repos?token={}",
            self.http_base, self.org, self.api_key
        )
    }
}

impl GiteaOps for RealGitea {
    async fn create_repo(&self, name: &str) -> Result<CreateRepoOutcome> {
        let body = serde_json::to_string(&CreateRepo {
            name,
            private: true,
        })?;

        let response = self.http_client.post_json(&self.repos_url(), &body).await?;

        if response.is_success() {
            return Ok(CreateRepoOutcome::Created);
        }
        // 409 means the repository is already there, which is fine
        if response.status == 409 {
            return Ok(CreateRepoOutcome::AlreadyExists);
        }

        if let Ok(error) = serde_json::from_str::<GiteaError>(&response.body) {
            bail!("Gitea API error: {}", error.message);
        }
        bail!(
            "Gitea API request failed with status {}: {}",
            response.status,
            response.body
        );
    }
}
