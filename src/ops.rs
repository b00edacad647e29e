//! Operations modules for interacting with external systems.
//!
//! This module contains the integration layers for the three systems that `repomover`
//! coordinates:
//!
//! - [`stash`]: Bitbucket/Stash repository listing via the paginated REST API
//! - [`gitea`]: Gitea repository creation via the organization API
//! - [`git`]: Local git operations (clone, pull, branch tracking, remotes, pushing)
//! - [`curl`]: Curl-based HTTP client shared by the two server clients
//!
//! Each server-facing submodule provides a trait-based abstraction with real and mock
//! implementations to support both production use and testing.

pub mod curl;
pub mod git;
pub mod gitea;
pub mod stash;
