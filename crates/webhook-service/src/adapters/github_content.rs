//! Bridges `github_bot_sdk::GitHubClient` to webhook-core's
//! `RepositoryContentFetcher`, the only I/O seam the repository config
//! loader needs. A 404 response becomes `Ok(None)`, matching the port's
//! "most cascade levels are expected to be absent" contract.

use std::sync::Arc;

use async_trait::async_trait;

use github_bot_sdk::client::GitHubClient;
use github_bot_sdk::error::ApiError;
use github_bot_sdk::AuthenticationProvider;
use webhook_core::config::RepositoryContentFetcher;
use webhook_core::error::ConfigLoaderError;
use webhook_core::model::RepositoryConfigPath;

pub struct GitHubContentFetcher {
    client: Arc<GitHubClient>,
    auth: Arc<dyn AuthenticationProvider>,
}

impl GitHubContentFetcher {
    pub fn new(client: Arc<GitHubClient>, auth: Arc<dyn AuthenticationProvider>) -> Self {
        Self { client, auth }
    }
}

#[async_trait]
impl RepositoryContentFetcher for GitHubContentFetcher {
    async fn fetch(&self, path: &RepositoryConfigPath) -> Result<Option<Vec<u8>>, ConfigLoaderError> {
        let jwt = self.auth.app_token().await.map_err(|e| ConfigLoaderError::FetchFailed {
            owner: path.owner.clone(),
            repo: path.repository.clone(),
            path: path.path.clone(),
            message: format!("failed to obtain app token: {e}"),
        })?;

        let result = self
            .client
            .get_repository_content(&path.owner, &path.repository, &path.path, path.git_ref.as_deref(), &jwt)
            .await;

        match result {
            Ok(content) => Ok(Some(content.content)),
            Err(ApiError::HttpError { status: 404, .. }) => Ok(None),
            Err(e) => Err(ConfigLoaderError::FetchFailed {
                owner: path.owner.clone(),
                repo: path.repository.clone(),
                path: path.path.clone(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "github_content_tests.rs"]
mod tests;
