//! Repository-file configuration loader (spec section 4.6): cascading YAML
//! resolution across the organization `.github` repository, the target
//! repository's `.github/` directory, and its root, plus bounded `_extends`
//! inheritance.

use async_trait::async_trait;
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::error::ConfigLoaderError;
use crate::model::RepositoryConfigPath;

/// How array values merge when both a parent and child configuration
/// contain the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMergeStrategy {
    /// Child's array wins outright (default).
    Replace,
    /// Parent's array followed by the child's.
    Concatenate,
    /// Pairwise merge by index; child wins at index mismatches and when an
    /// index exists only in the child.
    DeepMergeByIndex,
}

impl Default for ArrayMergeStrategy {
    fn default() -> Self {
        Self::Replace
    }
}

/// Toggles and limits for the loader, matching the "Repository config"
/// entries of spec section 6.
#[derive(Debug, Clone)]
pub struct RepositoryConfigOptions {
    pub enable_github_directory_cascade: bool,
    pub enable_organization_config: bool,
    pub enable_extends_key: bool,
    pub max_extends_depth: u8,
    pub array_merge_strategy: ArrayMergeStrategy,
    pub default_file_name: String,
    pub cache_ttl: Duration,
}

impl Default for RepositoryConfigOptions {
    fn default() -> Self {
        Self {
            enable_github_directory_cascade: true,
            enable_organization_config: true,
            enable_extends_key: true,
            max_extends_depth: 3,
            array_merge_strategy: ArrayMergeStrategy::Replace,
            default_file_name: "config.yml".to_string(),
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// Fetches raw file bytes for a repository path. The only I/O seam this
/// loader needs; concrete GitHub REST/GraphQL bindings live outside this
/// crate.
#[async_trait]
pub trait RepositoryContentFetcher: Send + Sync {
    /// Returns `Ok(None)` when the file does not exist (not an error case:
    /// most cascade levels are expected to be absent).
    async fn fetch(&self, path: &RepositoryConfigPath) -> Result<Option<Vec<u8>>, ConfigLoaderError>;
}

struct CacheEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// TTL cache keyed by `(owner, repo, path, ref)`, matching the `expires_at`
/// pattern `github_bot_sdk`'s token cache uses rather than pulling in a new
/// caching crate.
#[derive(Default)]
struct ContentCache {
    entries: RwLock<HashMap<(String, String, String, Option<String>), CacheEntry>>,
}

impl ContentCache {
    fn get(&self, path: &RepositoryConfigPath) -> Option<Vec<u8>> {
        let entries = self.entries.read().ok()?;
        let key = Self::key(path);
        let entry = entries.get(&key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.bytes.clone())
        } else {
            None
        }
    }

    fn put(&self, path: &RepositoryConfigPath, bytes: Vec<u8>, ttl: Duration) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                Self::key(path),
                CacheEntry {
                    bytes,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }

    fn key(path: &RepositoryConfigPath) -> (String, String, String, Option<String>) {
        (
            path.owner.clone(),
            path.repository.clone(),
            path.path.clone(),
            path.git_ref.clone(),
        )
    }
}

/// Resolves a YAML configuration for `(owner, repo, file)`, applying
/// GitHub-style cascade and bounded `_extends` inheritance.
pub struct RepositoryConfigLoader {
    fetcher: std::sync::Arc<dyn RepositoryContentFetcher>,
    options: RepositoryConfigOptions,
    cache: ContentCache,
}

impl RepositoryConfigLoader {
    pub fn new(fetcher: std::sync::Arc<dyn RepositoryContentFetcher>, options: RepositoryConfigOptions) -> Self {
        Self {
            fetcher,
            options,
            cache: ContentCache::default(),
        }
    }

    /// Resolves `file` for `(owner, repo)`: cascade, then `_extends`.
    pub async fn load(&self, owner: &str, repo: &str, file: &str) -> Result<Value, ConfigLoaderError> {
        let merged = self.load_cascade(owner, repo, file).await?;
        if self.options.enable_extends_key {
            self.resolve_extends(merged, owner, 0).await
        } else {
            Ok(strip_extends(merged))
        }
    }

    async fn fetch_cached(&self, path: &RepositoryConfigPath) -> Result<Option<Value>, ConfigLoaderError> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(Some(parse_yaml(path, &cached)?));
        }
        let Some(bytes) = self.fetcher.fetch(path).await? else {
            return Ok(None);
        };
        self.cache.put(path, bytes.clone(), self.options.cache_ttl);
        Ok(Some(parse_yaml(path, &bytes)?))
    }

    /// Least to most specific: organization `.github` repo, then the target
    /// repository's `.github/<file>`, then the target repository's root
    /// `<file>`. Each present level is merged "more specific wins" over the
    /// previous result.
    async fn load_cascade(&self, owner: &str, repo: &str, file: &str) -> Result<Value, ConfigLoaderError> {
        let mut merged = Value::Null;

        if self.options.enable_organization_config {
            let org_path = RepositoryConfigPath::organization_default(owner, file);
            if let Some(value) = self.fetch_cached(&org_path).await? {
                merged = merge(merged, value, self.options.array_merge_strategy);
            }
        }

        if self.options.enable_github_directory_cascade {
            let dot_github_path = RepositoryConfigPath::dot_github(owner, repo, file);
            if let Some(value) = self.fetch_cached(&dot_github_path).await? {
                merged = merge(merged, value, self.options.array_merge_strategy);
            }
        }

        let root_path = RepositoryConfigPath::root(owner, repo, file);
        if let Some(value) = self.fetch_cached(&root_path).await? {
            merged = merge(merged, value, self.options.array_merge_strategy);
        }

        Ok(merged)
    }

    /// If `merged` contains `_extends`, parses it as `owner/repo[:file]`
    /// (owner defaults to `default_owner`, file to `default_file_name`),
    /// loads the parent, recursively resolves the parent's own `_extends`,
    /// and merges parent-first (i.e. `merged` wins). The `_extends` key
    /// itself is always stripped from the output. Depth is capped at
    /// `max_extends_depth`; exceeding it stops resolution without error.
    #[async_recursion::async_recursion]
    async fn resolve_extends(
        &self,
        merged: Value,
        default_owner: &str,
        depth: u8,
    ) -> Result<Value, ConfigLoaderError> {
        let Some(extends_value) = merged.get("_extends").and_then(Value::as_str).map(str::to_string) else {
            return Ok(strip_extends(merged));
        };

        if depth >= self.options.max_extends_depth {
            return Ok(strip_extends(merged));
        }

        let (owner, repo_file) = match extends_value.split_once('/') {
            Some((o, rest)) => (o.to_string(), rest.to_string()),
            None => (default_owner.to_string(), extends_value.clone()),
        };
        let (repo, file) = match repo_file.split_once(':') {
            Some((r, f)) => (r.to_string(), f.to_string()),
            None => (repo_file, self.options.default_file_name.clone()),
        };
        if repo.is_empty() {
            return Err(ConfigLoaderError::InvalidExtendsReference { value: extends_value });
        }

        let parent = self.load_cascade(&owner, &repo, &file).await?;
        let parent = self.resolve_extends(parent, &owner, depth + 1).await?;

        Ok(merge(parent, strip_extends(merged), self.options.array_merge_strategy))
    }
}

fn parse_yaml(path: &RepositoryConfigPath, bytes: &[u8]) -> Result<Value, ConfigLoaderError> {
    serde_yaml::from_slice(bytes).map_err(|e| ConfigLoaderError::ParseFailed {
        owner: path.owner.clone(),
        repo: path.repository.clone(),
        path: path.path.clone(),
        message: e.to_string(),
    })
}

fn strip_extends(mut value: Value) -> Value {
    if let Value::Mapping(map) = &mut value {
        map.remove(Value::String("_extends".to_string()));
    }
    value
}

/// Deep merge: objects merge key-by-key (more specific wins recursively),
/// arrays follow `strategy`, scalars let `child` win. A `Null` on either
/// side yields the other side.
fn merge(parent: Value, child: Value, strategy: ArrayMergeStrategy) -> Value {
    match (parent, child) {
        (Value::Null, child) => child,
        (parent, Value::Null) => parent,
        (Value::Mapping(mut parent_map), Value::Mapping(child_map)) => {
            for (key, child_value) in child_map {
                let merged_value = match parent_map.remove(&key) {
                    Some(parent_value) => merge(parent_value, child_value, strategy),
                    None => child_value,
                };
                parent_map.insert(key, merged_value);
            }
            Value::Mapping(parent_map)
        }
        (Value::Sequence(parent_seq), Value::Sequence(child_seq)) => match strategy {
            ArrayMergeStrategy::Replace => Value::Sequence(child_seq),
            ArrayMergeStrategy::Concatenate => {
                let mut combined = parent_seq;
                combined.extend(child_seq);
                Value::Sequence(combined)
            }
            ArrayMergeStrategy::DeepMergeByIndex => {
                let mut combined = Vec::with_capacity(parent_seq.len().max(child_seq.len()));
                let mut parent_iter = parent_seq.into_iter();
                let mut child_iter = child_seq.into_iter();
                loop {
                    match (parent_iter.next(), child_iter.next()) {
                        (Some(p), Some(c)) => combined.push(merge(p, c, strategy)),
                        (Some(p), None) => combined.push(p),
                        (None, Some(c)) => combined.push(c),
                        (None, None) => break,
                    }
                }
                Value::Sequence(combined)
            }
        },
        // Scalars, or a type mismatch between levels: child wins outright.
        (_, child) => child,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
