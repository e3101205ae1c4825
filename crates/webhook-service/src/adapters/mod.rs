//! Concrete I/O adapters satisfying webhook-core's ports. `in_memory_queue`
//! backs `persistence.provider = "in_memory"` / `replay_queue.provider =
//! "in_memory"` (the default); `filesystem_queue` backs the filesystem
//! providers, grounded on the teacher's atomic write-then-rename pattern.
//! `github_content` bridges the GitHub API client into the repository
//! config loader's `RepositoryContentFetcher` port. Redis/Postgres/SQLite
//! providers are rejected at config-validation time (see `crate::config`),
//! so no adapter for them lives here.

pub mod filesystem_queue;
pub mod github_content;
pub mod in_memory_queue;

pub use filesystem_queue::FilesystemDeadLetterStore as FilesystemDeadLetterQueue;
pub use filesystem_queue::FilesystemReplayQueue;
pub use github_content::GitHubContentFetcher;
pub use in_memory_queue::InMemoryReplayQueue;
