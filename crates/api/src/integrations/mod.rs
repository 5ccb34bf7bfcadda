//! Outbound integration clients
//!
//! Every client carries an explicit request timeout; failures surface
//! immediately with no retries.

pub mod gen_ai;
pub mod github;
pub mod media;

pub use gen_ai::GenAiClient;
pub use github::{extract_owner_and_repo, GithubClient};
pub use media::MediaStore;
