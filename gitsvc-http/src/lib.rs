//! gitsvc HTTP - Read API over the mirrored repository
//!
//! Routes:
//! - `GET /file?path=<relative>&format=json|yaml` - File contents
//! - `GET /tree?format=json|yaml`                 - Every file in the working copy
//! - `GET /update`                                - Pull from the remote
//!
//! Every read response carries the current commit hash and timestamp, plus
//! `offline: true` when either could not be determined.

pub mod dispatch;
mod error;
pub mod handler;
mod response;
#[cfg(test)]
mod testutil;

pub use dispatch::CommitInfo;
pub use error::AppError;
pub use handler::{create_router, AppState};
pub use response::{FileResponse, Format, Negotiated, TreeResponse, UpdateResponse};
