//! Data models for the feed.
//!
//! Field names serialize in camelCase to match the documents in the store.

mod ad;
mod comment;
mod like;
mod notification;
mod post;
mod user;

pub use ad::*;
pub use comment::*;
pub use like::*;
pub use notification::*;
pub use post::*;
pub use user::*;
