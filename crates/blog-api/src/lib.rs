//! Blog resource client for the Quill backend.
//!
//! Every call goes through [`session_core::HttpGateway`], so requests carry
//! the current access token and survive a single expired-token renewal.

mod client;
mod error;
mod types;

pub use client::BlogClient;
pub use error::{BlogError, BlogResult};
pub use types::{Blog, BlogPage, NewBlog};
