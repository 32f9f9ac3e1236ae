//! Blog resource types as serialized by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A published blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Author's username.
    #[serde(deserialize_with = "author_name")]
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Blog {
    /// Whether `username` wrote this post.
    ///
    /// Display hint only; the backend decides who may edit.
    pub fn is_authored_by(&self, username: Option<&str>) -> bool {
        username.is_some_and(|name| name == self.author)
    }

    /// First `max_chars` characters of the content, with an ellipsis when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// One page of the paginated blog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPage {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Blog>,
}

impl BlogPage {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// Body for create and edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBlog {
    pub title: String,
    pub content: String,
}

impl NewBlog {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// The author arrives as a username string, a nested user object, or a bare id.
fn author_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAuthor {
        Name(String),
        Id(u64),
        User { username: String },
    }

    Ok(match RawAuthor::deserialize(deserializer)? {
        RawAuthor::Name(name) => name,
        RawAuthor::Id(id) => id.to_string(),
        RawAuthor::User { username } => username,
    })
}
