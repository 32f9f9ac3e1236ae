//! Blog REST client.

use crate::error::{BlogError, BlogResult};
use crate::types::{Blog, BlogPage, NewBlog};
use serde::de::DeserializeOwned;
use session_core::{ApiRequest, ApiResponse, HttpGateway};
use tracing::{debug, info};

const LIST: &str = "blogs/";
const CREATE: &str = "blogs/create/";

fn detail_path(id: u64) -> String {
    format!("blogs/{}/", id)
}

fn edit_path(id: u64) -> String {
    format!("blogs/{}/edit/", id)
}

/// Typed access to the blog endpoints.
#[derive(Clone)]
pub struct BlogClient {
    gateway: HttpGateway,
}

impl BlogClient {
    pub fn new(gateway: HttpGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    /// Fetch one page of blogs. `None` lets the backend pick the first page.
    pub async fn list(&self, page: Option<u32>) -> BlogResult<BlogPage> {
        let mut request = ApiRequest::get(LIST);
        if let Some(page) = page {
            request = request.with_query("page", page.to_string());
        }

        let response = self.gateway.send(request).await?;
        let page: BlogPage = parse(response)?;
        debug!(count = page.count, returned = page.results.len(), "Fetched blog page");
        Ok(page)
    }

    pub async fn get(&self, id: u64) -> BlogResult<Blog> {
        let response = self.gateway.send(ApiRequest::get(detail_path(id))).await?;
        parse(response)
    }

    pub async fn create(&self, blog: &NewBlog) -> BlogResult<Blog> {
        let request = ApiRequest::post(CREATE, blog)?;
        let created: Blog = parse(self.gateway.send(request).await?)?;
        info!(blog_id = created.id, "Blog created");
        Ok(created)
    }

    pub async fn update(&self, id: u64, blog: &NewBlog) -> BlogResult<Blog> {
        let request = ApiRequest::put(edit_path(id), blog)?;
        let updated: Blog = parse(self.gateway.send(request).await?)?;
        info!(blog_id = id, "Blog updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> BlogResult<()> {
        let response = self
            .gateway
            .send(ApiRequest::delete(edit_path(id)))
            .await?;
        check_status(&response)?;
        info!(blog_id = id, "Blog deleted");
        Ok(())
    }
}

fn check_status(response: &ApiResponse) -> BlogResult<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(match response.status {
        400 => {
            let body = response.error_body();
            BlogError::Validation {
                message: body
                    .summary()
                    .unwrap_or_else(|| "invalid blog".to_string()),
                fields: body.fields,
            }
        }
        403 => BlogError::Forbidden(response.error_message()),
        404 => BlogError::NotFound,
        status => BlogError::Http {
            status,
            message: response.error_message(),
        },
    })
}

fn parse<T: DeserializeOwned>(response: ApiResponse) -> BlogResult<T> {
    check_status(&response)?;
    serde_json::from_str(&response.body)
        .map_err(|e| BlogError::Decode(format!("status {}: {}", response.status, e)))
}
