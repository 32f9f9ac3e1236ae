//! Blog commands.

use super::{blog_failure, confirm, App};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use blog_api::{Blog, BlogError, NewBlog};
use session_core::Route;

const EXCERPT_CHARS: usize = 60;

fn print_blog(blog: &Blog, username: Option<&str>) {
    output::print_heading(&blog.title);
    output::print_row("ID", &blog.id.to_string());
    let author = if blog.is_authored_by(username) {
        format!("{} (you)", blog.author)
    } else {
        blog.author.clone()
    };
    output::print_row("Author", &author);
    output::print_row("Created", &blog.created_at.format("%Y-%m-%d %H:%M").to_string());
    if let Some(updated) = blog.updated_at {
        output::print_row("Updated", &updated.format("%Y-%m-%d %H:%M").to_string());
    }
    println!();
    println!("{}", blog.content);
}

fn current_username(app: &App) -> Option<String> {
    app.session.identity().and_then(|i| i.display_name)
}

/// List one page of blogs.
pub async fn blogs_list(app: &App, page: Option<u32>, format: &OutputFormat) -> Result<()> {
    let listing = app.blogs.list(page).await.map_err(blog_failure)?;

    match format {
        OutputFormat::Text => {
            if listing.results.is_empty() {
                println!("No blogs found");
                return Ok(());
            }
            println!("{:<6} {:<30} {:<16} {}", "ID", "Title", "Author", "Created");
            println!("{}", "-".repeat(80));
            for blog in &listing.results {
                println!(
                    "{:<6} {:<30} {:<16} {}",
                    blog.id,
                    blog.title,
                    blog.author,
                    blog.created_at.format("%Y-%m-%d")
                );
                println!("       {}", blog.excerpt(EXCERPT_CHARS));
            }
            println!();
            println!(
                "Showing {} of {} posts{}",
                listing.results.len(),
                listing.count,
                if listing.has_next() {
                    format!(", next: --page {}", page.unwrap_or(1) + 1)
                } else {
                    String::new()
                }
            );
        }
        OutputFormat::Json => output::print_json(&listing),
    }
    Ok(())
}

/// Show one blog.
pub async fn blogs_show(app: &App, id: u64, format: &OutputFormat) -> Result<()> {
    match app.blogs.get(id).await {
        Ok(blog) => {
            match format {
                OutputFormat::Text => print_blog(&blog, current_username(app).as_deref()),
                OutputFormat::Json => output::print_json(&blog),
            }
            Ok(())
        }
        Err(BlogError::NotFound) => bail!("Blog {} not found", id),
        Err(e) => Err(blog_failure(e)),
    }
}

/// Publish a new blog.
pub async fn blogs_create(
    app: &App,
    title: &str,
    content: &str,
    format: &OutputFormat,
) -> Result<()> {
    app.guard(Route::BlogCreate).await?;

    let created = app
        .blogs
        .create(&NewBlog::new(title, content))
        .await
        .map_err(blog_failure)?;
    match format {
        OutputFormat::Text => println!("Created blog {}: {}", created.id, created.title),
        OutputFormat::Json => output::print_json(&created),
    }
    Ok(())
}

/// Edit a blog, keeping fields that were not given.
pub async fn blogs_edit(
    app: &App,
    id: u64,
    title: Option<&str>,
    content: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    app.guard(Route::BlogEdit(id)).await?;
    if title.is_none() && content.is_none() {
        bail!("Nothing to change, pass --title and/or --content");
    }

    let existing = match app.blogs.get(id).await {
        Ok(blog) => blog,
        Err(BlogError::NotFound) => bail!("Blog {} not found", id),
        Err(e) => return Err(blog_failure(e)),
    };
    let update = NewBlog::new(
        title.unwrap_or(&existing.title),
        content.unwrap_or(&existing.content),
    );

    match app.blogs.update(id, &update).await {
        Ok(updated) => {
            match format {
                OutputFormat::Text => println!("Updated blog {}: {}", updated.id, updated.title),
                OutputFormat::Json => output::print_json(&updated),
            }
            Ok(())
        }
        Err(BlogError::Forbidden(_)) => bail!("You can only edit your own blogs"),
        Err(e) => Err(blog_failure(e)),
    }
}

/// Delete a blog after confirmation.
pub async fn blogs_delete(app: &App, id: u64, yes: bool, format: &OutputFormat) -> Result<()> {
    app.guard(Route::BlogEdit(id)).await?;

    if !yes && !confirm("Are you sure you want to delete this blog post?") {
        output::print_success("Cancelled", format);
        return Ok(());
    }

    match app.blogs.delete(id).await {
        Ok(()) => {
            output::print_success(&format!("Deleted blog {}", id), format);
            Ok(())
        }
        Err(BlogError::NotFound) => bail!("Blog {} not found", id),
        Err(BlogError::Forbidden(_)) => bail!("You can only delete your own blogs"),
        Err(e) => Err(blog_failure(e)),
    }
}
