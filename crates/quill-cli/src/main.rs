//! Quill CLI - command-line client for the Quill blog.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{App, LoginRequired};
use quill_config_and_utils::{init_logging, Config, Paths};
use tracing::{debug, error};

/// Quill CLI - Read and write blogs from the terminal.
#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill CLI for authentication and blog management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login,

    /// Create an account
    Signup,

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// Read and manage blogs
    Blogs {
        #[command(subcommand)]
        command: BlogCommands,
    },
}

#[derive(Subcommand)]
enum BlogCommands {
    /// List blogs
    List {
        /// Page number
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Show a blog
    Show {
        /// Blog ID
        id: u64,
    },
    /// Publish a new blog
    Create {
        /// Blog title
        #[arg(short, long)]
        title: String,
        /// Blog content
        #[arg(short, long)]
        content: String,
    },
    /// Edit one of your blogs
    Edit {
        /// Blog ID
        id: u64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete one of your blogs
    Delete {
        /// Blog ID
        id: u64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;

    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));
    debug!(api = %config.api_base_url, "Starting quill");

    let app = App::start(&paths, &config).await?;
    let format = &cli.format;

    match cli.command {
        Commands::Login => commands::login(&app, format).await,
        Commands::Signup => commands::signup(&app, format).await,
        Commands::Logout => commands::logout(&app, format).await,
        Commands::Status => commands::status(&app, format).await,
        Commands::Blogs { command } => match command {
            BlogCommands::List { page } => commands::blogs_list(&app, page, format).await,
            BlogCommands::Show { id } => commands::blogs_show(&app, id, format).await,
            BlogCommands::Create { title, content } => {
                commands::blogs_create(&app, &title, &content, format).await
            }
            BlogCommands::Edit { id, title, content } => {
                commands::blogs_edit(&app, id, title.as_deref(), content.as_deref(), format).await
            }
            BlogCommands::Delete { id, yes } => {
                commands::blogs_delete(&app, id, yes, format).await
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        if e.downcast_ref::<LoginRequired>().is_some() {
            // Redirect to login, not a failure dialog.
            match format {
                output::OutputFormat::Text => eprintln!("{}", commands::LOGIN_HINT),
                output::OutputFormat::Json => output::print_error(commands::LOGIN_HINT, &format),
            }
        } else {
            error!(error = %e, "Command failed");
            output::print_error(&format!("{:#}", e), &format);
        }
        std::process::exit(1);
    }
}
