//! drive_index CLI - serve or browse a Google Drive index.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_index::config::{DriveArgs, ServeArgs};
use drive_index::server::{self, AppState};
use drive_index::{parse_file_id, DriveClient};

/// Web index over Google Drive folders.
#[derive(Parser)]
#[command(name = "drive_index")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    drive: DriveArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),

    /// List a folder of the index.
    Ls {
        /// Virtual path below the root, e.g. /CourseA/Week1.
        #[arg(default_value = "/")]
        path: String,

        /// Continue a previous listing.
        #[arg(long)]
        page_token: Option<String>,

        /// Which configured root to browse.
        #[arg(long, default_value_t = 0)]
        root_index: usize,
    },

    /// Search the index by file name.
    Search {
        query: String,

        #[arg(long)]
        page_token: Option<String>,
    },

    /// Resolve a virtual path to a folder ID.
    Resolve {
        path: String,

        #[arg(long, default_value_t = 0)]
        root_index: usize,
    },

    /// Print the virtual path of a file or folder.
    Path {
        /// File URL or ID.
        file: String,

        #[arg(long, default_value_t = 0)]
        root_index: usize,
    },

    /// Download a file to local filesystem.
    Download {
        /// File URL or ID to download.
        file: String,

        /// Local destination path (file or directory).
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,
    },

    /// Print a fresh access token as JSON.
    Token,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let client = cli
        .drive
        .connect()
        .context("Failed to set up Drive credentials")?;
    let roots = cli.drive.root_ids().context("Invalid root folder URL or ID")?;

    match cli.command {
        Commands::Serve(args) => {
            let policy = args.access_policy().context("Invalid download policy")?;
            let state = AppState::new(client, roots, policy);
            let app = server::router(state, args.enable_cors_file_down);

            server::serve(args.listen, app)
                .await
                .with_context(|| format!("Failed to serve on {}", args.listen))?;
        }

        Commands::Ls {
            path,
            page_token,
            root_index,
        } => {
            let root = select_root(&roots, root_index)?;
            let folder_id = client
                .resolve_path(root, &path)
                .await
                .with_context(|| format!("Folder not found: {}", path))?;

            let listing = client
                .list_children(&folder_id, page_token.as_deref())
                .await
                .with_context(|| format!("Failed to list folder: {}", folder_id))?;
            print_listing(&listing);
        }

        Commands::Search { query, page_token } => {
            let listing = client
                .search(&query, page_token.as_deref())
                .await
                .with_context(|| format!("Failed to search for: {}", query))?;
            print_listing(&listing);
        }

        Commands::Resolve { path, root_index } => {
            let root = select_root(&roots, root_index)?;
            let folder_id = client
                .resolve_path(root, &path)
                .await
                .with_context(|| format!("Folder not found: {}", path))?;
            println!("{}", folder_id);
        }

        Commands::Path { file, root_index } => {
            let root = select_root(&roots, root_index)?;
            let file_id = parse_file_id(&file)
                .with_context(|| format!("Invalid file URL or ID: {}", file))?;
            let path = client
                .path_of(root, &file_id)
                .await
                .with_context(|| format!("Failed to resolve path of: {}", file_id))?;
            println!("{}", path);
        }

        Commands::Download { file, to } => download(&client, &file, to).await?,

        Commands::Token => {
            let token = client
                .auth()
                .token()
                .await
                .context("Failed to obtain access token")?;
            let issued = drive_index::models::IssuedToken {
                expires_in: token.expires_in(),
                access_token: token.value,
            };
            println!("{}", serde_json::to_string_pretty(&issued)?);
        }
    }

    Ok(())
}

fn select_root(roots: &[String], index: usize) -> Result<&str> {
    roots
        .get(index)
        .map(String::as_str)
        .with_context(|| format!("No root at index {} ({} configured)", index, roots.len()))
}

fn print_listing(listing: &drive_index::Listing) {
    if listing.files.is_empty() {
        println!("No files found.");
    } else {
        for file in &listing.files {
            println!("{}", file);
        }
    }
    if let Some(token) = &listing.next_page_token {
        println!();
        println!("More results: --page-token {}", token);
    }
}

async fn download(client: &DriveClient, file: &str, to: PathBuf) -> Result<()> {
    let file_id =
        parse_file_id(file).with_context(|| format!("Invalid file URL or ID: {}", file))?;

    // Ensure destination directory exists
    if to.is_dir() || to.to_string_lossy().ends_with('/') {
        std::fs::create_dir_all(&to)
            .with_context(|| format!("Failed to create directory: {:?}", to))?;
    } else if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    let metadata = client
        .download_file(&file_id, &to)
        .await
        .with_context(|| format!("Failed to download file: {}", file_id))?;

    let final_path = if to.is_dir() { to.join(&metadata.name) } else { to };
    println!("Saved to: {:?}", final_path);
    Ok(())
}
