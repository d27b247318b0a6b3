use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mb-cli", version, about = "ModernBlog data-management CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database file and bootstrap the schema.
    Init {
        /// SQLite database path.
        #[arg(long, default_value = "./data/modern_blog.db")]
        db_path: PathBuf,
    },
    /// Load sample users, categories, tags, posts and site settings.
    /// Safe to run repeatedly; existing rows are left alone.
    Seed {
        /// SQLite database path.
        #[arg(long, default_value = "./data/modern_blog.db")]
        db_path: PathBuf,
    },
    /// Recompute every tag's usage count from the blog/tag join table.
    RecountTags {
        /// SQLite database path.
        #[arg(long, default_value = "./data/modern_blog.db")]
        db_path: PathBuf,
    },
}
