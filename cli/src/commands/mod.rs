pub mod init;
pub mod recount_tags;
pub mod seed;

use anyhow::Result;

use crate::cli::{Cli, Commands};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { db_path } => init::run(&db_path),
        Commands::Seed { db_path } => seed::run(&db_path),
        Commands::RecountTags { db_path } => recount_tags::run(&db_path),
    }
}
