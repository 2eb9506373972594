//! Tree Command Handler
//!
//! Handles the `tree` subcommand for printing the latest index contents.

use crate::config::ReaderConfig;
use crate::display;
use crate::error::{Result, RustLtfsError};
use crate::ltfs_index::Entry;
use tracing::info;

pub async fn execute(device: String, path: Option<String>, config: ReaderConfig) -> Result<()> {
    info!("Printing directory tree: {}", device);

    let volume = super::load_volume(device, config).await?;
    let index = volume.latest_index();

    let root = match path.as_deref() {
        None => &index.root_directory,
        Some(path) => match index.find(path) {
            Some(Entry::Directory(dir)) => dir,
            Some(Entry::File(_)) => {
                return Err(RustLtfsError::precondition(format!("{} is a file", path)))
            }
            None => {
                return Err(RustLtfsError::precondition(format!(
                    "{} not found in index generation {}",
                    path, index.generation_number
                )))
            }
        },
    };

    print!("{}", display::render_tree(root));
    println!();
    println!(
        "{} files, {} directories",
        root.count_files(),
        root.count_directories()
    );

    Ok(())
}
