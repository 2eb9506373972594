use std::fmt::Write as _;

use crate::ltfs::Volume;
use crate::ltfs_index::types::parse_timestamp;
use crate::ltfs_index::{Directory, File, LtfsIndex};
use crate::scsi::{PositionData, TapeCapacity};
use crate::tape_ops::MtStatus;
use crate::utils::{format_bytes, format_mib};

/// Format timestamp in readable format
pub fn format_time(timestamp: &str) -> String {
    // LTFS timestamps are in ISO 8601 format: "2023-01-01T00:00:00.000000000Z"
    match parse_timestamp(timestamp) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

pub fn render_index_summary(index: &LtfsIndex) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Generation:   {}", index.generation_number);
    let _ = writeln!(out, "  Updated:      {}", format_time(&index.update_time));
    let _ = writeln!(out, "  Creator:      {}", index.creator);
    let _ = writeln!(
        out,
        "  Location:     partition {} block {}",
        index.location.partition, index.location.startblock
    );
    if let Some(previous) = &index.previous_generation_location {
        let _ = writeln!(
            out,
            "  Previous:     partition {} block {}",
            previous.partition, previous.startblock
        );
    }
    let _ = writeln!(
        out,
        "  Contents:     {} files, {} directories, {}",
        index.count_files(),
        index.count_directories(),
        format_bytes(index.total_size())
    );
    out
}

pub fn print_volume(volume: &Volume) {
    println!("VOL1 label:");
    println!("{}", volume.vol1_label);
    println!();
    println!("LTFS label:");
    println!("  Version:      {}", volume.label.version);
    println!("  Creator:      {}", volume.label.creator);
    println!("  Formatted:    {}", format_time(&volume.label.format_time));
    println!("  Volume UUID:  {}", volume.label.volume_uuid);
    println!(
        "  Partitions:   index={} data={}",
        volume.label.partitions.index, volume.label.partitions.data
    );
    println!("  Block size:   {}", format_bytes(u64::from(volume.label.blocksize)));
    println!("  Compression:  {}", volume.label.compression);
    println!();
    println!(
        "Latest index ({} generation(s) on the index partition):",
        volume.generations.len()
    );
    print!("{}", render_index_summary(volume.latest_index()));

    if !volume.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &volume.warnings {
            println!("  {}", warning);
        }
    }
}

pub fn render_generations(volume: &Volume) -> String {
    let latest = volume.latest_index().generation_number;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>10}  {:>9}  {:>12}  {:<20}  {:>8}",
        "Generation", "Partition", "Block", "Updated", "Files"
    );
    for generation in &volume.generations {
        let (partition, block) = match generation.position {
            Some(position) => (position.partition.to_string(), position.block.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let index = &generation.index;
        let marker = if index.generation_number == latest { " *" } else { "" };
        let _ = writeln!(
            out,
            "{:>10}  {:>9}  {:>12}  {:<20}  {:>8}{}",
            index.generation_number,
            partition,
            block,
            format_time(&index.update_time),
            index.count_files(),
            marker
        );
    }
    out
}

/// Directory tree with sizes, directories before files
pub fn render_tree(root: &Directory) -> String {
    let mut out = String::from("/\n");
    render_children(root, "", &mut out);
    out
}

fn render_children(dir: &Directory, prefix: &str, out: &mut String) {
    let total = dir.contents.directories.len() + dir.contents.files.len();
    let mut shown = 0;

    for sub in &dir.contents.directories {
        shown += 1;
        let last = shown == total;
        let _ = writeln!(out, "{}{}{}/", prefix, branch(last), sub.name);
        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_children(sub, &child_prefix, out);
    }
    for file in &dir.contents.files {
        shown += 1;
        let _ = writeln!(out, "{}{}{}", prefix, branch(shown == total), file_line(file));
    }
}

fn branch(last: bool) -> &'static str {
    if last {
        "└── "
    } else {
        "├── "
    }
}

fn file_line(file: &File) -> String {
    match &file.symlink {
        Some(target) => format!("{} -> {}", file.name, target),
        None => format!("{} ({})", file.name, format_bytes(file.length)),
    }
}

pub fn print_position(scsi: &PositionData, status: &MtStatus, mt_block: i64) {
    println!("READ POSITION:");
    println!("  Partition:    {}", scsi.partition);
    println!("  Block:        {}", scsi.block);
    println!("  File:         {}", scsi.file);
    println!();
    println!("MTIO:");
    println!("  Block (tell): {}", mt_block);
    println!("  File number:  {}", status.file_number);
    println!("  Block number: {}", status.block_number);
    println!("  Block size:   {}", status.block_size());
    println!("  Density:      0x{:02x}", status.density());
    println!("  Status:       {}", status.flags().join(" "));
}

pub fn print_capacity(capacity: &TapeCapacity) {
    for partition in 0..2 {
        println!(
            "  Partition {}:  {} free of {}",
            partition,
            format_mib(capacity.remaining[partition]),
            format_mib(capacity.maximum[partition])
        );
    }
}
