#![forbid(unsafe_code)]

//! Merges a secondary archive into a primary one. Rows of the secondary
//! ledger whose URL the primary does not know are appended with fresh
//! indices, and their backing video file or slideshow folder is copied over
//! under the new index. A row whose payload cannot be found still consumes
//! its index so the two ledgers stay in step.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use ttarchive_tools::collection::{copy_dir_recursive, find_slideshow_relaxed, find_video_relaxed};
use ttarchive_tools::config::FilenameRules;
use ttarchive_tools::ledger::{LedgerRow, read_rows, write_rows};

struct CombineArgs {
    primary: PathBuf,
    secondary: PathBuf,
}

impl CombineArgs {
    fn parse() -> Result<Self> {
        Self::from_iter(env::args().skip(1))
    }

    #[cfg(test)]
    fn from_slice(values: &[&str]) -> Result<Self> {
        Self::from_iter(values.iter().map(|value| value.to_string()))
    }

    fn from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut positionals: Vec<PathBuf> = Vec::new();
        for arg in iter {
            if arg.starts_with('-') || positionals.len() == 2 {
                bail!("Usage: combine_collections [primary] [secondary]");
            }
            positionals.push(PathBuf::from(arg));
        }
        let mut positionals = positionals.into_iter();
        Ok(Self {
            primary: positionals.next().unwrap_or_else(|| PathBuf::from("1")),
            secondary: positionals.next().unwrap_or_else(|| PathBuf::from("2")),
        })
    }
}

struct Layout {
    csv: PathBuf,
    collection: PathBuf,
}

impl Layout {
    fn of(root: &Path) -> Self {
        Self {
            csv: root.join("downloads.csv"),
            collection: root.join("collection"),
        }
    }

    fn is_complete(&self) -> bool {
        self.csv.exists() && self.collection.is_dir()
    }
}

fn combine(primary: &Layout, secondary: &Layout, rules: &FilenameRules) -> Result<usize> {
    let mut primary_rows = read_rows(&primary.csv)?;
    let secondary_rows = read_rows(&secondary.csv)?;

    let known_urls: HashSet<&str> = primary_rows.iter().map(|row| row.url.as_str()).collect();
    let new_rows: Vec<&LedgerRow> = secondary_rows
        .iter()
        .filter(|row| !known_urls.contains(row.url.as_str()))
        .collect();
    if new_rows.is_empty() {
        println!("No new posts found in the secondary collection. Primary is already up to date.");
        return Ok(0);
    }
    println!("Found {} new post(s) to combine.", new_rows.len());

    let mut next_index = primary_rows
        .iter()
        .map(|row| row.index)
        .max()
        .unwrap_or(0)
        + 1;

    let mut appended = Vec::new();
    for row in new_rows {
        println!(
            "\nProcessing new item: Index {} from secondary -> New Index {next_index}",
            row.index
        );
        appended.push(LedgerRow {
            index: next_index,
            title: row.title.clone(),
            url: row.url.clone(),
        });

        if let Some(video) = find_video_relaxed(rules, &secondary.collection, row.index)? {
            let ext = video
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            let dest = primary.collection.join(format!("{next_index}{ext}"));
            println!("  Copying video file: {} -> {}", video.display(), dest.display());
            fs::copy(&video, &dest)?;
        } else if let Some(folder) =
            find_slideshow_relaxed(&secondary.collection, row.index)?
        {
            let dest = primary.collection.join(next_index.to_string());
            println!(
                "  Copying slideshow folder: {} -> {}",
                folder.display(),
                dest.display()
            );
            copy_dir_recursive(&folder, &dest)?;
        } else {
            eprintln!(
                "  Warning: could not find a matching download for index {} in the secondary collection",
                row.index
            );
        }
        next_index += 1;
    }

    let count = appended.len();
    primary_rows.extend(appended);
    write_rows(&primary.csv, &primary_rows)?;

    println!("\nSuccessfully combined {count} new item(s) into the primary collection.");
    println!("Updated CSV saved to: {}", primary.csv.display());
    Ok(count)
}

fn main() -> Result<()> {
    let args = match CombineArgs::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };

    let primary = Layout::of(&args.primary);
    let secondary = Layout::of(&args.secondary);
    if !primary.is_complete() || !secondary.is_complete() {
        eprintln!(
            "Both {} and {} must contain 'downloads.csv' and a 'collection' directory.",
            args.primary.display(),
            args.secondary.display()
        );
        process::exit(2);
    }

    let rules = ttarchive_tools::config::ArchiveConfig::load()?.filenames;
    combine(&primary, &secondary, &rules)?;
    Ok(())
}
