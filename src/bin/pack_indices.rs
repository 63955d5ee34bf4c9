#![forbid(unsafe_code)]

//! Renumbers the collection densely from 1 and syncs the ledger to match.
//! Renames run in two phases through short temp names so overlapping old and
//! new names never collide; the ledger is backed up before it is rewritten
//! and rows with no backing item are dropped.

use anyhow::{Result, bail};
use std::env;
use std::path::PathBuf;
use std::process;
use ttarchive_tools::collection::{
    indexed_items, is_contiguous, pack_ledger_rows, pack_mapping, two_phase_renames,
};
use ttarchive_tools::ledger::{backup, read_rows, write_rows};

struct PackArgs {
    root: PathBuf,
    csv: PathBuf,
}

impl PackArgs {
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
        let mut root: Option<PathBuf> = None;
        let mut csv: Option<PathBuf> = None;
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            if let Some(value) = arg.strip_prefix("--root=") {
                root = Some(PathBuf::from(value));
                continue;
            }
            if let Some(value) = arg.strip_prefix("--csv=") {
                csv = Some(PathBuf::from(value));
                continue;
            }
            match arg.as_str() {
                "--root" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--root requires a value"))?;
                    root = Some(PathBuf::from(value));
                }
                "--csv" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--csv requires a value"))?;
                    csv = Some(PathBuf::from(value));
                }
                _ => bail!("Usage: pack_indices [--root collection] [--csv downloads.csv]"),
            }
        }
        Ok(Self {
            root: root.unwrap_or_else(|| PathBuf::from("collection")),
            csv: csv.unwrap_or_else(|| PathBuf::from("downloads.csv")),
        })
    }
}

fn main() -> Result<()> {
    let args = match PackArgs::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    if !args.root.is_dir() {
        eprintln!("Collection folder not found: {}", args.root.display());
        process::exit(2);
    }

    let items = indexed_items(&args.root)?;
    if items.is_empty() {
        println!("[info] No indexed items found to process. Nothing to do.");
        return Ok(());
    }

    let mapping = pack_mapping(&items);
    let renamed = if is_contiguous(&items) {
        println!("[info] Indices already contiguous. Checking CSV only...");
        Vec::new()
    } else {
        println!("[info] Renaming items in two phases to pack indices...");
        let renamed = two_phase_renames(&mapping, &items)?;
        println!("[ok] Renames complete. {} items renamed.", renamed.len());
        renamed
    };

    let rows = read_rows(&args.csv)?;
    let mut kept_count = 0;
    if !rows.is_empty() {
        match backup(&args.csv) {
            Ok(path) => println!("[ok] Backed up CSV to {}", path.display()),
            Err(err) => eprintln!("  Warning: could not back up CSV: {err:#}"),
        }

        let (kept, reindexed, removed) = pack_ledger_rows(rows, &mapping);
        write_rows(&args.csv, &kept)?;
        kept_count = kept.len();

        println!("[ok] CSV updated. Rows kept: {kept_count}");
        if !removed.is_empty() {
            println!("\n[removed rows]");
            for row in &removed {
                println!(
                    "  Removed index {} -> '{}' (no matching file)",
                    row.index, row.title
                );
            }
        }
        if !reindexed.is_empty() {
            println!("\n[reindexed rows]");
            for (old, new, title) in &reindexed {
                println!("  {old} -> {new} : {title}");
            }
        }
    }

    println!("\n=== SUMMARY ===");
    if renamed.is_empty() {
        println!("No file renames needed.");
    } else {
        println!("Renamed files/folders:");
        for (old, new) in &renamed {
            println!("  {old} -> {new}");
        }
    }
    if kept_count > 0 {
        println!("CSV rows total after sync: {kept_count}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_standard_layout() {
        let args = PackArgs::from_slice(&[]).unwrap();
        assert_eq!(args.root, PathBuf::from("collection"));
        assert_eq!(args.csv, PathBuf::from("downloads.csv"));
    }

    #[test]
    fn both_flag_styles_are_accepted() {
        let args = PackArgs::from_slice(&["--root", "c2", "--csv=log.csv"]).unwrap();
        assert_eq!(args.root, PathBuf::from("c2"));
        assert_eq!(args.csv, PathBuf::from("log.csv"));
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        assert!(PackArgs::from_slice(&["--verbose"]).is_err());
        assert!(PackArgs::from_slice(&["stray"]).is_err());
    }
}
