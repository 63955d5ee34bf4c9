#![forbid(unsafe_code)]

//! Batch downloader for mixed video and photo-slideshow posts. Reads a link
//! list, downloads everything not already in the ledger, and appends one
//! ledger row per processed URL. Failures are logged to the error ledger and
//! never stop the run.

use anyhow::{Result, bail};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use ttarchive_tools::config::ArchiveConfig;
use ttarchive_tools::download;
use ttarchive_tools::exec::{GALLERY_DL, YT_DLP, ensure_program_available};
use ttarchive_tools::links::parse_input_lines;

struct DownloadArgs {
    input: PathBuf,
}

impl DownloadArgs {
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
        let mut input: Option<PathBuf> = None;
        for arg in iter {
            if arg.starts_with('-') {
                bail!("Usage: download_posts [links.txt]");
            }
            if input.is_some() {
                bail!("Usage: download_posts [links.txt]");
            }
            input = Some(PathBuf::from(arg));
        }
        Ok(Self {
            input: input.unwrap_or_else(|| PathBuf::from("links.txt")),
        })
    }
}

fn main() -> Result<()> {
    let args = match DownloadArgs::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    if !args.input.exists() {
        eprintln!("Input file not found: {}", args.input.display());
        process::exit(2);
    }

    ensure_program_available(YT_DLP)?;
    ensure_program_available(GALLERY_DL)?;

    let config = ArchiveConfig::load()?;
    let text = fs::read_to_string(&args.input)?;
    let urls = parse_input_lines(&text);
    println!("[info] Found {} link(s) in {}.", urls.len(), args.input.display());

    let summary = download::run(&config, &urls)?;

    println!("\n[done] CSV -> {}", config.paths.ledger.display());
    if summary.failed.is_empty() {
        println!("\n[summary] All new downloads completed successfully.");
    } else {
        let mut failed = summary.failed.clone();
        failed.sort_unstable();
        failed.dedup();
        println!("\n[summary] Some downloads failed.");
        println!(
            "Failed indices: {}",
            failed
                .iter()
                .map(|index| index.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Details saved to: {}", config.paths.errors.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_links_txt() {
        let args = DownloadArgs::from_slice(&[]).unwrap();
        assert_eq!(args.input, PathBuf::from("links.txt"));
    }

    #[test]
    fn accepts_one_positional() {
        let args = DownloadArgs::from_slice(&["batch.txt"]).unwrap();
        assert_eq!(args.input, PathBuf::from("batch.txt"));
    }

    #[test]
    fn rejects_flags_and_extra_positionals() {
        assert!(DownloadArgs::from_slice(&["--bogus"]).is_err());
        assert!(DownloadArgs::from_slice(&["a.txt", "b.txt"]).is_err());
    }
}
