#![forbid(unsafe_code)]

//! Generates or updates the static gallery page from the ledger and the
//! collection tree. Safe to rerun: an existing page is patched between the
//! grid markers, and video thumbnails are cached under
//! `collection/thumbnails/`.

use anyhow::{Result, bail};
use std::env;
use std::process;
use ttarchive_tools::archive::{build_items, write_archive};
use ttarchive_tools::config::ArchiveConfig;
use ttarchive_tools::exec::{FFMPEG, ensure_program_available};

fn parse_args<I>(iter: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    if iter.into_iter().next().is_some() {
        bail!("Usage: build_archive");
    }
    Ok(())
}

fn main() -> Result<()> {
    if let Err(err) = parse_args(env::args().skip(1)) {
        eprintln!("{err}");
        process::exit(2);
    }

    ensure_program_available(FFMPEG)?;

    let config = ArchiveConfig::load()?;
    let items = build_items(&config)?;
    write_archive(&config, &items)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_no_arguments() {
        assert!(parse_args(std::iter::empty()).is_ok());
        assert!(parse_args(["extra".to_string()]).is_err());
    }
}
