#![forbid(unsafe_code)]

//! Blanks placeholder titles inside the ledger. Rows whose title matches one
//! of the placeholder patterns become `Index,,URL`; column order and any
//! extra columns survive the rewrite. Overwriting in place takes a `.bak`
//! backup first unless told not to.

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use ttarchive_tools::config::ArchiveConfig;
use ttarchive_tools::ledger::{backup, find_column};

struct CleanArgs {
    csv: PathBuf,
    output: Option<PathBuf>,
    dry_run: bool,
    no_backup: bool,
    patterns: Vec<String>,
}

impl CleanArgs {
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
        let mut csv: Option<PathBuf> = None;
        let mut output: Option<PathBuf> = None;
        let mut dry_run = false;
        let mut no_backup = false;
        let mut patterns: Vec<String> = Vec::new();
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            if let Some(value) = arg.strip_prefix("--csv=") {
                csv = Some(PathBuf::from(value));
                continue;
            }
            if let Some(value) = arg.strip_prefix("--output=") {
                output = Some(PathBuf::from(value));
                continue;
            }
            if let Some(value) = arg.strip_prefix("--pattern=") {
                patterns.push(value.to_string());
                continue;
            }
            match arg.as_str() {
                "--csv" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--csv requires a value"))?;
                    csv = Some(PathBuf::from(value));
                }
                "--output" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--output requires a value"))?;
                    output = Some(PathBuf::from(value));
                }
                "--pattern" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--pattern requires a value"))?;
                    patterns.push(value);
                }
                "--dry-run" => dry_run = true,
                "--no-backup" => no_backup = true,
                _ => bail!(
                    "Usage: clean_titles [--csv downloads.csv] [--output FILE] [--dry-run] [--no-backup] [--pattern RE]..."
                ),
            }
        }
        Ok(Self {
            csv: csv.unwrap_or_else(|| PathBuf::from("downloads.csv")),
            output,
            dry_run,
            no_backup,
            patterns,
        })
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!(r"(?i)^\s*(?:{pattern})\s*$"))
                .with_context(|| format!("compiling pattern {pattern:?}"))
        })
        .collect()
}

fn process_csv(
    in_path: &Path,
    out_path: &Path,
    regexes: &[Regex],
    dry_run: bool,
) -> Result<(usize, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(in_path)
        .with_context(|| format!("opening {}", in_path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", in_path.display()))?
        .clone();
    let Some(title_col) = find_column(&headers, "title") else {
        bail!("{} must have a 'Title' column", in_path.display());
    };

    let mut rows: Vec<csv::StringRecord> = Vec::new();
    let mut total = 0usize;
    let mut changed = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", in_path.display()))?;
        total += 1;
        let title = record.get(title_col).unwrap_or("").trim();
        if !title.is_empty() && regexes.iter().any(|regex| regex.is_match(title)) {
            let mut fields: Vec<&str> = record.iter().collect();
            fields[title_col] = "";
            rows.push(csv::StringRecord::from(fields));
            changed += 1;
        } else {
            rows.push(record);
        }
    }

    if dry_run {
        println!(
            "[dry-run] Would update {changed} / {total} rows in {}",
            in_path.display()
        );
        return Ok((changed, total));
    }

    let mut writer = csv::Writer::from_path(out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;
    writer.write_record(&headers).context("writing header")?;
    for row in &rows {
        writer.write_record(row).context("writing row")?;
    }
    writer.flush().context("flushing output")?;

    println!(
        "[ok] Updated {changed} / {total} rows -> {}",
        out_path.display()
    );
    Ok((changed, total))
}

fn main() -> Result<()> {
    let args = match CleanArgs::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    if !args.csv.exists() {
        eprintln!("Input CSV not found: {}", args.csv.display());
        process::exit(2);
    }

    let patterns = if args.patterns.is_empty() {
        ArchiveConfig::load()?.placeholders.video
    } else {
        args.patterns.clone()
    };
    let regexes = compile_patterns(&patterns)?;

    let out_path = args.output.clone().unwrap_or_else(|| args.csv.clone());
    if out_path == args.csv && !args.no_backup && !args.dry_run {
        let bak = backup(&args.csv)?;
        println!("[backup] {}", bak.display());
    }

    process_csv(&args.csv, &out_path, &regexes, args.dry_run)?;
    Ok(())
}
