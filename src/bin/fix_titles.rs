#![forbid(unsafe_code)]

//! Back-fills missing titles onto collection entries. Bare `"{index}.ext"`
//! videos and bare `"{index}"` slideshow folders are renamed to carry the
//! ledger title, sanitized and length-capped; name collisions get a ` (n)`
//! suffix instead of clobbering anything.

use anyhow::{Result, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use ttarchive_tools::collection::ensure_unique_name;
use ttarchive_tools::config::FilenameRules;
use ttarchive_tools::ledger::title_map;
use ttarchive_tools::sanitize::{sanitize_component, trim_fs_component};

struct FixArgs {
    root: PathBuf,
    csv: PathBuf,
    dry_run: bool,
}

impl FixArgs {
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
        let mut dry_run = false;
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
                "--dry-run" => dry_run = true,
                _ => bail!(
                    "Usage: fix_titles [--root collection] [--csv downloads.csv] [--dry-run]"
                ),
            }
        }
        Ok(Self {
            root: root.unwrap_or_else(|| PathBuf::from("collection")),
            csv: csv.unwrap_or_else(|| PathBuf::from("downloads.csv")),
            dry_run,
        })
    }
}

#[derive(Debug, Default)]
struct FixSummary {
    renamed: usize,
    skipped_no_title: usize,
    skipped_not_applicable: usize,
    errors: usize,
}

fn is_bare_index(stem: &str) -> bool {
    !stem.is_empty() && stem.chars().all(|ch| ch.is_ascii_digit())
}

fn process(root: &Path, csv: &Path, rules: &FilenameRules, dry_run: bool) -> Result<FixSummary> {
    let titles = title_map(csv)?;
    let mut summary = FixSummary::default();

    let mut entries: Vec<PathBuf> = fs::read_dir(root)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

    for entry in entries {
        match fix_entry(&entry, rules, &titles, dry_run) {
            Ok(Outcome::Renamed) => summary.renamed += 1,
            Ok(Outcome::NoTitle) => summary.skipped_no_title += 1,
            Ok(Outcome::NotApplicable) => summary.skipped_not_applicable += 1,
            Err(err) => {
                summary.errors += 1;
                eprintln!("  Warning: {}: {err:#}", entry.display());
            }
        }
    }

    println!("\nDone.");
    println!("Renamed: {}", summary.renamed);
    println!("Skipped (no title in CSV): {}", summary.skipped_no_title);
    println!(
        "Skipped (already has title / not applicable): {}",
        summary.skipped_not_applicable
    );
    println!("Errors: {}", summary.errors);
    Ok(summary)
}

enum Outcome {
    Renamed,
    NoTitle,
    NotApplicable,
}

fn fix_entry(
    entry: &Path,
    rules: &FilenameRules,
    titles: &std::collections::BTreeMap<u32, String>,
    dry_run: bool,
) -> Result<Outcome> {
    let name = entry
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Bare video file: "123.mp4".
    if entry.is_file() && rules.is_video(entry) {
        let stem = entry
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_bare_index(&stem) {
            return Ok(Outcome::NotApplicable);
        }
        let index: u32 = stem.parse()?;
        let Some(title) = titles.get(&index).map(|title| title.trim()).filter(|t| !t.is_empty())
        else {
            println!("[skip] #{index}: no title in CSV for file {name}");
            return Ok(Outcome::NoTitle);
        };

        let suffix = entry
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let safe_title = sanitize_component(rules, title, None);
        let stem = trim_fs_component(rules, &index.to_string(), &safe_title, suffix.chars().count());
        let target_name = format!("{stem}{suffix}");
        if target_name == name {
            return Ok(Outcome::NotApplicable);
        }

        let parent = entry.parent().unwrap_or(Path::new("."));
        let target = ensure_unique_name(parent, &target_name, true);
        println!(
            "[file] {name} -> {}",
            target.file_name().unwrap_or_default().to_string_lossy()
        );
        if !dry_run {
            fs::rename(entry, &target)?;
        }
        return Ok(Outcome::Renamed);
    }

    // Bare slideshow folder: "123".
    if entry.is_dir() && is_bare_index(&name) {
        let index: u32 = name.parse()?;
        let Some(title) = titles.get(&index).map(|title| title.trim()).filter(|t| !t.is_empty())
        else {
            println!("[skip] #{index}: no title in CSV for folder {name}/");
            return Ok(Outcome::NoTitle);
        };

        let safe_title = sanitize_component(rules, title, None);
        let target_name = trim_fs_component(rules, &index.to_string(), &safe_title, 0);
        if target_name == name {
            return Ok(Outcome::NotApplicable);
        }

        let parent = entry.parent().unwrap_or(Path::new("."));
        let target = ensure_unique_name(parent, &target_name, false);
        println!(
            "[dir ] {name}/ -> {}/",
            target.file_name().unwrap_or_default().to_string_lossy()
        );
        if !dry_run {
            fs::rename(entry, &target)?;
        }
        return Ok(Outcome::Renamed);
    }

    Ok(Outcome::NotApplicable)
}

fn main() -> Result<()> {
    let args = match FixArgs::parse() {
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
    if !args.csv.exists() {
        eprintln!("CSV not found: {}", args.csv.display());
        process::exit(2);
    }

    let rules = ttarchive_tools::config::ArchiveConfig::load()?.filenames;
    process(&args.root, &args.csv, &rules, args.dry_run)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(dir: &Path) -> PathBuf {
        let csv = dir.join("downloads.csv");
        fs::write(
            &csv,
            "Index,Title,URL\n1,My Clip,https://x/1\n2,,https://x/2\n3,Beach day,https://x/3\n",
        )
        .unwrap();
        csv
    }

    #[test]
    fn bare_entries_gain_titles() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("collection");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("1.mp4"), b"v").unwrap();
        fs::create_dir(root.join("3")).unwrap();
        let csv = seed(dir.path());

        let summary = process(&root, &csv, &FilenameRules::default(), false).unwrap();
        assert_eq!(summary.renamed, 2);
        assert!(root.join("1. My Clip.mp4").is_file());
        assert!(root.join("3. Beach day").is_dir());
    }

    #[test]
    fn missing_title_and_titled_entries_are_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("collection");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("2.mp4"), b"v").unwrap();
        fs::write(root.join("1. My Clip.mp4"), b"v").unwrap();
        let csv = seed(dir.path());

        let summary = process(&root, &csv, &FilenameRules::default(), false).unwrap();
        assert_eq!(summary.renamed, 0);
        assert_eq!(summary.skipped_no_title, 1);
        assert!(root.join("2.mp4").is_file());
    }

    #[test]
    fn collisions_get_a_counter_suffix() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("collection");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("1.mp4"), b"new").unwrap();
        fs::write(root.join("1. My Clip.mp4"), b"old").unwrap();
        let csv = seed(dir.path());

        let summary = process(&root, &csv, &FilenameRules::default(), false).unwrap();
        assert_eq!(summary.renamed, 1);
        assert!(root.join("1. My Clip (1).mp4").is_file());
        assert_eq!(fs::read(root.join("1. My Clip.mp4")).unwrap(), b"old");
    }

    #[test]
    fn dry_run_leaves_the_tree_alone() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("collection");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("1.mp4"), b"v").unwrap();
        let csv = seed(dir.path());

        let summary = process(&root, &csv, &FilenameRules::default(), true).unwrap();
        assert_eq!(summary.renamed, 1);
        assert!(root.join("1.mp4").is_file());
        assert!(!root.join("1. My Clip.mp4").exists());
    }

    #[test]
    fn args_accept_dry_run() {
        let args = FixArgs::from_slice(&["--dry-run", "--root", "c"]).unwrap();
        assert!(args.dry_run);
        assert_eq!(args.root, PathBuf::from("c"));
        assert!(FixArgs::from_slice(&["--wat"]).is_err());
    }
}
