#![forbid(unsafe_code)]

//! Reports the symmetric difference of two link files: which links appear in
//! the first but not the second, and vice versa. Blank lines are ignored and
//! order does not matter.

use anyhow::{Context, Result, bail};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

struct CompareArgs {
    first: PathBuf,
    second: PathBuf,
}

impl CompareArgs {
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
                bail!("Usage: compare_links FILE1 FILE2");
            }
            positionals.push(PathBuf::from(arg));
        }
        let mut positionals = positionals.into_iter();
        let (Some(first), Some(second)) = (positionals.next(), positionals.next()) else {
            bail!("Usage: compare_links FILE1 FILE2");
        };
        Ok(Self { first, second })
    }
}

fn read_links(path: &Path) -> Result<BTreeSet<String>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn print_difference(label_a: &Path, label_b: &Path, only: &[&String]) {
    println!(
        "Links in {} but not in {}:",
        label_a.display(),
        label_b.display()
    );
    if only.is_empty() {
        println!("  None");
    } else {
        for link in only {
            println!("  {link}");
        }
    }
}

fn main() -> Result<()> {
    let args = match CompareArgs::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    for path in [&args.first, &args.second] {
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            process::exit(2);
        }
    }

    let first = read_links(&args.first)?;
    let second = read_links(&args.second)?;

    let only_first: Vec<&String> = first.difference(&second).collect();
    let only_second: Vec<&String> = second.difference(&first).collect();

    print_difference(&args.first, &args.second, &only_first);
    println!();
    print_difference(&args.second, &args.first, &only_second);
    Ok(())
}
