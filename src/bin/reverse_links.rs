#![forbid(unsafe_code)]

//! Reverses the order of a link file. Useful when links were collected
//! newest-first but should be downloaded oldest-first so indices grow with
//! post age. Blank lines are dropped along the way.

use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

struct ReverseArgs {
    input: PathBuf,
    output: PathBuf,
}

impl ReverseArgs {
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
                bail!("Usage: reverse_links [INPUT] [OUTPUT]");
            }
            positionals.push(PathBuf::from(arg));
        }
        let mut positionals = positionals.into_iter();
        Ok(Self {
            input: positionals
                .next()
                .unwrap_or_else(|| PathBuf::from("links.txt")),
            output: positionals
                .next()
                .unwrap_or_else(|| PathBuf::from("reversed_links.txt")),
        })
    }
}

fn reverse_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .collect()
}

fn main() -> Result<()> {
    let args = match ReverseArgs::parse() {
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

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let reversed = reverse_lines(&raw);

    let mut body = reversed.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(&args.output, body)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("Reversed links saved to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_come_back_in_reverse_order() {
        let raw = "https://x/1\nhttps://x/2\n\nhttps://x/3\n";
        assert_eq!(
            reverse_lines(raw),
            vec!["https://x/3", "https://x/2", "https://x/1"]
        );
    }

    #[test]
    fn defaults_and_overrides() {
        let args = ReverseArgs::from_slice(&[]).unwrap();
        assert_eq!(args.input, PathBuf::from("links.txt"));
        assert_eq!(args.output, PathBuf::from("reversed_links.txt"));

        let args = ReverseArgs::from_slice(&["in.txt", "out.txt"]).unwrap();
        assert_eq!(args.input, PathBuf::from("in.txt"));
        assert_eq!(args.output, PathBuf::from("out.txt"));

        assert!(ReverseArgs::from_slice(&["a", "b", "c"]).is_err());
        assert!(ReverseArgs::from_slice(&["--flag"]).is_err());
    }
}
