#![forbid(unsafe_code)]

//! Pulls post links out of a saved profile page. TikTok renders the newest
//! post first, so the extracted list is reversed to oldest-first before it is
//! written, and duplicate hrefs are collapsed.

use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use ttarchive_tools::links::extract_post_links;

struct ExtractArgs {
    page: PathBuf,
    output: PathBuf,
}

impl ExtractArgs {
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
        let mut page: Option<PathBuf> = None;
        let mut output: Option<PathBuf> = None;
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            if let Some(value) = arg.strip_prefix("--output=") {
                output = Some(PathBuf::from(value));
                continue;
            }
            match arg.as_str() {
                "-o" | "--output" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--output requires a value"))?;
                    output = Some(PathBuf::from(value));
                }
                _ if arg.starts_with('-') || page.is_some() => {
                    bail!("Usage: extract_links PAGE.html [-o links.txt]");
                }
                _ => page = Some(PathBuf::from(arg)),
            }
        }
        let Some(page) = page else {
            bail!("Usage: extract_links PAGE.html [-o links.txt]");
        };
        Ok(Self {
            page,
            output: output.unwrap_or_else(|| PathBuf::from("links.txt")),
        })
    }
}

fn main() -> Result<()> {
    let args = match ExtractArgs::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    if !args.page.exists() {
        eprintln!("Page file not found: {}", args.page.display());
        process::exit(2);
    }

    let html =
        fs::read_to_string(&args.page).with_context(|| format!("reading {}", args.page.display()))?;
    let links = extract_post_links(&html);

    let mut body = links.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(&args.output, body)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("Saved {} links to {}", links.len(), args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_argument_is_required() {
        assert!(ExtractArgs::from_slice(&[]).is_err());
        assert!(ExtractArgs::from_slice(&["a.html", "b.html"]).is_err());
        let args = ExtractArgs::from_slice(&["page.html"]).unwrap();
        assert_eq!(args.page, PathBuf::from("page.html"));
        assert_eq!(args.output, PathBuf::from("links.txt"));
    }

    #[test]
    fn output_flag_both_styles() {
        let args = ExtractArgs::from_slice(&["page.html", "-o", "mine.txt"]).unwrap();
        assert_eq!(args.output, PathBuf::from("mine.txt"));
        let args = ExtractArgs::from_slice(&["--output=o.txt", "page.html"]).unwrap();
        assert_eq!(args.output, PathBuf::from("o.txt"));
    }
}
