#![forbid(unsafe_code)]

//! Filters a link list down to actual post URLs. Lines that are blank or do
//! not point at a `/video/` or `/photo/` page (profile links, sound pages,
//! stray text) are dropped.

use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use ttarchive_tools::links::is_post_url;

struct FilterArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    in_place: bool,
}

impl FilterArgs {
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
        let mut output: Option<PathBuf> = None;
        let mut in_place = false;
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
                "--in-place" => in_place = true,
                _ if arg.starts_with('-') => {
                    bail!("Usage: filter_links [links.txt] [-o OUTPUT | --in-place]");
                }
                _ if input.is_some() => {
                    bail!("Usage: filter_links [links.txt] [-o OUTPUT | --in-place]");
                }
                _ => input = Some(PathBuf::from(arg)),
            }
        }
        if in_place && output.is_some() {
            bail!("--in-place and --output are mutually exclusive");
        }
        Ok(Self {
            input: input.unwrap_or_else(|| PathBuf::from("links.txt")),
            output,
            in_place,
        })
    }

    fn output_path(&self) -> PathBuf {
        if self.in_place {
            return self.input.clone();
        }
        if let Some(output) = &self.output {
            return output.clone();
        }
        let name = self
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "links.txt".to_string());
        self.input.with_file_name(format!("filtered_{name}"))
    }
}

fn filter_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && is_post_url(line))
        .collect()
}

fn main() -> Result<()> {
    let args = match FilterArgs::parse() {
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
    let kept = filter_lines(&raw);

    let out_path = args.output_path();
    let mut body = kept.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(&out_path, body).with_context(|| format!("writing {}", out_path.display()))?;

    println!("Kept {} post link(s) -> {}", kept.len(), out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_post_urls() {
        let raw = "\
https://www.tiktok.com/@user/video/7495875761379986734
https://www.tiktok.com/@user
not a link

https://www.tiktok.com/@user/photo/7513957387899915542?lang=en
https://www.tiktok.com/music/original-sound-123
";
        let kept = filter_lines(raw);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].contains("/video/"));
        assert!(kept[1].contains("/photo/"));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(filter_lines("").is_empty());
        assert!(filter_lines("\n\n").is_empty());
    }

    #[test]
    fn default_output_is_prefixed() {
        let args = FilterArgs::from_slice(&["mine.txt"]).unwrap();
        assert_eq!(args.output_path(), PathBuf::from("filtered_mine.txt"));
    }

    #[test]
    fn in_place_overwrites_the_input() {
        let args = FilterArgs::from_slice(&["mine.txt", "--in-place"]).unwrap();
        assert_eq!(args.output_path(), PathBuf::from("mine.txt"));
        assert!(FilterArgs::from_slice(&["--in-place", "-o", "x"]).is_err());
    }

    #[test]
    fn rejects_extra_positionals() {
        assert!(FilterArgs::from_slice(&["a.txt", "b.txt"]).is_err());
        assert!(FilterArgs::from_slice(&["--bogus"]).is_err());
    }
}
