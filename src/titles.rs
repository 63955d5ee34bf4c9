#![forbid(unsafe_code)]

//! Title heuristics: deciding when a title is an auto-generated placeholder
//! worth blanking, and recovering display titles from the gallery tool's
//! default filenames (`<postid>_<nn> <TITLE> [<hash>].ext`).

use crate::config::PlaceholderPatterns;
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Compiled placeholder predicates. The pattern lists come from
/// configuration; each is matched case-insensitively against the whole
/// trimmed title.
#[derive(Debug)]
pub struct PlaceholderRules {
    video: Vec<Regex>,
    photo: Vec<Regex>,
}

impl PlaceholderRules {
    pub fn compile(patterns: &PlaceholderPatterns) -> Result<Self> {
        Ok(Self {
            video: compile_all(&patterns.video)?,
            photo: compile_all(&patterns.photo)?,
        })
    }

    /// Empty or auto-generated video titles are treated as absent.
    pub fn is_placeholder_video_title(&self, title: Option<&str>) -> bool {
        let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        self.video.iter().any(|re| re.is_match(title))
    }

    /// Slideshow titles inferred from filenames have extra placeholder
    /// shapes: `tiktok_<postid>`, the bare post id, or the configured
    /// patterns.
    pub fn is_placeholder_slide_title(&self, title: Option<&str>, post_id: Option<&str>) -> bool {
        let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        if let Some(post_id) = post_id
            && !post_id.is_empty()
        {
            if title.eq_ignore_ascii_case(&format!("tiktok_{post_id}")) || title == post_id {
                return true;
            }
        }
        self.photo.iter().any(|re| re.is_match(title))
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!(r"(?i)^\s*(?:{pattern})\s*$"))
                .with_context(|| format!("compiling placeholder pattern {pattern:?}"))
        })
        .collect()
}

static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.[^.\\/:*?"<>|\r\n]+$"#).expect("pattern compiles"));
static FULL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+_\d+\s+(.*?)\s+\[.*?\]\s*$").expect("pattern compiles"));
static LEADING_SEQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+_\d+\s*").expect("pattern compiles"));
static TRAILING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[.*?\]\s*$").expect("pattern compiles"));
static TRAILING_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\[[0-9a-fA-F]{8,}\]$").expect("pattern compiles"));
static SEQ_AND_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\s+(.*)$").expect("pattern compiles"));
static LEADING_POST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8,}\s*").expect("pattern compiles"));
static SEQ_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\s").expect("pattern compiles"));

/// Recovers the `<TITLE>` part of a gallery-tool default filename, trying the
/// full `<postid>_<nn> <TITLE> [<hash>]` shape first, then stripping the
/// pieces independently.
pub fn parse_title_from_gallery_filename(filename: &str) -> Option<String> {
    let base = EXTENSION.replace(filename, "");
    if let Some(caps) = FULL_SHAPE.captures(&base) {
        let title = caps[1].trim().to_string();
        if !title.is_empty() {
            return Some(title);
        }
    }
    let base = LEADING_SEQ.replace(&base, "");
    let base = TRAILING_TAG.replace(&base, "");
    let base = base.trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// Best-effort title inference from any downloaded image filename. Strips the
/// extension and a trailing hex tag, then looks for the `_<nn> <title>`
/// marker; any leading post id in the title itself is dropped.
pub fn guess_title_from_name(name: &str) -> Option<String> {
    let mut base = name.to_string();
    if let Some(pos) = base.rfind('.') {
        base.truncate(pos);
    }
    let base = TRAILING_HASH.replace(&base, "").into_owned();
    if let Some(caps) = SEQ_AND_TITLE.captures(&base) {
        let title = caps[2].trim();
        let title = LEADING_POST_ID.replace(title, "");
        let title = title.trim();
        return if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        };
    }
    parse_title_from_gallery_filename(name)
}

/// Ordering key for slideshow images: the embedded `_<nn> ` sequence number,
/// or a large sentinel when the name carries none.
pub fn image_sequence_key(name: &str) -> u32 {
    SEQ_KEY
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(99_999)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaceholderPatterns;

    fn rules() -> PlaceholderRules {
        PlaceholderRules::compile(&PlaceholderPatterns::default()).unwrap()
    }

    #[test]
    fn generic_video_title_blanks() {
        let rules = rules();
        assert!(rules.is_placeholder_video_title(Some("TikTok video #123")));
        assert!(rules.is_placeholder_video_title(Some("  tiktok video ")));
        assert!(rules.is_placeholder_video_title(None));
        assert!(rules.is_placeholder_video_title(Some("")));
    }

    #[test]
    fn real_video_title_survives() {
        assert!(!rules().is_placeholder_video_title(Some("My Cool Clip")));
        assert!(!rules().is_placeholder_video_title(Some("TikTok video review")));
    }

    #[test]
    fn slide_placeholders_cover_post_id_shapes() {
        let rules = rules();
        let id = Some("12345678901");
        assert!(rules.is_placeholder_slide_title(Some("tiktok_12345678901"), id));
        assert!(rules.is_placeholder_slide_title(Some("12345678901"), id));
        assert!(rules.is_placeholder_slide_title(Some("TikTok photo #9"), id));
        assert!(!rules.is_placeholder_slide_title(Some("Beach day"), id));
    }

    #[test]
    fn gallery_filename_full_shape() {
        assert_eq!(
            parse_title_from_gallery_filename("7301_01 Sunset walk [a1b2c3d4].jpg").as_deref(),
            Some("Sunset walk")
        );
    }

    #[test]
    fn gallery_filename_partial_shapes() {
        assert_eq!(
            parse_title_from_gallery_filename("7301_01 Sunset walk.jpg").as_deref(),
            Some("Sunset walk")
        );
        assert_eq!(parse_title_from_gallery_filename("7301_01.jpg"), None);
    }

    #[test]
    fn guess_title_strips_hash_and_post_id() {
        assert_eq!(
            guess_title_from_name("12345678901_1 12345678901 Beach day [deadbeef01].jpg")
                .as_deref(),
            Some("Beach day")
        );
        assert_eq!(guess_title_from_name("12345678901_1 [deadbeef01].jpg"), None);
    }

    #[test]
    fn sequence_key_reads_embedded_number() {
        assert_eq!(image_sequence_key("123_2 title.jpg"), 2);
        assert_eq!(image_sequence_key("cover.jpg"), 99_999);
    }
}
