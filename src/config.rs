#![forbid(unsafe_code)]

//! Runtime configuration. Everything here has a sensible default so the tools
//! work out of the box; an optional `archive.toml` in the working directory
//! can override any subset (paths, filename rules, placeholder patterns).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "archive.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub paths: PathsConfig,
    pub filenames: FilenameRules,
    pub placeholders: PlaceholderPatterns,
}

/// Where the ledger, link list, collection tree, and report live. Relative
/// paths are resolved against the working directory, matching how the tools
/// are meant to be run (from the archive root).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub links: PathBuf,
    pub ledger: PathBuf,
    pub errors: PathBuf,
    pub collection: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            links: PathBuf::from("links.txt"),
            ledger: PathBuf::from("downloads.csv"),
            errors: PathBuf::from("errors.csv"),
            collection: PathBuf::from("collection"),
            output: PathBuf::from("archive.html"),
        }
    }
}

/// Filesystem naming policy: the characters and device names Windows rejects,
/// the per-component length cap, and the extension sets used to recognize
/// downloaded media.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilenameRules {
    pub component_limit: usize,
    pub forbidden: String,
    pub reserved: Vec<String>,
    pub video_exts: Vec<String>,
    pub image_exts: Vec<String>,
    pub audio_exts: Vec<String>,
}

impl Default for FilenameRules {
    fn default() -> Self {
        Self {
            component_limit: 199,
            forbidden: String::from("<>:\"/\\|?*"),
            reserved: [
                "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6",
                "COM7", "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7",
                "LPT8", "LPT9",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            video_exts: str_vec(&[".mp4", ".webm", ".mkv", ".mov"]),
            image_exts: str_vec(&[".jpg", ".jpeg", ".png", ".webp"]),
            audio_exts: str_vec(&[".m4a", ".mp3", ".aac", ".wav", ".ogg"]),
        }
    }
}

fn str_vec(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl FilenameRules {
    pub fn is_forbidden(&self, ch: char) -> bool {
        self.forbidden.contains(ch)
    }

    /// Reserved device names are matched against the leading dot-segment,
    /// case-insensitively (`con.mp4` is just as unusable as `CON`).
    pub fn is_reserved(&self, stem: &str) -> bool {
        self.reserved
            .iter()
            .any(|name| name.eq_ignore_ascii_case(stem))
    }

    pub fn is_video(&self, path: &Path) -> bool {
        ext_in(path, &self.video_exts)
    }

    pub fn is_image(&self, path: &Path) -> bool {
        ext_in(path, &self.image_exts)
    }

    pub fn is_audio(&self, path: &Path) -> bool {
        ext_in(path, &self.audio_exts)
    }
}

fn ext_in(path: &Path, exts: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let dotted = format!(".{}", ext.to_ascii_lowercase());
    exts.iter().any(|known| known.as_str() == dotted)
}

/// Placeholder-title regexes (case-insensitive, matched against the whole
/// trimmed title). These encode one platform's default title wording, so they
/// live in configuration rather than code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaceholderPatterns {
    pub video: Vec<String>,
    pub photo: Vec<String>,
}

impl Default for PlaceholderPatterns {
    fn default() -> Self {
        Self {
            video: vec![String::from(r"tiktok\s+video(?:\s*#\d+)?")],
            photo: vec![String::from(r"tiktok\s+photo(?:\s*#\d+)?")],
        }
    }
}

impl ArchiveConfig {
    /// Loads `archive.toml` from the working directory, falling back to the
    /// built-in defaults when the file is absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArchiveConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.paths.ledger, PathBuf::from("downloads.csv"));
        assert_eq!(config.filenames.component_limit, 199);
        assert_eq!(config.placeholders.video.len(), 1);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let cfg =
            make_config("[paths]\nledger = \"log.csv\"\n\n[filenames]\ncomponent_limit = 120\n");
        let config = ArchiveConfig::load_from(cfg.path()).unwrap();
        assert_eq!(config.paths.ledger, PathBuf::from("log.csv"));
        assert_eq!(config.paths.collection, PathBuf::from("collection"));
        assert_eq!(config.filenames.component_limit, 120);
        assert!(!config.filenames.video_exts.is_empty());
    }

    #[test]
    fn placeholder_patterns_can_be_replaced() {
        let cfg = make_config("[placeholders]\nvideo = [\"untitled\\\\s+clip\"]\n");
        let config = ArchiveConfig::load_from(cfg.path()).unwrap();
        assert_eq!(config.placeholders.video, vec![r"untitled\s+clip"]);
        // Photo patterns keep their default.
        assert_eq!(config.placeholders.photo.len(), 1);
    }

    #[test]
    fn reserved_names_match_case_insensitively() {
        let rules = FilenameRules::default();
        assert!(rules.is_reserved("con"));
        assert!(rules.is_reserved("LPT9"));
        assert!(!rules.is_reserved("console"));
    }

    #[test]
    fn extension_sets_ignore_case() {
        let rules = FilenameRules::default();
        assert!(rules.is_video(Path::new("clip.MP4")));
        assert!(rules.is_image(Path::new("1.jpeg")));
        assert!(rules.is_audio(Path::new("sound.m4a")));
        assert!(!rules.is_video(Path::new("notes.txt")));
        assert!(!rules.is_video(Path::new("bare")));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let cfg = make_config("[paths\nledger=");
        assert!(ArchiveConfig::load_from(cfg.path()).is_err());
    }
}
