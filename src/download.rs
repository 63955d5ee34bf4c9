#![forbid(unsafe_code)]

//! The batch download run. Every input URL reaches a terminal state: either
//! Saved (media on disk, ledger row appended) or Failed (error row appended,
//! ledger row still appended so the index stays burned). One URL's failure
//! never stops the run.

use crate::config::ArchiveConfig;
use crate::exec;
use crate::ledger::{ErrorRow, LedgerRow, LedgerWriter, load_summary};
use crate::links::{PostKind, classify, extract_post_id};
use crate::sanitize::{sanitize_component, trim_fs_component};
use crate::titles::{PlaceholderRules, guess_title_from_name, image_sequence_key};
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Subset of yt-dlp's `-J` payload; everything optional because metadata is
/// frequently missing.
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub attempted: usize,
    pub skipped: usize,
    pub failed: Vec<u32>,
}

/// Probes post metadata. Any failure (tool error, bad JSON) degrades to an
/// empty payload; the download proceeds with a blank title.
fn fetch_video_info(url: &str) -> VideoInfo {
    let output = exec::yt_dlp_command()
        .args(["-J", "--no-warnings", url])
        .output();
    let Ok(output) = output else {
        return VideoInfo::default();
    };
    if !output.status.success() || output.stdout.is_empty() {
        return VideoInfo::default();
    }
    serde_json::from_slice(&output.stdout).unwrap_or_default()
}

/// Downloads one video to `"{index}. {title}.ext"` (bare `"{index}.ext"` when
/// the title is blank). Success requires a zero exit **and** at least one
/// produced file with a known video extension.
fn download_video(
    config: &ArchiveConfig,
    index: u32,
    url: &str,
    title_for_fs: &str,
    root: &Path,
) -> Result<()> {
    let stem = trim_fs_component(&config.filenames, &index.to_string(), title_for_fs, 5);
    let template = root.join(format!("{stem}.%(ext)s"));
    println!("[video] yt-dlp -> {}", template.display());

    let output = exec::run_logged(
        exec::yt_dlp_command().arg("-o").arg(&template).arg(url),
        exec::YT_DLP,
    )?;
    if !output.status.success() {
        bail!("yt-dlp exit {}", output.status);
    }

    let produced = find_produced_video(config, root, &stem)?;
    if produced.is_none() {
        bail!("no output video file found");
    }
    Ok(())
}

fn find_produced_video(
    config: &ArchiveConfig,
    root: &Path,
    stem: &str,
) -> Result<Option<PathBuf>> {
    let prefix = format!("{stem}.");
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let path = entry
            .with_context(|| format!("reading {}", root.display()))?
            .path();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_file() && name.starts_with(&prefix) && config.filenames.is_video(&path) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Downloads one slideshow: gallery tool into a staging directory under the
/// collection root, images copied into the final folder as `1.ext..N.ext`,
/// optional audio as `sound.ext`. Returns the display title for the ledger
/// (blank when only a placeholder could be inferred). The staging directory
/// is removed whatever happens.
fn process_slideshow(
    config: &ArchiveConfig,
    placeholders: &PlaceholderRules,
    index: u32,
    url: &str,
    root: &Path,
) -> Result<String> {
    let post_id = extract_post_id(url);
    let staging = tempfile::Builder::new()
        .prefix(&format!("_t_{post_id}_"))
        .tempdir_in(root)
        .with_context(|| format!("creating staging directory under {}", root.display()))?;

    println!("[photo] gallery-dl -> {}", staging.path().display());
    exec::run_logged(
        exec::gallery_dl_command()
            .arg("-o")
            .arg(format!("base-directory={}", staging.path().display()))
            .arg("-o")
            .arg("directory=.")
            .arg(url),
        exec::GALLERY_DL,
    )?;
    // A non-zero exit still counts if files landed; checked below.

    let (mut images, mut audio) = scan_staging(config, staging.path());
    if images.is_empty() {
        bail!("no images found; not a valid slideshow or gallery-dl failed");
    }

    let mut inferred = None;
    let mut by_name = images.clone();
    by_name.sort();
    for path in &by_name {
        if let Some(name) = path.file_name().and_then(|name| name.to_str())
            && let Some(title) = guess_title_from_name(name)
        {
            inferred = Some(title);
            break;
        }
    }

    let display_title =
        if placeholders.is_placeholder_slide_title(inferred.as_deref(), Some(&post_id)) {
            String::new()
        } else {
            inferred.unwrap_or_default()
        };

    let folder_name = if display_title.is_empty() {
        trim_fs_component(&config.filenames, &index.to_string(), "", 0)
    } else {
        let safe_title = sanitize_component(&config.filenames, &display_title, None);
        trim_fs_component(&config.filenames, &index.to_string(), &safe_title, 0)
    };
    let final_dir = root.join(&folder_name);
    fs::create_dir_all(&final_dir)
        .with_context(|| format!("creating {}", final_dir.display()))?;

    images.sort_by_key(|path| {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        (image_sequence_key(&name), name.to_lowercase())
    });
    for (position, src) in images.iter().enumerate() {
        let ext = lower_ext(src);
        let dst = final_dir.join(format!("{}{ext}", position + 1));
        fs::copy(src, &dst).with_context(|| format!("copying to {}", dst.display()))?;
    }

    if audio.is_empty() {
        // Best effort: pull the post audio separately. Failure here never
        // fails the slideshow.
        let template = staging.path().join("extracted_audio.%(ext)s");
        println!("[photo] yt-dlp (audio fallback) -> {}", template.display());
        exec::run_logged(
            exec::yt_dlp_command()
                .args(["-x", "--audio-format", "mp3", "-o"])
                .arg(&template)
                .arg(url),
            exec::YT_DLP,
        )?;
        (_, audio) = scan_staging(config, staging.path());
    }

    if !audio.is_empty() {
        audio.sort_by_key(|path| {
            std::cmp::Reverse(fs::metadata(path).map(|meta| meta.len()).unwrap_or(0))
        });
        let best = &audio[0];
        let dst = final_dir.join(format!("sound{}", lower_ext(best)));
        fs::copy(best, &dst).with_context(|| format!("copying to {}", dst.display()))?;
    }

    println!("[photo] Saved -> {}", final_dir.display());
    Ok(display_title)
}

fn scan_staging(config: &ArchiveConfig, staging: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut images = Vec::new();
    let mut audio = Vec::new();
    for entry in WalkDir::new(staging).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if config.filenames.is_image(&path) {
            images.push(path);
        } else if config.filenames.is_audio(&path) {
            audio.push(path);
        }
    }
    (images, audio)
}

fn lower_ext(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Processes every URL in order. Already-archived URLs and in-run duplicates
/// are skipped without consuming an index; everything else gets the next
/// index whether it succeeds or not, one ledger row per processed URL, one
/// error row per failure.
pub fn run(config: &ArchiveConfig, urls: &[String]) -> Result<RunSummary> {
    let placeholders = PlaceholderRules::compile(&config.placeholders)?;
    let root = &config.paths.collection;
    fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;

    let mut state = load_summary(&config.paths.ledger)?;
    let mut next_index = state.next_index();
    let mut writer = LedgerWriter::open_append(&config.paths.ledger)?;

    let mut summary = RunSummary::default();
    for url in urls {
        let url = url.trim();
        if url.is_empty() {
            continue;
        }
        if state.urls.contains(url) {
            println!("[skip] Already saved: {url}");
            summary.skipped += 1;
            continue;
        }
        state.urls.insert(url.to_string());

        let index = next_index;
        next_index += 1;
        summary.attempted += 1;

        let kind = classify(url);
        println!("\n=== [{index}] {} ===\n{url}", kind.label().to_uppercase());

        let title_for_csv = match kind {
            PostKind::Video => {
                let info = fetch_video_info(url);
                let raw_title = info
                    .title
                    .or(info.description)
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default();
                let title = if placeholders.is_placeholder_video_title(Some(&raw_title)) {
                    String::new()
                } else {
                    raw_title
                };
                let title_for_fs = if title.is_empty() {
                    String::new()
                } else {
                    sanitize_component(&config.filenames, &title, None)
                };
                if let Err(err) = download_video(config, index, url, &title_for_fs, root) {
                    record_failure(config, &mut summary, index, kind, url, &err)?;
                }
                title
            }
            PostKind::Photo => {
                match process_slideshow(config, &placeholders, index, url, root) {
                    Ok(title) => title,
                    Err(err) => {
                        record_failure(config, &mut summary, index, kind, url, &err)?;
                        String::new()
                    }
                }
            }
        };

        writer.append(&LedgerRow {
            index,
            title: title_for_csv,
            url: url.to_string(),
        })?;
    }
    Ok(summary)
}

fn record_failure(
    config: &ArchiveConfig,
    summary: &mut RunSummary,
    index: u32,
    kind: PostKind,
    url: &str,
    err: &anyhow::Error,
) -> Result<()> {
    eprintln!("  Warning: [{index}] {err:#}");
    crate::ledger::append_error(
        &config.paths.errors,
        &ErrorRow {
            index,
            kind,
            url: url.to_string(),
            message: format!("{err:#}"),
        },
    )
    .map_err(|append_err| anyhow!("{append_err:#} (while recording: {err:#})"))?;
    summary.failed.push(index);
    Ok(())
}
