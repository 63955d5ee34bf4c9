#![forbid(unsafe_code)]

//! The collection tree: one entry per index, either a video file
//! (`"12. Title.mp4"` / `"12.mp4"`) or a slideshow folder (`"12. Title"` /
//! `"12"`). This module owns name parsing, asset discovery by index, and the
//! dense renumbering pass with its two-phase rename.

use crate::config::FilenameRules;
use crate::ledger::LedgerRow;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

// Accepted leading-index shapes, tried in order:
//   "12. Title.ext", "12 Title.ext", "12.ext", "12"
static IDX_DOT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(\.\s+.*)$").expect("pattern compiles"));
static IDX_SPACE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(\s+.*)$").expect("pattern compiles"));
static IDX_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(\.\w+)$").expect("pattern compiles"));
static IDX_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("pattern compiles"));

/// Splits an entry name into its leading index and the remaining suffix
/// (everything from the character right after the digits, so renumbering is
/// `format!("{new}{rest}")`).
pub fn parse_index(name: &str) -> Option<(u32, String)> {
    for pattern in [&IDX_DOT_TITLE, &IDX_SPACE_TITLE, &IDX_EXT] {
        if let Some(caps) = pattern.captures(name) {
            return Some((caps[1].parse().ok()?, caps[2].to_string()));
        }
    }
    if let Some(caps) = IDX_BARE.captures(name) {
        return Some((caps[1].parse().ok()?, String::new()));
    }
    None
}

/// Scans the collection root for indexed entries, first one per index wins.
/// Duplicates are warned about and skipped; names without a leading index are
/// ignored entirely.
pub fn indexed_items(root: &Path) -> Result<BTreeMap<u32, PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("reading {}", root.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("reading {}", root.display()))?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort_by_key(|path| entry_name(path).to_lowercase());

    let mut items: BTreeMap<u32, PathBuf> = BTreeMap::new();
    for path in entries {
        let Some((index, _)) = parse_index(&entry_name(&path)) else {
            continue;
        };
        if let Some(existing) = items.get(&index) {
            eprintln!(
                "  Warning: duplicate index {} for {} (keeping {})",
                index,
                path.display(),
                existing.display()
            );
            continue;
        }
        items.insert(index, path);
    }
    Ok(items)
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Video lookup for the renderer: the name must start with `"{idx}."` and
/// carry a known video extension.
pub fn find_video_for_index(
    rules: &FilenameRules,
    root: &Path,
    index: u32,
) -> Result<Option<PathBuf>> {
    let prefix = format!("{index}.");
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let path = entry
            .with_context(|| format!("reading {}", root.display()))?
            .path();
        if path.is_file() && entry_name(&path).starts_with(&prefix) && rules.is_video(&path) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Slideshow lookup for the renderer: exactly `"{idx}"` or a `"{idx}."`
/// prefix, directories only.
pub fn find_slideshow_dir_for_index(root: &Path, index: u32) -> Result<Option<PathBuf>> {
    let exact = root.join(index.to_string());
    if exact.is_dir() {
        return Ok(Some(exact));
    }
    let prefix = format!("{index}.");
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let path = entry
            .with_context(|| format!("reading {}", root.display()))?
            .path();
        if path.is_dir() && entry_name(&path).starts_with(&prefix) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn starts_with_index(name: &str, index: u32) -> bool {
    let digits = index.to_string();
    let Some(rest) = name.strip_prefix(&digits) else {
        return false;
    };
    match rest.chars().next() {
        None => true,
        Some(' ' | '.') => true,
        Some(_) => false,
    }
}

/// Relaxed video lookup used when merging collections: index followed by a
/// space or dot, known extension, lexicographically first match for
/// determinism.
pub fn find_video_relaxed(
    rules: &FilenameRules,
    root: &Path,
    index: u32,
) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let path = entry
            .with_context(|| format!("reading {}", root.display()))?
            .path();
        if path.is_file() && rules.is_video(&path) && starts_with_index(&entry_name(&path), index) {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Relaxed slideshow lookup used when merging collections.
pub fn find_slideshow_relaxed(root: &Path, index: u32) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let path = entry
            .with_context(|| format!("reading {}", root.display()))?
            .path();
        if path.is_dir() && starts_with_index(&entry_name(&path), index) {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Images inside a slideshow folder, sorted by the numeric head of the stem
/// (either the whole stem or the part before the first `_` of the first
/// whitespace token), ties broken by lowercase name. A missing folder yields
/// an empty list.
pub fn list_images(rules: &FilenameRules, dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut images: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && rules.is_image(path))
        .collect();
    images.sort_by_key(|path| image_order_key(path));
    images
}

fn image_order_key(path: &Path) -> (u64, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let head = stem
        .split_whitespace()
        .next()
        .and_then(|token| token.split('_').next())
        .unwrap_or("");
    let number = head
        .parse::<u64>()
        .or_else(|_| stem.parse::<u64>())
        .unwrap_or(10_000_000);
    (number, stem.to_lowercase())
}

/// The slideshow audio track, any file whose stem is `sound`.
pub fn find_audio(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file()
            && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            && stem.eq_ignore_ascii_case("sound")
        {
            return Some(path);
        }
    }
    None
}

/// Returns a free path under `parent`, appending `" (n)"` before the
/// extension (files) or at the end (directories) until nothing collides.
pub fn ensure_unique_name(parent: &Path, name: &str, is_file: bool) -> PathBuf {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (base, ext) = if is_file {
        match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos..]),
            None => (name, ""),
        }
    } else {
        (name, "")
    };
    let mut n = 1u32;
    loop {
        let alt = parent.join(format!("{base} ({n}){ext}"));
        if !alt.exists() {
            return alt;
        }
        n += 1;
    }
}

/// Copies a directory tree, creating every parent along the way.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("walking {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .context("walked entry outside its root")?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copying to {}", target.display()))?;
        }
    }
    Ok(())
}

/// Dense renumbering mapping, old index -> new index 1..N by ascending old
/// index.
pub fn pack_mapping(items: &BTreeMap<u32, PathBuf>) -> BTreeMap<u32, u32> {
    items
        .keys()
        .enumerate()
        .map(|(pos, &old)| (old, pos as u32 + 1))
        .collect()
}

/// True when the indices are already exactly 1..N, meaning no renames are
/// needed.
pub fn is_contiguous(items: &BTreeMap<u32, PathBuf>) -> bool {
    items
        .keys()
        .enumerate()
        .all(|(pos, &index)| index == pos as u32 + 1)
}

/// Renames every item to its new index in two phases so overlapping
/// old/new names never collide: first everything moves to a short per-run
/// temp name in the same directory, then temp names move to their final
/// names. Leftover temps from a crashed run and final-name collisions are
/// uniquified instead of clobbered. Returns `(old_name, new_name)` pairs.
pub fn two_phase_renames(
    mapping: &BTreeMap<u32, u32>,
    items: &BTreeMap<u32, PathBuf>,
) -> Result<Vec<(String, String)>> {
    let tmp_tag = format!("__t__{:08x}_", std::process::id());
    let mut uniquifier = 0u32;

    // Phase 1: old -> temp.
    let mut moved: Vec<(PathBuf, PathBuf, String)> = Vec::new();
    for (&old_index, path) in items {
        let new_index = mapping[&old_index];
        let name = entry_name(path);
        let (_, rest) = parse_index(&name)
            .with_context(|| format!("entry lost its leading index: {name}"))?;
        let final_name = format!("{new_index}{rest}");

        let suffix = if path.is_file() {
            path.extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default()
        } else {
            String::new()
        };
        let mut tmp_path = path.with_file_name(format!("{tmp_tag}{old_index}{suffix}"));
        if tmp_path.exists() {
            uniquifier += 1;
            tmp_path = path.with_file_name(format!("{tmp_tag}{old_index}_{uniquifier}{suffix}"));
        }
        fs::rename(path, &tmp_path)
            .with_context(|| format!("renaming {} to temp", path.display()))?;
        moved.push((tmp_path, path.with_file_name(&final_name), name));
    }

    // Phase 2: temp -> final.
    let mut changes = Vec::new();
    for (tmp_path, mut final_path, old_name) in moved {
        if final_path.exists() {
            uniquifier += 1;
            let final_name = entry_name(&final_path);
            let conflict_name = if final_path.is_file() {
                match final_name.rfind('.') {
                    Some(pos) => format!(
                        "{}__conflict__{}{}",
                        &final_name[..pos],
                        uniquifier,
                        &final_name[pos..]
                    ),
                    None => format!("{final_name}__conflict__{uniquifier}"),
                }
            } else {
                format!("{final_name}__conflict__{uniquifier}")
            };
            final_path = final_path.with_file_name(conflict_name);
        }
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("renaming {} to final", tmp_path.display()))?;
        changes.push((old_name, entry_name(&final_path)));
    }
    Ok(changes)
}

/// Applies the pack mapping to ledger rows: rows whose index has no backing
/// item are dropped, the rest are renumbered and sorted. Returns
/// `(kept, reindexed (old, new, title), removed)`.
pub fn pack_ledger_rows(
    rows: Vec<LedgerRow>,
    mapping: &BTreeMap<u32, u32>,
) -> (Vec<LedgerRow>, Vec<(u32, u32, String)>, Vec<LedgerRow>) {
    let mut kept = Vec::new();
    let mut reindexed = Vec::new();
    let mut removed = Vec::new();
    for row in rows {
        let Some(&new_index) = mapping.get(&row.index) else {
            removed.push(row);
            continue;
        };
        if new_index != row.index {
            reindexed.push((row.index, new_index, row.title.clone()));
        }
        kept.push(LedgerRow {
            index: new_index,
            ..row
        });
    }
    kept.sort_by_key(|row| row.index);
    (kept, reindexed, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_index_accepts_all_shapes() {
        assert_eq!(
            parse_index("12. Title.mp4"),
            Some((12, ". Title.mp4".to_string()))
        );
        assert_eq!(
            parse_index("12 Title.mp4"),
            Some((12, " Title.mp4".to_string()))
        );
        assert_eq!(parse_index("12.mp4"), Some((12, ".mp4".to_string())));
        assert_eq!(parse_index("12"), Some((12, String::new())));
        assert_eq!(parse_index("notes.txt"), None);
        assert_eq!(parse_index("thumbnails"), None);
    }

    #[test]
    fn indexed_items_keeps_first_duplicate() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("3. a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("3. b.mp4"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("7. slides")).unwrap();
        std::fs::write(dir.path().join("README"), b"x").unwrap();

        let items = indexed_items(dir.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[&3].file_name().unwrap().to_str().unwrap(),
            "3. a.mp4"
        );
        assert!(items[&7].is_dir());
    }

    #[test]
    fn renderer_lookups_are_strict() {
        let rules = FilenameRules::default();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("4. clip.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("41. other.mp4"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("9")).unwrap();
        std::fs::create_dir(dir.path().join("10. beach")).unwrap();

        let video = find_video_for_index(&rules, dir.path(), 4).unwrap().unwrap();
        assert_eq!(video.file_name().unwrap().to_str().unwrap(), "4. clip.mp4");
        assert!(find_video_for_index(&rules, dir.path(), 1).unwrap().is_none());

        let exact = find_slideshow_dir_for_index(dir.path(), 9).unwrap().unwrap();
        assert_eq!(exact.file_name().unwrap().to_str().unwrap(), "9");
        let prefixed = find_slideshow_dir_for_index(dir.path(), 10).unwrap().unwrap();
        assert_eq!(prefixed.file_name().unwrap().to_str().unwrap(), "10. beach");
    }

    #[test]
    fn relaxed_lookup_requires_boundary_after_index() {
        let rules = FilenameRules::default();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("10.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("100.mp4"), b"x").unwrap();

        let found = find_video_relaxed(&rules, dir.path(), 10).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap().to_str().unwrap(), "10.mp4");
        assert!(find_video_relaxed(&rules, dir.path(), 1).unwrap().is_none());
    }

    #[test]
    fn images_sort_by_numeric_key_then_name() {
        let rules = FilenameRules::default();
        let dir = tempdir().unwrap();
        for name in ["10.jpg", "2.jpg", "1.jpg", "cover art.png", "sound.mp3"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = list_images(&rules, dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.jpg", "2.jpg", "10.jpg", "cover art.png"]);
    }

    #[test]
    fn audio_is_found_by_stem() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("1.jpg"), b"x").unwrap();
        assert!(find_audio(dir.path()).is_none());
        std::fs::write(dir.path().join("sound.m4a"), b"x").unwrap();
        let audio = find_audio(dir.path()).unwrap();
        assert_eq!(audio.file_name().unwrap().to_str().unwrap(), "sound.m4a");
    }

    #[test]
    fn unique_name_appends_counter() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("5. clip.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("5. clip (1).mp4"), b"x").unwrap();
        let path = ensure_unique_name(dir.path(), "5. clip.mp4", true);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "5. clip (2).mp4"
        );
        let fresh = ensure_unique_name(dir.path(), "6. other.mp4", true);
        assert_eq!(fresh.file_name().unwrap().to_str().unwrap(), "6. other.mp4");
    }

    #[test]
    fn pack_mapping_is_dense_and_ordered() {
        let mut items = BTreeMap::new();
        for index in [1u32, 3, 4] {
            items.insert(index, PathBuf::from(index.to_string()));
        }
        let mapping = pack_mapping(&items);
        assert_eq!(mapping[&1], 1);
        assert_eq!(mapping[&3], 2);
        assert_eq!(mapping[&4], 3);
        assert!(!is_contiguous(&items));

        let mut dense = BTreeMap::new();
        for index in [1u32, 2, 3] {
            dense.insert(index, PathBuf::from(index.to_string()));
        }
        assert!(is_contiguous(&dense));
    }

    #[test]
    fn two_phase_pack_handles_overlapping_names() {
        let dir = tempdir().unwrap();
        // 2 must move to 1 while 3 moves to 2; one-phase renames would
        // collide on "2. b.mp4".
        std::fs::write(dir.path().join("2. b.mp4"), b"b").unwrap();
        std::fs::write(dir.path().join("3. c.mp4"), b"c").unwrap();
        std::fs::create_dir(dir.path().join("5")).unwrap();

        let items = indexed_items(dir.path()).unwrap();
        let mapping = pack_mapping(&items);
        let changes = two_phase_renames(&mapping, &items).unwrap();
        assert_eq!(changes.len(), 3);

        assert!(dir.path().join("1. b.mp4").is_file());
        assert!(dir.path().join("2. c.mp4").is_file());
        assert!(dir.path().join("3").is_dir());
        assert_eq!(std::fs::read(dir.path().join("1. b.mp4")).unwrap(), b"b");
    }

    #[test]
    fn pack_ledger_drops_rows_without_items() {
        let rows = vec![
            LedgerRow {
                index: 1,
                title: "keep".into(),
                url: "https://x/1".into(),
            },
            LedgerRow {
                index: 2,
                title: "gone".into(),
                url: "https://x/2".into(),
            },
            LedgerRow {
                index: 3,
                title: "move".into(),
                url: "https://x/3".into(),
            },
        ];
        let mut mapping = BTreeMap::new();
        mapping.insert(1u32, 1u32);
        mapping.insert(3, 2);
        let (kept, reindexed, removed) = pack_ledger_rows(rows, &mapping);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].index, 2);
        assert_eq!(kept[1].title, "move");
        assert_eq!(reindexed, vec![(3, 2, "move".to_string())]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].index, 2);
    }

    #[test]
    fn copy_dir_recursive_copies_nested_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("1.jpg"), b"a").unwrap();
        std::fs::write(src.join("nested/2.jpg"), b"b").unwrap();

        let dst = dir.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();
        assert_eq!(std::fs::read(dst.join("1.jpg")).unwrap(), b"a");
        assert_eq!(std::fs::read(dst.join("nested/2.jpg")).unwrap(), b"b");
    }
}
