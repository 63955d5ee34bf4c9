#![forbid(unsafe_code)]

//! Static gallery renderer. Walks the ledger and the collection tree, builds
//! one card per item (video with cached thumbnail, or slideshow with
//! thumbnails and optional audio), and writes `archive.html` next to the
//! collection. A page that already carries the grid markers is patched in
//! place so hand edits outside the grid survive regeneration.

use crate::collection::{find_audio, find_slideshow_dir_for_index, find_video_for_index, list_images};
use crate::config::ArchiveConfig;
use crate::exec;
use crate::ledger::read_rows;
use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const GRID_BEGIN: &str = "<!-- BEGIN GRID -->";
pub const GRID_END: &str = "<!-- END GRID -->";

// Matches Python's urllib `quote(seg, safe="")`: encode everything except
// unreserved characters.
const HREF_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("pattern compiles"));
static ITEM_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s+item\(s\)").expect("pattern compiles"));

#[derive(Debug)]
pub struct ArchiveItem {
    pub index: u32,
    pub title: String,
    pub media: ItemMedia,
}

#[derive(Debug)]
pub enum ItemMedia {
    Video {
        src: String,
        thumbnail: Option<String>,
    },
    Slideshow {
        images: Vec<String>,
        audio: Option<String>,
        cover: Option<String>,
    },
}

/// Relative href from the output document to an asset inside the collection,
/// percent-encoded segment by segment.
fn asset_href(config: &ArchiveConfig, path: &Path) -> Option<String> {
    let root = &config.paths.collection;
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = vec![encode_segment(&root.file_name()?.to_string_lossy())];
    for component in rel.components() {
        segments.push(encode_segment(&component.as_os_str().to_string_lossy()));
    }
    Some(segments.join("/"))
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, HREF_SEGMENT).to_string()
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Cached thumbnail for a video, generated on first sight. The frame grab is
/// taken at one second in, retried at zero for clips shorter than that; both
/// failing degrades the card to an inline `<video>` element.
fn get_or_create_thumbnail(
    config: &ArchiveConfig,
    index: u32,
    video: &Path,
) -> Result<Option<PathBuf>> {
    let thumb_dir = config.paths.collection.join("thumbnails");
    fs::create_dir_all(&thumb_dir)
        .with_context(|| format!("creating {}", thumb_dir.display()))?;
    let thumb = thumb_dir.join(format!("{index}.jpg"));
    if thumb.exists() {
        return Ok(Some(thumb));
    }

    println!(
        "  > Generating thumbnail for #{index} ({})...",
        video.file_name().unwrap_or_default().to_string_lossy()
    );
    for offset in ["00:00:01", "00:00:00"] {
        let output = exec::run_logged(
            exec::ffmpeg_command()
                .args(["-ss", offset, "-i"])
                .arg(video)
                .args(["-vframes", "1", "-q:v", "3", "-hide_banner", "-loglevel", "error"])
                .arg(&thumb),
            exec::FFMPEG,
        )?;
        if output.status.success() && thumb.exists() {
            return Ok(Some(thumb));
        }
    }
    eprintln!("  Warning: failed to generate thumbnail for #{index}");
    Ok(None)
}

/// Gathers the item list: every index named by the ledger or discovered in
/// the collection, ascending. An index backed by neither a slideshow folder
/// nor a video file is warned about and skipped.
pub fn build_items(config: &ArchiveConfig) -> Result<Vec<ArchiveItem>> {
    let root = &config.paths.collection;
    let titles: BTreeMap<u32, String> = if config.paths.ledger.exists() {
        read_rows(&config.paths.ledger)?
            .into_iter()
            .map(|row| (row.index, row.title.trim().to_string()))
            .collect()
    } else {
        BTreeMap::new()
    };

    let mut order: BTreeSet<u32> = titles.keys().copied().collect();
    if root.exists() {
        for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
            let entry = entry.with_context(|| format!("reading {}", root.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(caps) = LEADING_DIGITS.captures(&name)
                && let Ok(index) = caps[1].parse::<u32>()
            {
                order.insert(index);
            }
        }
    }

    let mut items = Vec::new();
    for index in order {
        let mut title = titles.get(&index).cloned().unwrap_or_default();

        if let Some(slide_dir) = find_slideshow_dir_for_index(root, index)? {
            let images = list_images(&config.filenames, &slide_dir);
            let audio = find_audio(&slide_dir);
            if title.is_empty() {
                title = infer_title_from_dirname(index, &slide_dir);
            }
            let hrefs: Vec<String> = images
                .iter()
                .filter_map(|image| asset_href(config, image))
                .collect();
            let cover = hrefs.first().cloned();
            items.push(ArchiveItem {
                index,
                title,
                media: ItemMedia::Slideshow {
                    images: hrefs,
                    audio: audio.and_then(|audio| asset_href(config, &audio)),
                    cover,
                },
            });
            continue;
        }

        if let Some(video) = find_video_for_index(&config.filenames, root, index)? {
            let thumbnail = get_or_create_thumbnail(config, index, &video)?;
            if let Some(src) = asset_href(config, &video) {
                items.push(ArchiveItem {
                    index,
                    title,
                    media: ItemMedia::Video {
                        src,
                        thumbnail: thumbnail.and_then(|thumb| asset_href(config, &thumb)),
                    },
                });
                continue;
            }
        }

        eprintln!("  Warning: no slideshow or video found for index {index}");
    }
    Ok(items)
}

fn infer_title_from_dirname(index: u32, dir: &Path) -> String {
    let name = dir.file_name().unwrap_or_default().to_string_lossy();
    let prefix = format!("{index}. ");
    name.strip_prefix(&prefix)
        .map(|rest| rest.trim().to_string())
        .unwrap_or_default()
}

fn render_item_card(item: &ArchiveItem) -> String {
    let index = item.index;
    let title = html_escape(&item.title);
    let title_html = if title.is_empty() {
        String::new()
    } else {
        format!("<div class='title'>{title}</div>")
    };

    match &item.media {
        ItemMedia::Video { src, thumbnail } => {
            let meta = format!("<span class='badge'>VIDEO</span><span>#{index}</span>");
            let media_html = match thumbnail {
                Some(thumb) => format!(
                    r#"<img src="{thumb}" alt="Thumbnail for {title}" loading="lazy">"#
                ),
                None => format!(
                    r#"<video src="{src}" preload="metadata" muted playsinline></video>"#
                ),
            };
            format!(
                r#"      <article class="card" data-type="video">
        <div class="media" data-lightbox-src="{src}" role="button" title="Click to enlarge">
          {media_html}
        </div>
        <div class="body">
          {title_html}
          <div class="meta">{meta}</div>
        </div>
      </article>"#
            )
        }
        ItemMedia::Slideshow {
            images,
            audio,
            cover,
        } => {
            let meta = format!("<span class='badge'>SLIDESHOW</span><span>#{index}</span>");
            let images_json = serde_json::to_string(images)
                .unwrap_or_else(|_| "[]".to_string())
                .replace('"', "&quot;");
            let audio_attr = audio.clone().unwrap_or_default();
            let thumbs: String = images
                .iter()
                .enumerate()
                .map(|(position, image)| {
                    format!(r#"<img src="{image}" loading="lazy" alt="" data-idx="{position}">"#)
                })
                .collect();
            let audio_html = match audio {
                Some(audio) => {
                    format!(r#"<audio controls preload="metadata" src="{audio}"></audio>"#)
                }
                None => String::new(),
            };
            let media_html = match cover {
                Some(cover) => format!(r#"<img src="{cover}" alt="" data-idx="0">"#),
                None => "<div style='color:var(--muted)'>No images</div>".to_string(),
            };
            let audio_note = if audio.is_some() { " • audio" } else { "" };
            let photo_count = images.len();
            format!(
                r#"      <article class="card" data-type="slideshow" data-images="{images_json}" data-audio="{audio_attr}">
        <div class="media" role="button" title="Click to view slideshow">
          {media_html}
        </div>
        <div class="body">
          {title_html}
          <div class="meta">{meta} • {photo_count} photo(s){audio_note}</div>
        </div>
        <details class="gallery">
          <summary>Show all photos</summary>
          <div class="thumbs">
            {thumbs}
          </div>
          {audio_html}
        </details>
      </article>"#
            )
        }
    }
}

pub fn render_grid(items: &[ArchiveItem]) -> String {
    items
        .iter()
        .map(render_item_card)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Patches an existing document in place: swaps the block between the grid
/// markers and fixes the first `N item(s)` occurrence. `None` means the
/// markers are gone and the caller should rewrite the whole document.
pub fn update_existing_html(old_html: &str, grid_html: &str, item_count: usize) -> Option<String> {
    let begin = old_html.find(GRID_BEGIN)?;
    let end_marker = old_html[begin..].find(GRID_END)? + begin + GRID_END.len();

    let mut updated = String::with_capacity(old_html.len() + grid_html.len());
    updated.push_str(&old_html[..begin]);
    updated.push_str(GRID_BEGIN);
    updated.push('\n');
    updated.push_str(grid_html);
    updated.push_str("\n    ");
    updated.push_str(GRID_END);
    updated.push_str(&old_html[end_marker..]);

    let updated = ITEM_COUNT
        .replace(&updated, format!("{item_count} item(s)"))
        .into_owned();
    Some(updated)
}

fn full_document(item_count: usize, grid_html: &str) -> String {
    PAGE_TEMPLATE
        .replace("%COUNT%", &item_count.to_string())
        .replace("%GRID%", grid_html)
}

/// Writes or patches the output document. Both paths produce byte-identical
/// output for unchanged inputs, so rerunning the renderer is free.
pub fn write_archive(config: &ArchiveConfig, items: &[ArchiveItem]) -> Result<()> {
    let out = &config.paths.output;
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let grid_html = render_grid(items);

    if out.exists() {
        let old = fs::read_to_string(out).unwrap_or_default();
        if let Some(patched) = update_existing_html(&old, &grid_html, items.len()) {
            fs::write(out, patched).with_context(|| format!("writing {}", out.display()))?;
            println!("[ok] Updated existing {} (grid + count).", out.display());
            return Ok(());
        }
    }

    let html = full_document(items.len(), &grid_html);
    fs::write(out, html).with_context(|| format!("writing {}", out.display()))?;
    println!("[ok] Wrote {}", out.display());
    Ok(())
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width,initial-scale=1" />
<title>TikTok Archive</title>
<style>
  :root {
    --bg: #0b0b0c;
    --card: #141417;
    --muted: #9aa0a6;
    --text: #e8eaed;
    --accent: #5e9cff;
    --chip: #1f2937;
    --chip-text: #cbd5e1;
    --border: #2a2b31;
  }
  html, body { margin:0; padding:0; background:var(--bg); color:var(--text); font-family: system-ui, -apple-system, Segoe UI, Roboto, Inter, Arial, sans-serif; }
  header {
    position: sticky; top: 0; z-index: 10;
    background: linear-gradient(180deg, rgba(11,11,12,0.95) 0%, rgba(11,11,12,0.75) 100%);
    backdrop-filter: blur(8px);
    border-bottom: 1px solid var(--border);
  }
  .wrap { max-width: 1440px; margin: 0 auto; padding: 16px 20px; }
  h1 { margin: 0; font-size: 20px; letter-spacing: 0.2px; }
  .muted { color: var(--muted); font-size: 14px; }
  .filters { display:flex; gap:8px; align-items:center; margin-top: 10px; flex-wrap: wrap; }
  .chip {
    border: 1px solid var(--border); background: var(--chip); color: var(--chip-text);
    padding: 6px 10px; border-radius: 999px; font-size: 12px; cursor: pointer; user-select: none;
  }
  .chip.active { outline: 2px solid var(--accent); color: white; }

  main .grid {
    display: grid; grid-template-columns: repeat(auto-fill, minmax(420px, 1fr));
    gap: 16px; padding: 16px 20px 60px; max-width: 1440px; margin: 0 auto;
  }
  .card {
    background: var(--card); border: 1px solid var(--border); border-radius: 16px;
    overflow: hidden; display:flex; flex-direction: column;
    box-shadow: 0 0 0 1px rgba(255,255,255,0.02), 0 12px 30px rgba(0,0,0,0.35);
  }
  .media {
    aspect-ratio: 16 / 9;
    background: #0f1115; display:flex; align-items:center; justify-content:center;
    cursor: pointer;
  }
  video, img { max-width: 100%; max-height: 100%; width: 100%; height: 100%; object-fit: contain; display:block; }
  .body { padding: 12px 14px 14px; display:flex; flex-direction: column; gap: 10px; }
  .title { font-size: 14px; line-height: 1.35; }
  .meta { display:flex; gap:8px; align-items:center; color: var(--muted); font-size: 12px; }
  .badge { background: #0e1a33; color: #9ec1ff; padding: 2px 8px; border-radius: 999px; font-weight: 600; letter-spacing: 0.3px; border: 1px solid #24365a; }
  details.gallery { border-top: 1px solid var(--border); padding: 12px 14px; }
  details.gallery summary { cursor: pointer; color: var(--muted); outline: none; }
  .thumbs { margin-top: 10px; display:grid; grid-template-columns: repeat(auto-fill, minmax(80px, 1fr)); gap: 8px; }
  .thumbs img { width: 100%; height: 72px; object-fit: cover; border-radius: 8px; border: 1px solid var(--border); cursor: pointer; }
  audio { width: 100%; margin-top: 10px; }
  footer { color: var(--muted); font-size: 12px; text-align: center; padding: 24px; }

  /* Lightbox overlay (not fullscreen API) */
  .lightbox {
    position: fixed; inset: 0; z-index: 9999;
    background: rgba(0,0,0,0.8);
    display: flex; align-items: center; justify-content: center;
    padding: 24px;
  }
  .lightbox-content {
    position: relative;
    max-width: 90vw; max-height: 90vh;
    width: min(1200px, 90vw);
    border-radius: 12px; overflow: hidden;
    box-shadow: 0 10px 40px rgba(0,0,0,0.6), 0 0 0 1px rgba(255,255,255,0.08) inset;
    background: #0b0b0c;
  }
  .lightbox video, .lightbox-img {
    width: 100%; max-height: 80vh; object-fit: contain; display: block; background:#0b0b0c;
  }
  .lightbox-audio {
    width: 100%; display:block; background:#0b0b0c; padding: 8px 8px 12px;
  }
  .lightbox-hint {
    position: absolute; bottom: 8px; left: 0; right: 0; text-align: center;
    color: #cbd5e1; font-size: 12px; pointer-events: none; padding-bottom: 2px;
  }
  .lightbox-count {
    position: absolute; top: 8px; left: 0; right: 0; text-align: center;
    color: #e8eaed; font-size: 13px; font-weight: 600; text-shadow: 0 1px 2px rgba(0,0,0,0.6);
    pointer-events: none; padding-top: 4px;
  }
  .nav-btn {
    position: absolute; top: 50%; transform: translateY(-50%);
    background: rgba(0,0,0,0.45); border: 1px solid rgba(255,255,255,0.2);
    color: #fff; width: 44px; height: 64px; border-radius: 10px;
    display:flex; align-items:center; justify-content:center; cursor: pointer;
    font-size: 22px; user-select:none;
  }
  .nav-btn:hover { background: rgba(0,0,0,0.6); }
  .nav-prev { left: 8px; }
  .nav-next { right: 8px; }
</style>
</head>
<body>
<header>
  <div class="wrap">
    <h1>TikTok Archive</h1>
    <div class="muted">%COUNT% item(s) • folder: <code>collection/</code></div>
    <div class="filters">
      <div class="chip active" data-filter="all">All</div>
      <div class="chip" data-filter="video">Videos</div>
      <div class="chip" data-filter="slideshow">Slideshows</div>
    </div>
  </div>
</header>

<main>
  <div class="grid" id="grid">
    <!-- BEGIN GRID -->
%GRID%
    <!-- END GRID -->
  </div>
</main>

<footer>
  Generated by <code>build_archive</code>. Click a video or slideshow to enlarge. Use ←/→ to navigate, and Esc or click outside to close.
</footer>

<script>
  // Filtering
  const chips = document.querySelectorAll('.chip');
  function applyFilter(kind) {
    const cards = document.querySelectorAll('.card');
    cards.forEach(card => {
      const t = card.dataset.type;
      card.style.display = (kind === 'all' || kind === t) ? '' : 'none';
    });
  }
  chips.forEach(ch => {
    ch.addEventListener('click', () => {
      chips.forEach(c => c.classList.remove('active'));
      ch.classList.add('active');
      applyFilter(ch.dataset.filter);
    });
  });

  // ---------------- Lightbox for VIDEO ----------------
  function openVideoLightbox(src) {
    const overlay = document.createElement('div');
    overlay.className = 'lightbox';
    overlay.innerHTML = `
      <div class="lightbox-content">
        <video src="${src}" controls autoplay playsinline></video>
        <div class="lightbox-hint">Click outside or press ESC to close</div>
      </div>
    `;
    function close() {
      const vid = overlay.querySelector('video');
      if (vid) try { vid.pause(); } catch (e) {}
      document.removeEventListener('keydown', onKey);
      document.body.style.overflow = '';
      overlay.remove();
    }
    function onKey(e) {
      if (e.key === 'Escape') close();
    }
    overlay.addEventListener('click', (e) => {
      if (e.target === overlay) close();
    });
    document.addEventListener('keydown', onKey);
    document.body.style.overflow = 'hidden';
    document.body.appendChild(overlay);
  }

  document.querySelectorAll('.media[data-lightbox-src]').forEach(el => {
    el.addEventListener('click', () => openVideoLightbox(el.dataset.lightboxSrc));
  });

  // ---------------- Lightbox for SLIDESHOW ----------------
  function openImageLightbox(images, startIdx = 0, audioSrc = null) {
    let idx = Math.max(0, Math.min(startIdx, images.length - 1));
    const overlay = document.createElement('div');
    overlay.className = 'lightbox';

    const audioHTML = audioSrc ? `<audio class="lightbox-audio" controls src="${audioSrc}" autoplay></audio>` : '';

    overlay.innerHTML = `
      <div class="lightbox-content" role="dialog" aria-modal="true">
        <button class="nav-btn nav-prev" aria-label="Previous">⟨</button>
        <div class="lightbox-count"></div>
        <img class="lightbox-img" alt="">
        <button class="nav-btn nav-next" aria-label="Next">⟩</button>
        ${audioHTML}
        <div class="lightbox-hint">Use ← / → to navigate • Click outside or press ESC to close</div>
      </div>
    `;

    const imgEl = overlay.querySelector('.lightbox-img');
    const prevBtn = overlay.querySelector('.nav-prev');
    const nextBtn = overlay.querySelector('.nav-next');
    const countEl = overlay.querySelector('.lightbox-count');

    function show(i) {
      idx = i;
      imgEl.src = images[idx];
      prevBtn.style.visibility = (idx > 0) ? 'visible' : 'hidden';
      nextBtn.style.visibility = (idx < images.length - 1) ? 'visible' : 'hidden';
      if (countEl) countEl.textContent = `${idx+1} of ${images.length}`;
    }

    function close() {
      document.removeEventListener('keydown', onKey);
      document.body.style.overflow = '';
      overlay.remove();
    }

    function onKey(e) {
      if (e.key === 'Escape') close();
      else if (e.key === 'ArrowLeft' && idx > 0) show(idx - 1);
      else if (e.key === 'ArrowRight' && idx < images.length - 1) show(idx + 1);
    }

    prevBtn.addEventListener('click', (e) => { e.stopPropagation(); if (idx > 0) show(idx - 1); });
    nextBtn.addEventListener('click', (e) => { e.stopPropagation(); if (idx < images.length - 1) show(idx + 1); });

    // Basic swipe support
    let touchX = null;
    imgEl.addEventListener('touchstart', (e) => { touchX = e.changedTouches[0].clientX; });
    imgEl.addEventListener('touchend', (e) => {
      if (touchX === null) return;
      const dx = e.changedTouches[0].clientX - touchX;
      if (dx > 40 && idx > 0) show(idx - 1);
      if (dx < -40 && idx < images.length - 1) show(idx + 1);
      touchX = null;
    });

    overlay.addEventListener('click', (e) => {
      if (e.target === overlay) close();
    });

    document.addEventListener('keydown', onKey);
    document.body.style.overflow = 'hidden';
    document.body.appendChild(overlay);
    show(idx);
  }

  // Click cover image on slideshow
  document.querySelectorAll('.card[data-type="slideshow"] .media').forEach(media => {
    media.addEventListener('click', (e) => {
      const card = media.closest('.card[data-type="slideshow"]');
      if (!card) return;
      const images = JSON.parse((card.dataset.images || '[]').replaceAll('&quot;', '"'));
      const audio = card.dataset.audio || null;
      let startIdx = 0;
      const img = e.target.closest('img[data-idx]');
      if (img) {
        const n = parseInt(img.dataset.idx, 10);
        if (!Number.isNaN(n)) startIdx = n;
      }
      if (images.length) openImageLightbox(images, startIdx, audio);
    });
  });

  // Click any thumbnail to open at that index
  document.querySelectorAll('.card[data-type="slideshow"] .thumbs img[data-idx]').forEach(thumb => {
    thumb.addEventListener('click', (e) => {
      const card = thumb.closest('.card[data-type="slideshow"]');
      if (!card) return;
      const images = JSON.parse((card.dataset.images || '[]').replaceAll('&quot;', '"'));
      const audio = card.dataset.audio || null;
      const startIdx = parseInt(thumb.dataset.idx, 10) || 0;
      if (images.length) openImageLightbox(images, startIdx, audio);
    });
  });
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> ArchiveConfig {
        let mut config = ArchiveConfig::default();
        config.paths.ledger = dir.join("downloads.csv");
        config.paths.collection = dir.join("collection");
        config.paths.output = dir.join("archive.html");
        config
    }

    fn seed_slideshow(config: &ArchiveConfig) {
        let dir = config.paths.collection.join("1. Beach day");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("1.jpg"), b"x").unwrap();
        fs::write(dir.join("2.jpg"), b"x").unwrap();
        fs::write(dir.join("sound.m4a"), b"x").unwrap();
    }

    #[test]
    fn href_encoding_keeps_segments_separate() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let asset = config.paths.collection.join("2. caffè & co/1.jpg");
        let href = asset_href(&config, &asset).unwrap();
        assert_eq!(href, "collection/2.%20caff%C3%A8%20%26%20co/1.jpg");
    }

    #[test]
    fn slideshow_card_carries_images_audio_and_escaped_title() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        seed_slideshow(&config);
        fs::write(
            &config.paths.ledger,
            "Index,Title,URL\n1,Beach <day> \"fun\",https://x/1\n",
        )
        .unwrap();

        let items = build_items(&config).unwrap();
        assert_eq!(items.len(), 1);
        let card = render_item_card(&items[0]);
        assert!(card.contains("data-type=\"slideshow\""));
        assert!(card.contains("2 photo(s) • audio"));
        assert!(card.contains("Beach &lt;day&gt; &quot;fun&quot;"));
        assert!(card.contains("collection/1.%20Beach%20day/sound.m4a"));
    }

    #[test]
    fn slideshow_title_falls_back_to_folder_name() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        seed_slideshow(&config);

        let items = build_items(&config).unwrap();
        assert_eq!(items[0].title, "Beach day");
    }

    #[cfg(unix)]
    #[test]
    fn video_thumbnail_is_generated_once_and_cached() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(&config.paths.collection).unwrap();
        fs::write(config.paths.collection.join("2. clip.mp4"), b"v").unwrap();

        // ffmpeg stand-in writes its output (the last argument).
        let ffmpeg = crate::exec::write_stub_script(
            dir.path(),
            "ffmpeg",
            r#"
for out in "$@"; do :; done
printf jpeg > "$out"
"#
            .trim(),
        );
        let _guard = crate::exec::set_stubs(None, None, Some(ffmpeg));

        let items = build_items(&config).unwrap();
        assert_eq!(items.len(), 1);
        let thumb = config.paths.collection.join("thumbnails/2.jpg");
        assert!(thumb.is_file());
        match &items[0].media {
            ItemMedia::Video { thumbnail, .. } => {
                assert_eq!(
                    thumbnail.as_deref(),
                    Some("collection/thumbnails/2.jpg")
                );
            }
            ItemMedia::Slideshow { .. } => panic!("expected a video item"),
        }

        // Second build reuses the cached thumbnail even with no tool at all.
        drop(_guard);
        let missing = crate::exec::set_stubs(None, None, Some(PathBuf::from("/nonexistent")));
        let again = build_items(&config).unwrap();
        drop(missing);
        assert_eq!(again.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn failed_thumbnail_degrades_to_inline_video() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(&config.paths.collection).unwrap();
        fs::write(config.paths.collection.join("3.mp4"), b"v").unwrap();

        let ffmpeg = crate::exec::write_stub_script(dir.path(), "ffmpeg", "exit 1");
        let _guard = crate::exec::set_stubs(None, None, Some(ffmpeg));

        let items = build_items(&config).unwrap();
        let card = render_item_card(&items[0]);
        assert!(card.contains("<video src=\"collection/3.mp4\""));
    }

    #[test]
    fn write_then_rewrite_is_byte_idempotent() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        seed_slideshow(&config);

        let items = build_items(&config).unwrap();
        write_archive(&config, &items).unwrap();
        let first = fs::read(&config.paths.output).unwrap();
        assert!(
            String::from_utf8_lossy(&first).contains("1 item(s)")
        );

        write_archive(&config, &items).unwrap();
        let second = fs::read(&config.paths.output).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn patching_preserves_edits_outside_the_grid() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        seed_slideshow(&config);

        let items = build_items(&config).unwrap();
        write_archive(&config, &items).unwrap();

        // Hand-edit outside the grid.
        let html = fs::read_to_string(&config.paths.output).unwrap();
        let edited = html.replace("<title>TikTok Archive</title>", "<title>My Archive</title>");
        fs::write(&config.paths.output, edited).unwrap();

        write_archive(&config, &items).unwrap();
        let updated = fs::read_to_string(&config.paths.output).unwrap();
        assert!(updated.contains("<title>My Archive</title>"));
        assert!(updated.contains(GRID_BEGIN));
    }

    #[test]
    fn missing_markers_force_full_rewrite() {
        assert!(update_existing_html("<html>no markers</html>", "grid", 1).is_none());
        let patched =
            update_existing_html(
                "<p>5 item(s)</p>\n<!-- BEGIN GRID -->old<!-- END GRID -->\n",
                "new",
                2,
            )
            .unwrap();
        assert!(patched.contains("2 item(s)"));
        assert!(patched.contains("<!-- BEGIN GRID -->\nnew\n    <!-- END GRID -->"));
    }
}
