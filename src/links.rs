#![forbid(unsafe_code)]

//! Link-list handling: parsing `links.txt`, structural classification of a
//! post URL as video or photo slideshow, and post-id extraction. Everything
//! here works on URL shape alone; no network calls.

use chrono::Utc;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostKind {
    Video,
    Photo,
}

impl PostKind {
    pub fn label(self) -> &'static str {
        match self {
            PostKind::Video => "video",
            PostKind::Photo => "photo",
        }
    }
}

static INDEXED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s*(https?://\S+)\s*$").expect("pattern compiles"));
static BARE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(https?://\S+)\s*$").expect("pattern compiles"));
static POST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{8,})/?$").expect("pattern compiles"));
static HREF_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("pattern compiles"));
static POST_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://www\.tiktok\.com/@[\w.\-]+/(?:video|photo)/\d+").expect("pattern compiles")
});

/// Reads a link list: one post per line, either a bare URL or
/// `"<index>. <url>"`. Index prefixes are ignored (the ledger owns index
/// assignment); blank and unrecognized lines are dropped, order is kept.
pub fn parse_input_lines(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for line in text.lines() {
        if let Some(caps) = INDEXED_LINE.captures(line) {
            urls.push(caps[2].to_string());
        } else if let Some(caps) = BARE_LINE.captures(line) {
            urls.push(caps[1].to_string());
        }
    }
    urls
}

/// A post is a photo slideshow iff its percent-decoded path is exactly
/// `/@user/photo/<digits>`. Anything else, including URLs with extra
/// trailing segments or that fail to parse, defaults to video.
pub fn classify(url: &str) -> PostKind {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return PostKind::Video;
    };
    let Some(raw_segments) = parsed.path_segments() else {
        return PostKind::Video;
    };
    let segments: Vec<String> = raw_segments
        .filter(|segment| !segment.is_empty())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect();
    if segments.len() != 3 {
        return PostKind::Video;
    }
    let (user, kind, post_id) = (&segments[0], &segments[1], &segments[2]);
    if user.starts_with('@')
        && kind == "photo"
        && !post_id.is_empty()
        && post_id.chars().all(|c| c.is_ascii_digit())
    {
        PostKind::Photo
    } else {
        PostKind::Video
    }
}

/// Extracts the post identifier: the trailing run of 8+ digits in the
/// pre-query path. Falls back to the current unix timestamp when absent;
/// the fallback only ever names a staging directory.
pub fn extract_post_id(url: &str) -> String {
    let base = url.split('?').next().unwrap_or(url);
    match POST_ID.captures(base) {
        Some(caps) => caps[1].to_string(),
        None => Utc::now().timestamp().to_string(),
    }
}

/// True iff the URL points at an individual post (video or slideshow) on the
/// platform, used to filter navigation/profile links out of harvested lists.
pub fn is_post_url(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return false;
    }
    let Ok(parsed) = Url::parse(trimmed) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if !host.to_ascii_lowercase().contains("tiktok.com") {
        return false;
    }
    let path = parsed.path().to_ascii_lowercase();
    path.contains("/video/") || path.contains("/photo/")
}

/// Pulls every post link out of a saved HTML page's anchor hrefs,
/// deduplicated, oldest first (pages list newest posts first, so the match
/// order is reversed).
pub fn extract_post_links(html: &str) -> Vec<String> {
    let hrefs: Vec<&str> = HREF_ATTR
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|href| POST_HREF.is_match(href))
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for href in hrefs.iter().rev() {
        if seen.insert(href.to_string()) {
            urls.push(href.to_string());
        }
    }
    urls
}
