#![forbid(unsafe_code)]

//! Filename sanitization. Titles come straight from post metadata and can
//! contain anything; these helpers turn them into path components that are
//! safe on the most restrictive common filesystem (Windows rules), keeping
//! emojis and hashtags readable. Lengths are counted in characters, not
//! bytes, mirroring how the component limit was originally tuned.

use crate::config::FilenameRules;
use unicode_normalization::UnicodeNormalization;

/// Normalizes a raw title into a safe single path component: NFKC fold, drop
/// control characters (newlines and tabs become spaces), replace forbidden
/// characters with `_`, collapse whitespace runs, and guard reserved device
/// names by appending `_`. An optional character cap trims the tail without
/// leaving a trailing dot or space.
pub fn sanitize_component(rules: &FilenameRules, raw: &str, max_len: Option<usize>) -> String {
    let mut kept = String::with_capacity(raw.len());
    for ch in raw.nfkc() {
        if ch.is_control() {
            if matches!(ch, '\r' | '\n' | '\t') {
                kept.push(' ');
            }
            continue;
        }
        if rules.is_forbidden(ch) {
            kept.push('_');
        } else {
            kept.push(ch);
        }
    }

    let mut out = String::with_capacity(kept.len());
    let mut last_was_space = false;
    for ch in kept.trim().chars() {
        if ch == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }

    let leading_stem = out.split('.').next().unwrap_or("");
    if rules.is_reserved(leading_stem) {
        out.push('_');
    }

    if let Some(limit) = max_len
        && char_len(&out) > limit
    {
        out = truncate_chars(&out, limit);
        out = strip_trailing_dot_space(&out);
    }
    out
}

/// Composes `"{prefix}. {title}"` (bare prefix when the title is empty) and
/// trims it so the final component, including a reserved extension length,
/// stays within the configured limit. The title is always shortened before
/// the numeric prefix is ever touched, and the result never ends in a dot or
/// space.
pub fn trim_fs_component(
    rules: &FilenameRules,
    prefix: &str,
    title: &str,
    reserve_ext: usize,
) -> String {
    let stem = if title.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}. {title}")
    };
    let max_stem = rules.component_limit.saturating_sub(reserve_ext).max(1);
    if char_len(&stem) <= max_stem {
        return strip_trailing_dot_space(&stem);
    }

    if !title.is_empty() {
        let prefix_overhead = char_len(prefix) + 2;
        if max_stem < prefix_overhead {
            // Degenerate: even `"{prefix}. "` does not fit.
            return strip_trailing_dot_space(&truncate_chars(prefix, max_stem));
        }
        let room_for_title = max_stem - prefix_overhead;
        let trimmed_title = strip_trailing_dot_space(&truncate_chars(title, room_for_title));
        return strip_trailing_dot_space(&format!("{prefix}. {trimmed_title}"));
    }

    strip_trailing_dot_space(&truncate_chars(prefix, max_stem))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn strip_trailing_dot_space(s: &str) -> String {
    s.trim_end_matches(['.', ' ']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> FilenameRules {
        FilenameRules::default()
    }

    #[test]
    fn forbidden_characters_become_underscores() {
        let out = sanitize_component(&rules(), "a<b>c:d\"e/f\\g|h?i*j", None);
        assert_eq!(out, "a_b_c_d_e_f_g_h_i_j");
        for ch in "<>:\"/\\|?*".chars() {
            assert!(!out.contains(ch));
        }
    }

    #[test]
    fn control_characters_are_dropped_and_whitespace_collapsed() {
        let out = sanitize_component(&rules(), "  one\r\ntwo\tthree   four  ", None);
        assert_eq!(out, "one two three four");
    }

    #[test]
    fn keeps_emojis_and_hashtags() {
        let out = sanitize_component(&rules(), "dance 💃 #fyp #viral", None);
        assert_eq!(out, "dance 💃 #fyp #viral");
    }

    #[test]
    fn reserved_device_name_gets_marker() {
        assert_eq!(sanitize_component(&rules(), "CON", None), "CON_");
        assert_eq!(sanitize_component(&rules(), "con.mp4", None), "con.mp4_");
        assert_eq!(sanitize_component(&rules(), "Console", None), "Console");
    }

    #[test]
    fn entirely_forbidden_input_collapses_to_underscores() {
        assert_eq!(sanitize_component(&rules(), "???", None), "___");
    }

    #[test]
    fn cap_strips_trailing_dot_and_space() {
        let out = sanitize_component(&rules(), "abcde. fgh", Some(6));
        assert_eq!(out, "abcde");
    }

    #[test]
    fn trim_keeps_short_components_untouched() {
        assert_eq!(trim_fs_component(&rules(), "7", "My Clip", 4), "7. My Clip");
        assert_eq!(trim_fs_component(&rules(), "7", "", 4), "7");
    }

    #[test]
    fn trim_never_exceeds_limit() {
        let long = "x".repeat(500);
        for reserve in [0usize, 5] {
            let out = trim_fs_component(&rules(), "123", &long, reserve);
            assert!(out.chars().count() + reserve <= 199);
            assert!(out.starts_with("123. "));
        }
    }

    #[test]
    fn trim_preserves_prefix_when_title_shrinks() {
        let mut tight = rules();
        tight.component_limit = 10;
        let out = trim_fs_component(&tight, "42", "a very long title", 0);
        assert!(out.starts_with("42. "));
        assert!(out.chars().count() <= 10);
    }

    #[test]
    fn trim_counts_characters_not_bytes() {
        let mut tight = rules();
        tight.component_limit = 8;
        let out = trim_fs_component(&tight, "1", "éééééééééé", 0);
        assert_eq!(out.chars().count(), 8);
        assert_eq!(out, "1. ééééé");
    }

    #[test]
    fn trim_never_ends_with_dot_or_space() {
        let mut tight = rules();
        tight.component_limit = 7;
        let out = trim_fs_component(&tight, "9", "abc. def", 0);
        assert!(!out.ends_with('.') && !out.ends_with(' '));
    }

    #[test]
    fn trim_degenerate_prefix_is_truncated() {
        let mut tiny = rules();
        tiny.component_limit = 3;
        let out = trim_fs_component(&tiny, "123456", "title", 0);
        assert_eq!(out, "123");
    }
}
