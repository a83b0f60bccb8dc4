//! Master playlist rewriting
//!
//! Adds the session's renditions to a master playlist produced elsewhere,
//! and maps a media playlist locator to its sibling master playlist.

use super::locator::file_name;
use super::master::write_renditions;
use super::parse::AttributeList;
use super::{AUDIO_GROUP_ID, SUBTITLE_GROUP_ID};
use crate::catalog::TrackCatalog;
use crate::error::{Error, Result};

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Rewrite an existing master playlist so it advertises every track of
/// `catalog`.
///
/// Audio and subtitle `#EXT-X-MEDIA` lines already present are replaced,
/// the new ones are inserted after the header, and every
/// `#EXT-X-STREAM-INF` gets its `AUDIO` / `SUBTITLES` group references
/// set. Running it twice gives the same result.
pub fn enhance_master_playlist(
    existing: &str,
    catalog: &TrackCatalog,
    base_locator: &str,
    default_audio: Option<usize>,
) -> Result<String> {
    if !existing.lines().any(|l| l.trim() == "#EXTM3U") {
        return Err(Error::Playlist("missing #EXTM3U header".to_string()));
    }

    let has_version = existing
        .lines()
        .any(|l| l.trim().starts_with("#EXT-X-VERSION:"));
    let has_audio = !catalog.audio().is_empty();
    let has_subtitles = !catalog.subtitles().is_empty();

    let mut output = String::with_capacity(existing.len() + 256);
    let mut inserted = false;
    // blank lines following the rendition block are dropped so a second
    // pass does not add another one
    let mut skip_blank = false;

    for line in existing.lines().map(str::trim_end) {
        let trimmed = line.trim_start();

        if trimmed.is_empty() && skip_blank {
            continue;
        }

        if let Some(attrs) = trimmed.strip_prefix("#EXT-X-MEDIA:") {
            let attrs = AttributeList::parse(attrs);
            let replaced = matches!(
                attrs.get("TYPE").map(str::to_ascii_uppercase).as_deref(),
                Some("AUDIO") | Some("SUBTITLES")
            );
            if replaced {
                continue;
            }
        }
        skip_blank = false;

        if let Some(attrs) = trimmed.strip_prefix("#EXT-X-STREAM-INF:") {
            let mut attrs = AttributeList::parse(attrs)
                .without(&["AUDIO", "SUBTITLES"])
                .to_string();
            if has_audio {
                push_group(&mut attrs, "AUDIO", AUDIO_GROUP_ID);
            }
            if has_subtitles {
                push_group(&mut attrs, "SUBTITLES", SUBTITLE_GROUP_ID);
            }
            output.push_str(&format!("#EXT-X-STREAM-INF:{}\n", attrs));
            continue;
        }

        output.push_str(line);
        output.push('\n');

        let is_anchor = if has_version {
            trimmed.starts_with("#EXT-X-VERSION:")
        } else {
            trimmed == "#EXTM3U"
        };
        if is_anchor && !inserted {
            inserted = true;
            skip_blank = true;
            write_renditions(&mut output, catalog, base_locator, default_audio);
        }
    }

    Ok(output)
}

fn push_group(attrs: &mut String, key: &str, group: &str) {
    if !attrs.is_empty() {
        attrs.push(',');
    }
    attrs.push_str(&format!("{}=\"{}\"", key, group));
}

/// Locator of the master playlist next to a media playlist.
///
/// `…/media-1/stream.m3u8` and `…/audio_0.m3u8` both map to
/// `…/master.m3u8`. Returns `None` when `locator` already is a master
/// playlist or is not an HLS playlist at all.
pub fn master_locator_for(locator: &str) -> Option<String> {
    let locator = locator.trim();
    if file_name(locator).eq_ignore_ascii_case("master.m3u8") {
        return None;
    }

    let media_dir = regex!(r"/media-[^/?#]*/[^/?#]*\.m3u8(\?.*)?$");
    if media_dir.is_match(locator) {
        return Some(media_dir.replace(locator, "/master.m3u8").into_owned());
    }

    let playlist = regex!(r"/[^/?#]*\.m3u8(\?.*)?$");
    if playlist.is_match(locator) {
        return Some(playlist.replace(locator, "/master.m3u8").into_owned());
    }

    None
}
