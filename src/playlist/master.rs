//! Master playlist synthesizer
//!
//! Generates a master.m3u8 that advertises every audio and subtitle track
//! of a session next to its fixed video variant ladder.

use super::locator::resolve;
use super::variant::VariantLadder;
use super::{AUDIO_GROUP_ID, SUBTITLE_GROUP_ID};
use crate::catalog::{TrackCatalog, TrackDescriptor, TrackKind};
use crate::config::ManifestConfig;

/// Builds master playlists for one session
#[derive(Debug, Clone, Default)]
pub struct PlaylistSynthesizer {
    ladder: VariantLadder,
    config: ManifestConfig,
}

impl PlaylistSynthesizer {
    pub fn new(ladder: VariantLadder, config: ManifestConfig) -> Self {
        Self { ladder, config }
    }

    pub fn ladder(&self) -> &VariantLadder {
        &self.ladder
    }

    /// Generate the master playlist.
    ///
    /// The audio track at `default_audio` (or 0 when unset or out of range)
    /// is the single `DEFAULT=YES,AUTOSELECT=YES` rendition. The output only
    /// depends on the arguments.
    pub fn synthesize(
        &self,
        catalog: &TrackCatalog,
        base_locator: &str,
        default_audio: Option<usize>,
    ) -> String {
        let mut output = String::new();

        // Header
        output.push_str("#EXTM3U\n");
        output.push_str(&format!("#EXT-X-VERSION:{}\n", self.config.version));
        output.push('\n');

        write_renditions(&mut output, catalog, base_locator, default_audio);

        let has_audio = !catalog.audio().is_empty();
        let has_subtitles = !catalog.subtitles().is_empty();

        for variant in &self.ladder.variants {
            let mut attributes = variant.attributes.clone();
            if has_audio {
                push_attribute(&mut attributes, &format!("AUDIO=\"{}\"", AUDIO_GROUP_ID));
            }
            if has_subtitles {
                push_attribute(
                    &mut attributes,
                    &format!("SUBTITLES=\"{}\"", SUBTITLE_GROUP_ID),
                );
            }
            output.push_str(&format!("#EXT-X-STREAM-INF:{}\n", attributes));
            output.push_str(&variant.uri);
            output.push('\n');
        }

        if self.config.include_iframe_playlists && !self.ladder.iframe_variants.is_empty() {
            output.push('\n');
            for iframe in &self.ladder.iframe_variants {
                let mut attributes = iframe.attributes.clone();
                push_attribute(&mut attributes, &format!("URI=\"{}\"", iframe.uri));
                output.push_str(&format!("#EXT-X-I-FRAME-STREAM-INF:{}\n", attributes));
            }
        }

        output
    }
}

/// Index of the default audio rendition
pub(crate) fn default_audio_index(count: usize, requested: Option<usize>) -> usize {
    match requested {
        Some(index) if index < count => index,
        _ => 0,
    }
}

/// Append all `#EXT-X-MEDIA` lines for `catalog`, audio first
pub(crate) fn write_renditions(
    output: &mut String,
    catalog: &TrackCatalog,
    base_locator: &str,
    default_audio: Option<usize>,
) {
    let default_index = default_audio_index(catalog.audio().len(), default_audio);

    for track in catalog.audio() {
        output.push_str(&rendition_line(track, base_locator, track.index == default_index));
        output.push('\n');
    }

    if !catalog.subtitles().is_empty() {
        for track in catalog.subtitles() {
            output.push_str(&rendition_line(track, base_locator, false));
            output.push('\n');
        }
    }

    if !catalog.audio().is_empty() || !catalog.subtitles().is_empty() {
        output.push('\n');
    }
}

/// One `#EXT-X-MEDIA` line, without the trailing newline
pub(crate) fn rendition_line(track: &TrackDescriptor, base_locator: &str, default: bool) -> String {
    let (media_type, group_id) = match track.kind {
        TrackKind::Audio => ("AUDIO", AUDIO_GROUP_ID),
        TrackKind::Subtitle => ("SUBTITLES", SUBTITLE_GROUP_ID),
    };

    let mut line = format!(
        "#EXT-X-MEDIA:TYPE={},GROUP-ID=\"{}\",NAME=\"{}\"",
        media_type,
        group_id,
        quoted_value(&track.label)
    );
    if !track.language.is_empty() {
        line.push_str(&format!(",LANGUAGE=\"{}\"", quoted_value(&track.language)));
    }
    if default {
        line.push_str(",DEFAULT=YES,AUTOSELECT=YES");
    } else {
        line.push_str(",DEFAULT=NO,AUTOSELECT=NO");
    }
    line.push_str(&format!(
        ",URI=\"{}\"",
        quoted_value(&resolve(base_locator, &track.source_locator))
    ));
    line
}

/// Make a value safe inside a quoted attribute
fn quoted_value(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\r' | '\n' => ' ',
            c => c,
        })
        .collect()
}

fn push_attribute(attributes: &mut String, attribute: &str) {
    if !attributes.is_empty() {
        attributes.push(',');
    }
    attributes.push_str(attribute);
}
