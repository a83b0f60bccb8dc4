//! Master playlist parsing
//!
//! Reads the parts of a master playlist the negotiator cares about: the
//! alternative renditions (`#EXT-X-MEDIA`) and the video variant ladder.

use std::fmt;

use super::variant::{IFrameVariant, VariantLadder, VideoVariant};
use crate::catalog::language::display_name;
use crate::catalog::{TrackInput, TrackInputs};
use crate::error::{Error, Result};

/// One `KEY=value` pair of an attribute list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    pub quoted: bool,
}

/// Ordered attribute list, printed back the way it was read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList(Vec<Attribute>);

impl AttributeList {
    pub fn parse(text: &str) -> Self {
        let mut attrs = Vec::new();
        let mut rest = text.trim();

        while !rest.is_empty() {
            let Some(eq) = rest.find('=') else {
                break;
            };
            let key = rest[..eq].trim();
            let after = &rest[eq + 1..];

            let (value, quoted, remaining) = match after.strip_prefix('"') {
                Some(stripped) => match stripped.find('"') {
                    Some(end) => (&stripped[..end], true, &stripped[end + 1..]),
                    None => (stripped, true, ""),
                },
                None => match after.find(',') {
                    Some(end) => (&after[..end], false, &after[end..]),
                    None => (after, false, ""),
                },
            };

            if !key.is_empty() {
                attrs.push(Attribute {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                    quoted,
                });
            }

            rest = remaining.trim_start_matches(',').trim_start();
        }

        Self(attrs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.key.eq_ignore_ascii_case(key))
            .map(|a| a.value.as_str())
    }

    /// `KEY=YES`
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("YES"))
            .unwrap_or(false)
    }

    /// Copy without the given keys
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|a| !keys.iter().any(|k| a.key.eq_ignore_ascii_case(k)))
                .cloned()
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if attr.quoted {
                write!(f, "{}=\"{}\"", attr.key, attr.value)?;
            } else {
                write!(f, "{}={}", attr.key, attr.value)?;
            }
        }
        Ok(())
    }
}

/// `TYPE` of an `#EXT-X-MEDIA` rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Subtitles,
    ClosedCaptions,
    Video,
}

impl MediaType {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "AUDIO" => Some(MediaType::Audio),
            "SUBTITLES" => Some(MediaType::Subtitles),
            "CLOSED-CAPTIONS" => Some(MediaType::ClosedCaptions),
            "VIDEO" => Some(MediaType::Video),
            _ => None,
        }
    }
}

/// An alternative rendition advertised by a master playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub media_type: MediaType,
    pub group_id: String,
    pub name: Option<String>,
    pub language: Option<String>,
    pub default: bool,
    pub autoselect: bool,
    pub uri: Option<String>,
}

impl Rendition {
    fn from_attributes(attrs: &AttributeList) -> Option<Self> {
        Some(Self {
            media_type: MediaType::parse(attrs.get("TYPE")?)?,
            group_id: attrs.get("GROUP-ID").unwrap_or_default().to_string(),
            name: attrs.get("NAME").map(str::to_string),
            language: attrs.get("LANGUAGE").map(str::to_string),
            default: attrs.flag("DEFAULT"),
            autoselect: attrs.flag("AUTOSELECT"),
            uri: attrs.get("URI").map(str::to_string),
        })
    }
}

/// Result of parsing a master playlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMaster {
    pub version: Option<u32>,
    pub renditions: Vec<Rendition>,
    pub ladder: VariantLadder,
}

impl ParsedMaster {
    pub fn renditions_of(&self, media_type: MediaType) -> impl Iterator<Item = &Rendition> {
        self.renditions
            .iter()
            .filter(move |r| r.media_type == media_type)
    }
}

/// Parse a master playlist.
///
/// Fails only when the `#EXTM3U` tag is missing; unknown tags are ignored.
pub fn parse_master_playlist(text: &str) -> Result<ParsedMaster> {
    if !text.lines().any(|l| l.trim() == "#EXTM3U") {
        return Err(Error::Playlist("missing #EXTM3U header".to_string()));
    }

    let mut parsed = ParsedMaster::default();
    let mut pending_variant: Option<String> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if let Some(version) = line.strip_prefix("#EXT-X-VERSION:") {
            parsed.version = version.trim().parse().ok();
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-MEDIA:") {
            if let Some(rendition) = Rendition::from_attributes(&AttributeList::parse(attrs)) {
                parsed.renditions.push(rendition);
            }
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            let attrs = AttributeList::parse(attrs).without(&["AUDIO", "SUBTITLES"]);
            pending_variant = Some(attrs.to_string());
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-I-FRAME-STREAM-INF:") {
            let attrs = AttributeList::parse(attrs);
            if let Some(uri) = attrs.get("URI") {
                parsed.ladder.iframe_variants.push(IFrameVariant {
                    attributes: attrs.without(&["URI"]).to_string(),
                    uri: uri.to_string(),
                });
            }
        } else if !line.starts_with('#') {
            if let Some(attributes) = pending_variant.take() {
                parsed.ladder.variants.push(VideoVariant {
                    attributes,
                    uri: line.to_string(),
                });
            }
        }
    }

    Ok(parsed)
}

/// Track inputs for the renditions that carry their own locator.
///
/// Renditions without `NAME` get a label derived from their language.
pub fn adaptive_inputs(renditions: &[Rendition]) -> TrackInputs {
    let mut inputs = TrackInputs::default();

    for rendition in renditions {
        let Some(uri) = &rendition.uri else {
            continue;
        };
        let language = rendition.language.clone().unwrap_or_default();

        let (target, fallback) = match rendition.media_type {
            MediaType::Audio => (&mut inputs.audio, "Audio Track"),
            MediaType::Subtitles => (&mut inputs.subtitles, "Subtitle"),
            _ => continue,
        };

        let label = match rendition.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => display_name(&language, None, fallback),
        };

        target.push(TrackInput {
            src: Some(uri.clone()),
            srclang: Some(language),
            label: Some(label),
        });
    }

    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-VERSION:4

#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio",NAME="English",LANGUAGE="en",DEFAULT=YES,AUTOSELECT=YES,URI="audio_0.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio",LANGUAGE="spa",AUTOSELECT=NO,URI="audio_1.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subtitles",NAME="English",LANGUAGE="en",AUTOSELECT=NO,URI="subtitle_0.vtt"
#EXT-X-MEDIA:TYPE=CLOSED-CAPTIONS,GROUP-ID="cc",NAME="CC1",INSTREAM-ID="CC1"

# Media Playlists
#EXT-X-STREAM-INF:AVERAGE-BANDWIDTH=1617234,BANDWIDTH=1908359,CODECS="avc1.4D402A,mp4a.40.2",RESOLUTION=852x480,AUDIO="audio",SUBTITLES="subtitles"
media-1/stream.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=4093930,RESOLUTION=1280x720
media-2/stream.m3u8

#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=221618,CODECS="avc1.4D402A",RESOLUTION=852x480,URI="media-1/iframes.m3u8"
"#;

    #[test]
    fn test_attribute_list_parse_and_print() {
        let attrs = AttributeList::parse(
            r#"BANDWIDTH=1908359,CODECS="avc1.4D402A,mp4a.40.2",RESOLUTION=852x480"#,
        );
        assert_eq!(attrs.get("BANDWIDTH"), Some("1908359"));
        assert_eq!(attrs.get("codecs"), Some("avc1.4D402A,mp4a.40.2"));
        assert_eq!(attrs.get("RESOLUTION"), Some("852x480"));
        assert_eq!(
            attrs.to_string(),
            r#"BANDWIDTH=1908359,CODECS="avc1.4D402A,mp4a.40.2",RESOLUTION=852x480"#
        );
    }

    #[test]
    fn test_attribute_list_without() {
        let attrs = AttributeList::parse(r#"BANDWIDTH=1,AUDIO="audio",SUBTITLES="subs""#);
        assert_eq!(attrs.without(&["AUDIO", "SUBTITLES"]).to_string(), "BANDWIDTH=1");
    }

    #[test]
    fn test_parse_master_playlist() {
        let parsed = parse_master_playlist(MASTER).unwrap();

        assert_eq!(parsed.version, Some(4));
        assert_eq!(parsed.renditions.len(), 4);
        assert_eq!(parsed.renditions_of(MediaType::Audio).count(), 2);

        let english = &parsed.renditions[0];
        assert!(english.default);
        assert!(english.autoselect);
        assert_eq!(english.uri.as_deref(), Some("audio_0.m3u8"));

        assert_eq!(parsed.ladder.variants.len(), 2);
        assert_eq!(parsed.ladder.variants[0].uri, "media-1/stream.m3u8");
        assert!(!parsed.ladder.variants[0].attributes.contains("AUDIO="));
        assert!(parsed.ladder.variants[0]
            .attributes
            .contains(r#"CODECS="avc1.4D402A,mp4a.40.2""#));

        assert_eq!(parsed.ladder.iframe_variants.len(), 1);
        assert_eq!(parsed.ladder.iframe_variants[0].uri, "media-1/iframes.m3u8");
        assert!(!parsed.ladder.iframe_variants[0].attributes.contains("URI="));
    }

    #[test]
    fn test_parse_requires_header() {
        assert!(parse_master_playlist("#EXT-X-VERSION:4\n").is_err());
    }

    #[test]
    fn test_adaptive_inputs_from_renditions() {
        let parsed = parse_master_playlist(MASTER).unwrap();
        let inputs = adaptive_inputs(&parsed.renditions);

        assert_eq!(inputs.audio.len(), 2);
        assert_eq!(inputs.subtitles.len(), 1);
        assert_eq!(inputs.audio[0].label.as_deref(), Some("English"));
        // no NAME, label comes from the language
        assert_eq!(inputs.audio[1].label.as_deref(), Some("Spanish"));
        assert_eq!(inputs.audio[1].srclang.as_deref(), Some("spa"));
    }
}
