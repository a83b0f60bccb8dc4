//! Video variant ladder
//!
//! The video variants of a session are fixed: they are copied verbatim into
//! every synthesized master playlist.

use serde::{Deserialize, Serialize};

/// One `#EXT-X-STREAM-INF` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoVariant {
    /// Attribute list without the `AUDIO` / `SUBTITLES` group references
    pub attributes: String,
    /// Media playlist locator, relative to the master playlist
    pub uri: String,
}

/// One `#EXT-X-I-FRAME-STREAM-INF` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IFrameVariant {
    /// Attribute list without `URI`
    pub attributes: String,
    /// I-frame playlist locator, relative to the master playlist
    pub uri: String,
}

/// Video variants known to a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantLadder {
    pub variants: Vec<VideoVariant>,
    pub iframe_variants: Vec<IFrameVariant>,
}

impl VariantLadder {
    pub fn new(variants: Vec<VideoVariant>, iframe_variants: Vec<IFrameVariant>) -> Self {
        Self {
            variants,
            iframe_variants,
        }
    }

    /// Two-rung 480p/720p ladder as produced by the segmenter
    /// (`media-N/stream.m3u8` layout)
    pub fn two_rung() -> Self {
        Self {
            variants: vec![
                VideoVariant {
                    attributes: "AVERAGE-BANDWIDTH=1617234,BANDWIDTH=1908359,CODECS=\"avc1.4D402A,mp4a.40.2\",RESOLUTION=852x480".to_string(),
                    uri: "media-1/stream.m3u8".to_string(),
                },
                VideoVariant {
                    attributes: "AVERAGE-BANDWIDTH=3156724,BANDWIDTH=4093930,CODECS=\"avc1.4D402A,mp4a.40.2\",RESOLUTION=1280x720".to_string(),
                    uri: "media-2/stream.m3u8".to_string(),
                },
            ],
            iframe_variants: vec![
                IFrameVariant {
                    attributes: "AVERAGE-BANDWIDTH=131418,BANDWIDTH=221618,CODECS=\"avc1.4D402A\",RESOLUTION=852x480".to_string(),
                    uri: "media-1/iframes.m3u8".to_string(),
                },
                IFrameVariant {
                    attributes: "AVERAGE-BANDWIDTH=250643,BANDWIDTH=533386,CODECS=\"avc1.4D402A\",RESOLUTION=1280x720".to_string(),
                    uri: "media-2/iframes.m3u8".to_string(),
                },
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
