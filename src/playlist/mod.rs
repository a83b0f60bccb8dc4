//! Playlist module
//!
//! This module handles the HLS master playlist:
//! - Synthesis of a multi-track master playlist (master.m3u8)
//! - Parsing of attribute lists, renditions and variants
//! - Rewriting existing master playlists and media playlist locators
//! - Resolving rendition URIs against a base locator

pub mod locator;
pub mod master;
pub mod parse;
pub mod rewrite;
pub mod variant;

pub use master::PlaylistSynthesizer;
pub use parse::{parse_master_playlist, ParsedMaster, Rendition};
pub use rewrite::{enhance_master_playlist, master_locator_for};
pub use variant::{IFrameVariant, VariantLadder, VideoVariant};

/// Group id of audio renditions in synthesized playlists
pub const AUDIO_GROUP_ID: &str = "audio";

/// Group id of subtitle renditions in synthesized playlists
pub const SUBTITLE_GROUP_ID: &str = "subtitles";

/// MIME type of HLS playlists
pub const PLAYLIST_MIME_TYPE: &str = "application/vnd.apple.mpegurl";
