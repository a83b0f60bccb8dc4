//! Track catalog
//!
//! Merges manually supplied track metadata with tracks discovered from the
//! adaptive stream. The catalog is built once per session and never mutated.

use serde::Serialize;
use std::collections::HashSet;

use super::language::same_language;
use super::{TrackDescriptor, TrackInput, TrackInputs, TrackKind, TrackOrigin};

/// Immutable catalog of the audio and subtitle tracks of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackCatalog {
    audio: Vec<TrackDescriptor>,
    subtitles: Vec<TrackDescriptor>,
}

impl TrackCatalog {
    /// Build a catalog from manual and adaptive-discovered inputs.
    ///
    /// Tracks with the same `(label, language)` are merged; the first one
    /// wins, and manual inputs are visited before adaptive ones. Incomplete
    /// records are skipped. A kind without tracks yields an empty list.
    pub fn load(manual: &TrackInputs, adaptive: &TrackInputs) -> Self {
        let merge = |kind| merge_kind(kind, manual.of_kind(kind), adaptive.of_kind(kind));
        let catalog = Self {
            audio: merge(TrackKind::Audio),
            subtitles: merge(TrackKind::Subtitle),
        };

        tracing::debug!(
            audio = catalog.audio.len(),
            subtitles = catalog.subtitles.len(),
            "track catalog loaded"
        );

        catalog
    }

    /// Catalog of manual inputs only
    pub fn from_manual(manual: &TrackInputs) -> Self {
        Self::load(manual, &TrackInputs::default())
    }

    pub fn tracks(&self, kind: TrackKind) -> &[TrackDescriptor] {
        match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Subtitle => &self.subtitles,
        }
    }

    pub fn audio(&self) -> &[TrackDescriptor] {
        &self.audio
    }

    pub fn subtitles(&self) -> &[TrackDescriptor] {
        &self.subtitles
    }

    pub fn get(&self, kind: TrackKind, index: usize) -> Option<&TrackDescriptor> {
        self.tracks(kind).get(index)
    }

    pub fn len(&self, kind: TrackKind) -> usize {
        self.tracks(kind).len()
    }

    pub fn is_empty(&self, kind: TrackKind) -> bool {
        self.tracks(kind).is_empty()
    }

    /// First track of `kind` whose language matches (2- and 3-letter codes
    /// of one language are equal)
    pub fn find_by_language(&self, kind: TrackKind, language: &str) -> Option<&TrackDescriptor> {
        self.tracks(kind)
            .iter()
            .find(|t| same_language(&t.language, language))
    }
}

fn merge_kind(kind: TrackKind, manual: &[TrackInput], adaptive: &[TrackInput]) -> Vec<TrackDescriptor> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut tracks = Vec::with_capacity(manual.len() + adaptive.len());

    let tagged = manual
        .iter()
        .map(|t| (t, TrackOrigin::Manual))
        .chain(adaptive.iter().map(|t| (t, TrackOrigin::AdaptiveGenerated)));

    for (input, origin) in tagged {
        let Some((src, srclang, label)) = input.fields() else {
            tracing::trace!(?input, "skipping incomplete {} track", kind);
            continue;
        };

        let track = TrackDescriptor {
            kind,
            index: tracks.len(),
            label: label.to_string(),
            language: srclang.to_string(),
            source_locator: src.to_string(),
            origin,
        };

        let (label, language) = track.identity();
        if !seen.insert((label.to_string(), language.to_string())) {
            tracing::trace!(label, language, ?origin, "duplicate {} track", kind);
            continue;
        }

        tracks.push(track);
    }

    tracks
}
