//! Resolution negotiation
//!
//! Maps a requested constraint set onto one of the simulated device's
//! resolutions. Three tiers are tried in order: exact match, best fit by
//! score, orientation-aware fallback. The result depends only on the inputs.
//!
//! Device resolutions are stored landscape-native. A device held in
//! portrait still reports them that way but should hand the caller portrait
//! pixel dimensions, so landscape candidates are transposed when the
//! viewport is portrait.

use crate::constraints::MediaTrackConstraints;
use crate::device::{DevicePreset, VideoResolution};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Resolution returned when the device lists none
pub const FALLBACK_RESOLUTION: VideoResolution = VideoResolution::VGA;

/// Weight of the aspect-ratio term in best-fit scoring
const ASPECT_RATIO_WEIGHT: f64 = 2.0;

/// Viewport orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Portrait iff strictly taller than wide
    pub fn of(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn is_portrait(&self) -> bool {
        matches!(self, Orientation::Portrait)
    }
}

/// Target the caller asked for, after constraint normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionTarget {
    pub width: f64,
    pub height: f64,
    /// Explicit aspect ratio, if requested
    pub aspect_ratio: Option<f64>,
}

impl ResolutionTarget {
    /// Normalize constraints; absent constraints mean 640x480
    pub fn from_constraints(constraints: Option<&MediaTrackConstraints>) -> Self {
        let defaults = MediaTrackConstraints::default();
        let constraints = constraints.unwrap_or(&defaults);
        Self {
            width: constraints.target_width(),
            height: constraints.target_height(),
            aspect_ratio: constraints.requested_aspect_ratio(),
        }
    }

    fn ratio(&self) -> f64 {
        self.aspect_ratio.unwrap_or(self.width / self.height)
    }

    fn pixels(&self) -> f64 {
        self.width * self.height
    }
}

/// Resolve the capture resolution for a request against a device preset
pub fn resolve_resolution(
    constraints: Option<&MediaTrackConstraints>,
    preset: &DevicePreset,
    orientation: Orientation,
) -> VideoResolution {
    let target = ResolutionTarget::from_constraints(constraints);
    let candidates = &preset.video_resolutions;

    if let Some(found) = exact_match(&target, candidates, orientation) {
        debug!(
            "Exact resolution match {} for {}x{} ({:?})",
            found, target.width, target.height, orientation
        );
        return found;
    }

    if let Some(found) = best_fit(&target, candidates, orientation) {
        debug!(
            "Best-fit resolution {} for {}x{} ({:?})",
            found, target.width, target.height, orientation
        );
        return found;
    }

    let found = fallback(candidates, orientation);
    debug!(
        "Fallback resolution {} for {}x{} ({:?})",
        found, target.width, target.height, orientation
    );
    found
}

fn matches(candidate: &VideoResolution, width: f64, height: f64) -> bool {
    candidate.width as f64 == width && candidate.height as f64 == height
}

/// Tier 1: literal (width, height) match, transposed for portrait viewports
pub fn exact_match(
    target: &ResolutionTarget,
    candidates: &[VideoResolution],
    orientation: Orientation,
) -> Option<VideoResolution> {
    if let Some(found) = candidates
        .iter()
        .find(|c| matches(c, target.width, target.height))
    {
        if orientation.is_portrait() && found.is_landscape() {
            return Some(found.transposed());
        }
        return Some(*found);
    }

    if orientation.is_portrait() {
        return candidates
            .iter()
            .find(|c| matches(c, target.height, target.width))
            .map(VideoResolution::transposed);
    }

    None
}

/// Score a candidate against the target; lower is better
pub fn fit_score(candidate: &VideoResolution, target: &ResolutionTarget) -> f64 {
    let ratio_delta = (candidate.aspect_ratio() - target.ratio()).abs();
    let target_pixels = target.pixels();
    let pixel_delta = (candidate.pixel_count() as f64 - target_pixels).abs() / target_pixels;
    ratio_delta * ASPECT_RATIO_WEIGHT + pixel_delta
}

/// Tier 2: lowest-scored candidate; ties keep the earlier entry.
///
/// Candidates with a non-finite score (zero-sized target or candidate) are
/// ignored, so `None` means nothing could be scored.
pub fn best_fit(
    target: &ResolutionTarget,
    candidates: &[VideoResolution],
    orientation: Orientation,
) -> Option<VideoResolution> {
    let mut best: Option<(VideoResolution, f64)> = None;

    for candidate in candidates {
        let oriented = if orientation.is_portrait() && candidate.is_landscape() {
            candidate.transposed()
        } else {
            *candidate
        };

        let score = fit_score(&oriented, target);
        if !score.is_finite() {
            continue;
        }

        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((oriented, score)),
        }
    }

    best.map(|(resolution, _)| resolution)
}

/// Tier 3: orientation-aware pick from the list, or 640x480 when it is empty
pub fn fallback(candidates: &[VideoResolution], orientation: Orientation) -> VideoResolution {
    let Some(first) = candidates.first() else {
        return FALLBACK_RESOLUTION;
    };

    if orientation.is_portrait() {
        candidates
            .iter()
            .find(|c| c.is_portrait())
            .copied()
            .unwrap_or_else(|| first.transposed())
    } else {
        candidates
            .iter()
            .find(|c| c.width >= c.height)
            .copied()
            .unwrap_or(*first)
    }
}
