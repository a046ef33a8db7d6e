//! Capture constraint model
//!
//! Constraint values arrive either as plain literals or as range objects
//! (`{min, max, ideal, exact}`), and string constraints may also be lists.
//! Each shape is a variant here, and a single normalization function per
//! kind turns it into the plain value the resolvers work with.

use serde::{Deserialize, Serialize};

/// Width used when the caller does not request one
pub const DEFAULT_WIDTH: f64 = 640.0;
/// Height used when the caller does not request one
pub const DEFAULT_HEIGHT: f64 = 480.0;

/// Numeric constraint: literal or range object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstrainDouble {
    /// Bare number
    Value(f64),
    /// Range object
    Range(ConstrainDoubleRange),
}

/// Range form of a numeric constraint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstrainDoubleRange {
    /// Lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Preferred value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<f64>,
    /// Required value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<f64>,
}

impl ConstrainDouble {
    /// Normalize to a single number.
    ///
    /// Precedence: literal, then `ideal`, `exact`, `max`. `min` alone does
    /// not name a target and yields `None`.
    pub fn value(&self) -> Option<f64> {
        match self {
            ConstrainDouble::Value(v) => Some(*v),
            ConstrainDouble::Range(range) => range.ideal.or(range.exact).or(range.max),
        }
    }

    /// Normalize, falling back to `default` when no target is named
    pub fn value_or(constraint: Option<&ConstrainDouble>, default: f64) -> f64 {
        constraint.and_then(ConstrainDouble::value).unwrap_or(default)
    }
}

impl From<f64> for ConstrainDouble {
    fn from(value: f64) -> Self {
        ConstrainDouble::Value(value)
    }
}

impl From<u32> for ConstrainDouble {
    fn from(value: u32) -> Self {
        ConstrainDouble::Value(value as f64)
    }
}

impl From<i32> for ConstrainDouble {
    fn from(value: i32) -> Self {
        ConstrainDouble::Value(value as f64)
    }
}

/// String or list of strings inside a range object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// Single string
    Single(String),
    /// List of strings, first one wins
    List(Vec<String>),
}

impl StringOrList {
    fn first(&self) -> Option<&str> {
        match self {
            StringOrList::Single(s) => Some(s.as_str()),
            StringOrList::List(list) => list.first().map(String::as_str),
        }
    }
}

/// String constraint: literal, list or range object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstrainString {
    /// Bare string
    Value(String),
    /// List of acceptable values
    List(Vec<String>),
    /// Range object
    Range(ConstrainStringRange),
}

/// Range form of a string constraint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstrainStringRange {
    /// Preferred value(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<StringOrList>,
    /// Required value(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<StringOrList>,
}

impl ConstrainString {
    /// Normalize to a single string: lists take their first element,
    /// range objects prefer `ideal` over `exact`.
    pub fn value(&self) -> Option<&str> {
        match self {
            ConstrainString::Value(s) => Some(s.as_str()),
            ConstrainString::List(list) => list.first().map(String::as_str),
            ConstrainString::Range(range) => range
                .ideal
                .as_ref()
                .and_then(StringOrList::first)
                .or_else(|| range.exact.as_ref().and_then(StringOrList::first)),
        }
    }
}

impl From<&str> for ConstrainString {
    fn from(value: &str) -> Self {
        ConstrainString::Value(value.to_string())
    }
}

/// Constraints for a single video track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrackConstraints {
    /// Requested width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<ConstrainDouble>,
    /// Requested height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<ConstrainDouble>,
    /// Requested frame rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<ConstrainDouble>,
    /// Requested aspect ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<ConstrainDouble>,
    /// Requested facing mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing_mode: Option<ConstrainString>,
    /// Requested device id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<ConstrainString>,
}

impl MediaTrackConstraints {
    /// Empty constraint set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set requested width
    pub fn width(mut self, width: impl Into<ConstrainDouble>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Set requested height
    pub fn height(mut self, height: impl Into<ConstrainDouble>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// Set requested frame rate
    pub fn frame_rate(mut self, fps: impl Into<ConstrainDouble>) -> Self {
        self.frame_rate = Some(fps.into());
        self
    }

    /// Set requested aspect ratio
    pub fn aspect_ratio(mut self, ratio: impl Into<ConstrainDouble>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    /// Set requested facing mode
    pub fn facing_mode(mut self, mode: impl Into<ConstrainString>) -> Self {
        self.facing_mode = Some(mode.into());
        self
    }

    /// Target width, defaulting to 640
    pub fn target_width(&self) -> f64 {
        ConstrainDouble::value_or(self.width.as_ref(), DEFAULT_WIDTH)
    }

    /// Target height, defaulting to 480
    pub fn target_height(&self) -> f64 {
        ConstrainDouble::value_or(self.height.as_ref(), DEFAULT_HEIGHT)
    }

    /// Requested frame rate, if a positive finite one was named
    pub fn requested_frame_rate(&self) -> Option<f64> {
        self.frame_rate
            .as_ref()
            .and_then(ConstrainDouble::value)
            .filter(|fps| fps.is_finite() && *fps > 0.0)
    }

    /// Requested aspect ratio, if a positive finite one was named
    pub fn requested_aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
            .as_ref()
            .and_then(ConstrainDouble::value)
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
    }

    /// Requested facing mode string, if any
    pub fn requested_facing_mode(&self) -> Option<&str> {
        self.facing_mode.as_ref().and_then(ConstrainString::value)
    }
}

/// `video` member of a stream request: `true`/`false` or a constraint set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoRequest {
    /// Plain on/off flag
    Enabled(bool),
    /// Detailed constraints
    Constraints(MediaTrackConstraints),
}

/// Top-level stream request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaStreamConstraints {
    /// Video request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRequest>,
    /// Audio request (not synthesized)
    #[serde(default)]
    pub audio: bool,
}

impl MediaStreamConstraints {
    /// Request video with the given constraints
    pub fn video(constraints: MediaTrackConstraints) -> Self {
        Self {
            video: Some(VideoRequest::Constraints(constraints)),
            audio: false,
        }
    }

    /// Request video with no particular constraints
    pub fn any_video() -> Self {
        Self {
            video: Some(VideoRequest::Enabled(true)),
            audio: false,
        }
    }

    /// Video constraint set, if the request carries one
    pub fn video_constraints(&self) -> Option<&MediaTrackConstraints> {
        match &self.video {
            Some(VideoRequest::Constraints(constraints)) => Some(constraints),
            _ => None,
        }
    }

    /// Whether video was requested at all
    pub fn wants_video(&self) -> bool {
        !matches!(self.video, None | Some(VideoRequest::Enabled(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_precedence() {
        let range = ConstrainDouble::Range(ConstrainDoubleRange {
            min: Some(100.0),
            max: Some(1920.0),
            ideal: Some(1280.0),
            exact: Some(640.0),
        });
        assert_eq!(range.value(), Some(1280.0));

        let exact_over_max = ConstrainDouble::Range(ConstrainDoubleRange {
            max: Some(1920.0),
            exact: Some(640.0),
            ..Default::default()
        });
        assert_eq!(exact_over_max.value(), Some(640.0));

        let min_only = ConstrainDouble::Range(ConstrainDoubleRange {
            min: Some(320.0),
            ..Default::default()
        });
        assert_eq!(min_only.value(), None);
        assert_eq!(ConstrainDouble::value_or(Some(&min_only), 480.0), 480.0);
    }

    #[test]
    fn test_string_shapes() {
        let parsed: ConstrainString = serde_json::from_str(r#""environment""#).unwrap();
        assert_eq!(parsed.value(), Some("environment"));

        let parsed: ConstrainString = serde_json::from_str(r#"["user", "environment"]"#).unwrap();
        assert_eq!(parsed.value(), Some("user"));

        let parsed: ConstrainString =
            serde_json::from_str(r#"{"exact": ["environment", "user"]}"#).unwrap();
        assert_eq!(parsed.value(), Some("environment"));

        let parsed: ConstrainString =
            serde_json::from_str(r#"{"ideal": "user", "exact": "environment"}"#).unwrap();
        assert_eq!(parsed.value(), Some("user"));
    }

    #[test]
    fn test_browser_dictionary_parsing() {
        let json = r#"{
            "video": {
                "width": {"ideal": 1920},
                "height": 1080,
                "frameRate": {"max": 24},
                "facingMode": {"exact": "environment"}
            },
            "audio": false
        }"#;
        let constraints: MediaStreamConstraints = serde_json::from_str(json).unwrap();
        let video = constraints.video_constraints().unwrap();

        assert_eq!(video.target_width(), 1920.0);
        assert_eq!(video.target_height(), 1080.0);
        assert_eq!(video.requested_frame_rate(), Some(24.0));
        assert_eq!(video.requested_facing_mode(), Some("environment"));
        assert!(constraints.wants_video());
    }

    #[test]
    fn test_defaults_and_flags() {
        let video = MediaTrackConstraints::new();
        assert_eq!(video.target_width(), DEFAULT_WIDTH);
        assert_eq!(video.target_height(), DEFAULT_HEIGHT);
        assert_eq!(video.requested_frame_rate(), None);

        let flag: MediaStreamConstraints = serde_json::from_str(r#"{"video": true}"#).unwrap();
        assert!(flag.wants_video());
        assert!(flag.video_constraints().is_none());

        let off: MediaStreamConstraints = serde_json::from_str(r#"{"video": false}"#).unwrap();
        assert!(!off.wants_video());
    }
}
