//! Pure projection of carousel state into a renderable frame description.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::warn;

use crate::builder::SlideSequence;
use crate::clock::Clock;
use crate::config::StyleConfig;
use crate::gesture::TrackStyle;
use crate::photo::{NormalizedPhoto, TimestampOrigin};

pub const DEFAULT_TITLE: &str = "Photo Carousel";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";
pub const EMPTY_NOTICE: &str = "No photos found or loaded from the description file or 'photos' property. Please check your configuration or filters.";

/// Display options that do not change while a sequence is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub title: Option<String>,
    pub title_style: StyleConfig,
    pub timestamp_style: StyleConfig,
    pub description_style: StyleConfig,
    pub timestamp_format: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            title: None,
            title_style: StyleConfig::default(),
            timestamp_style: StyleConfig::default(),
            description_style: StyleConfig::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
}

impl StyledText {
    fn new(text: impl Into<String>, style: &StyleConfig) -> Self {
        Self {
            text: text.into(),
            font_color: style.font_color.clone(),
            font_size: style.font_size.clone(),
        }
    }

    /// Inline CSS overriding the inherited theme values.
    pub fn css(&self) -> String {
        let mut css = String::new();
        if let Some(size) = &self.font_size {
            let _ = write!(css, "font-size: {size};");
        }
        if let Some(color) = &self.font_color {
            if !css.is_empty() {
                css.push(' ');
            }
            let _ = write!(css, "color: {color};");
        }
        css
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackView {
    pub current: usize,
    /// `-current * 100`, the discrete page position in percent.
    pub offset_percent: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drag_offset_px: Option<f64>,
    pub transition: String,
}

impl TrackView {
    pub fn transform(&self) -> String {
        match self.drag_offset_px {
            Some(px) => format!("translateX(calc({}% + {}px))", self.offset_percent, px),
            None => format!("translateX({}%)", self.offset_percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideView {
    pub index: usize,
    pub img: String,
    pub alt: String,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<StyledText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<StyledText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dot {
    pub index: usize,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<StyledText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackView>,
    pub slides: Vec<SlideView>,
    pub dots: Vec<Dot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl Frame {
    pub fn visible_slide(&self) -> Option<&SlideView> {
        self.slides.iter().find(|s| s.visible)
    }

    pub fn active_dot(&self) -> Option<usize> {
        self.dots.iter().find(|d| d.active).map(|d| d.index)
    }
}

pub fn project(
    sequence: &SlideSequence,
    current: usize,
    track: &TrackStyle,
    settings: &RenderSettings,
    clock: &Clock,
) -> Frame {
    let title_text = settings.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let title = (settings.title_style.show && !title_text.trim().is_empty())
        .then(|| StyledText::new(title_text, &settings.title_style));

    if sequence.is_empty() {
        return Frame {
            title,
            track: None,
            slides: Vec::new(),
            dots: Vec::new(),
            notice: Some(EMPTY_NOTICE.to_string()),
        };
    }

    let current = current.min(sequence.len() - 1);
    let slides = sequence
        .iter()
        .enumerate()
        .map(|(index, photo)| slide_view(index, photo, index == current, settings, clock))
        .collect();
    let dots = (0..sequence.len())
        .map(|index| Dot {
            index,
            active: index == current,
        })
        .collect();

    Frame {
        title,
        track: Some(TrackView {
            current,
            offset_percent: -(current as i64) * 100,
            drag_offset_px: track.live_offset,
            transition: track.transition.clone(),
        }),
        slides,
        dots,
        notice: None,
    }
}

fn slide_view(
    index: usize,
    photo: &NormalizedPhoto,
    visible: bool,
    settings: &RenderSettings,
    clock: &Clock,
) -> SlideView {
    let timestamp = match (&photo.time_stamp, settings.timestamp_style.show) {
        (Some(_), true) => Some(StyledText::new(
            format_timestamp(photo, &settings.timestamp_format, clock),
            &settings.timestamp_style,
        )),
        _ => None,
    };
    let description = (settings.description_style.show && !photo.desc.is_empty())
        .then(|| StyledText::new(photo.desc.as_str(), &settings.description_style));
    SlideView {
        index,
        img: photo.img.clone(),
        alt: if photo.desc.is_empty() {
            "Photo".to_string()
        } else {
            photo.desc.clone()
        },
        visible,
        timestamp,
        description,
    }
}

/// Format a photo's timestamp for display, falling back to the raw value.
pub fn format_timestamp(photo: &NormalizedPhoto, pattern: &str, clock: &Clock) -> String {
    let raw = photo.time_stamp.clone().unwrap_or_default();
    if photo.origin != TimestampOrigin::Parsed {
        return raw;
    }
    let mut out = String::new();
    match write!(out, "{}", clock.to_display(photo.timestamp).format(pattern)) {
        Ok(()) => out,
        Err(_) => {
            warn!(
                photo = photo.label(),
                pattern, "error formatting timestamp; showing raw value"
            );
            raw
        }
    }
}
