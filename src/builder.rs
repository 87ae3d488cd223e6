//! Turns raw descriptors into the ordered, immutable slide sequence.

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Error;
use crate::photo::{NormalizedPhoto, RawPhotoDescriptor, normalize};

/// Most-recent-first slides shared by the controller, projector and host.
///
/// Cloning is cheap; a rebuilt sequence replaces the old one as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlideSequence(Arc<[NormalizedPhoto]>);

impl SlideSequence {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[NormalizedPhoto] {
        &self.0
    }
}

impl Deref for SlideSequence {
    type Target = [NormalizedPhoto];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<NormalizedPhoto>> for SlideSequence {
    fn from(photos: Vec<NormalizedPhoto>) -> Self {
        Self(photos.into())
    }
}

/// What to do when every supplied photo is older than the age cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyAfterFilter {
    /// Keep the empty sequence and render the "no photos" notice.
    #[default]
    Show,
    /// Report [`Error::AllPhotosFiltered`].
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    /// Keep at most this many of the most recent photos; `0` keeps all.
    pub max_items: usize,
    /// Drop photos older than midnight this many days ago; `0` keeps all.
    pub max_days: u32,
    pub empty_after_filter: EmptyAfterFilter,
}

impl Default for BuildLimits {
    fn default() -> Self {
        Self {
            max_items: 30,
            max_days: 0,
            empty_after_filter: EmptyAfterFilter::Show,
        }
    }
}

/// Normalize, age-filter, sort and cap `raw` into a fresh sequence.
///
/// # Errors
/// [`Error::NoPhotosConfigured`] when `raw` is empty, and
/// [`Error::AllPhotosFiltered`] when the age filter removed everything and
/// the limits ask for that to be an error.
pub fn build(
    raw: Vec<RawPhotoDescriptor>,
    limits: &BuildLimits,
    clock: &Clock,
) -> Result<SlideSequence, Error> {
    if raw.is_empty() {
        return Err(Error::NoPhotosConfigured);
    }
    let total = raw.len();
    let mut photos: Vec<NormalizedPhoto> =
        raw.into_iter().map(|r| normalize(r, clock)).collect();

    if limits.max_days > 0 {
        match clock.start_of_day_days_back(limits.max_days) {
            Some(cutoff) => {
                photos.retain(|p| p.timestamp >= cutoff);
                info!(
                    max_days = limits.max_days,
                    %cutoff,
                    remaining = photos.len(),
                    "filtered by max_days_to_show"
                );
            }
            None => warn!(
                max_days = limits.max_days,
                "age cutoff is outside the calendar range; skipping filter"
            ),
        }
    }

    // `sort_by` is stable, so equal timestamps keep encounter order.
    photos.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if limits.max_items > 0 && photos.len() > limits.max_items {
        photos.truncate(limits.max_items);
        info!(
            max_items = limits.max_items,
            remaining = photos.len(),
            "filtered by max_items_to_show"
        );
    }

    if photos.is_empty() {
        match limits.empty_after_filter {
            EmptyAfterFilter::Error => return Err(Error::AllPhotosFiltered { total }),
            EmptyAfterFilter::Show => {
                warn!(total, "every configured photo was filtered out");
            }
        }
    }

    debug!(total, kept = photos.len(), "slide sequence built");
    Ok(SlideSequence::from(photos))
}
