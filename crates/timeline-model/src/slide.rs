//! A single timed segment of the timeline.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::element::{Element, TextElement};
use crate::{new_id, TimelineError};

/// Shortest allowed slide duration in seconds.
pub const MIN_SLIDE_SECS: f64 = 1.0;
/// Longest allowed slide duration in seconds.
pub const MAX_SLIDE_SECS: f64 = 60.0;

/// One temporal segment: a background plus overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    #[serde(alias = "durationSec", deserialize_with = "clamped_duration")]
    pub duration_secs: f64,
    /// Missing, empty or malformed backgrounds read as opaque black.
    #[serde(default, deserialize_with = "background_or_black")]
    pub background: Color,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Slide {
    /// Empty slide with a clamped duration.
    pub fn new(duration_secs: f64, background: Color) -> Self {
        Self {
            id: new_id(),
            duration_secs: clamp_duration(duration_secs),
            background,
            elements: Vec::new(),
        }
    }

    /// The slide a fresh timeline starts with.
    pub fn title() -> Self {
        Self::new(3.0, Color::rgb(0x0b, 0x10, 0x21))
            .with_element(Element::Text(TextElement::new("Your title here", 64.0)))
    }

    /// The slide appended by "add slide".
    pub fn blank() -> Self {
        Self::new(3.0, Color::rgb(0x11, 0x18, 0x27))
            .with_element(Element::Text(TextElement::new("New slide", 56.0)))
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_secs * 1000.0
    }

    pub fn set_duration_secs(&mut self, secs: f64) {
        self.duration_secs = clamp_duration(secs);
    }

    pub fn push_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Remove an element by id, returning it if present.
    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        let idx = self.elements.iter().position(|e| e.id() == id)?;
        Some(self.elements.remove(idx))
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Deep copy with fresh ids for the slide and every element.
    pub fn duplicate(&self) -> Self {
        Self {
            id: new_id(),
            duration_secs: self.duration_secs,
            background: self.background,
            elements: self.elements.iter().map(Element::duplicate).collect(),
        }
    }

    /// Check the invariants the renderer relies on.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.duration_secs <= 0.0 || !self.duration_secs.is_finite() {
            return Err(TimelineError::NonPositiveDuration {
                id: self.id.clone(),
                duration_secs: self.duration_secs,
            });
        }

        let mut seen = HashSet::new();
        for element in &self.elements {
            if !seen.insert(element.id()) {
                return Err(TimelineError::DuplicateId {
                    id: element.id().to_string(),
                    scope: format!("slide {}", self.id),
                });
            }
        }
        Ok(())
    }
}

fn background_or_black<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().map_or(Color::BLACK, Color::parse_or_black))
}

fn clamped_duration<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_duration)
}

fn clamp_duration(secs: f64) -> f64 {
    if secs.is_nan() {
        return MIN_SLIDE_SECS;
    }
    secs.clamp(MIN_SLIDE_SECS, MAX_SLIDE_SECS)
}
