//! The ordered slide sequence.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::slide::Slide;
use crate::TimelineError;

/// Ordered slides. Order is playback order; the timeline has no identity
/// beyond its contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    pub slides: Vec<Slide>,
}

impl Timeline {
    /// Empty timeline (total duration 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline holding the default title slide.
    pub fn with_title_slide() -> Self {
        Self {
            slides: vec![Slide::title()],
        }
    }

    pub fn from_slides(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    /// Parse a timeline from its JSON form (an array of slides).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Sum of all slide durations in milliseconds.
    pub fn total_duration_ms(&self) -> f64 {
        self.slides.iter().map(Slide::duration_ms).sum()
    }

    /// Total duration rounded to whole milliseconds.
    pub fn total_duration_ms_rounded(&self) -> u64 {
        self.total_duration_ms().round().max(0.0) as u64
    }

    pub fn push_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    pub fn slide(&self, id: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }

    pub fn slide_mut(&mut self, id: &str) -> Option<&mut Slide> {
        self.slides.iter_mut().find(|s| s.id == id)
    }

    /// Remove a slide by id.
    pub fn remove_slide(&mut self, id: &str) -> Result<Slide, TimelineError> {
        let idx = self.index_of(id)?;
        Ok(self.slides.remove(idx))
    }

    /// Insert a deep copy of the slide right after it; returns the copy's id.
    pub fn duplicate_slide(&mut self, id: &str) -> Result<String, TimelineError> {
        let idx = self.index_of(id)?;
        let copy = self.slides[idx].duplicate();
        let copy_id = copy.id.clone();
        self.slides.insert(idx + 1, copy);
        Ok(copy_id)
    }

    /// Check unique slide ids and every slide's own invariants.
    pub fn validate(&self) -> Result<(), TimelineError> {
        let mut seen = HashSet::new();
        for slide in &self.slides {
            if !seen.insert(slide.id.as_str()) {
                return Err(TimelineError::DuplicateId {
                    id: slide.id.clone(),
                    scope: "timeline".to_string(),
                });
            }
            slide.validate()?;
        }
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize, TimelineError> {
        self.slides
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| TimelineError::SlideNotFound { id: id.to_string() })
    }
}
