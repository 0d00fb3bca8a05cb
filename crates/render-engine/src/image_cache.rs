//! Decoded image cache keyed by element id.
//!
//! Each render or export session owns one cache. Entries remember the source
//! they were decoded from and are decoded again if an element's source
//! changes. Decode failures are cached too, so a broken image is reported
//! once and then skipped.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use image::{imageops, RgbaImage};
use slidecast_timeline_model::{Element, ImageElement, ImageSource, Timeline};

/// How images missing from the cache are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Decode on the calling thread before returning. Used by export so
    /// every frame sees fully decoded images.
    Blocking,
    /// Decode on a worker thread; the element is pending until it finishes.
    #[default]
    Background,
}

/// Observable state of a cached image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Pending,
    Ready { width: u32, height: u32 },
    Failed,
}

enum SlotState {
    Pending(JoinHandle<Option<RgbaImage>>),
    Ready {
        image: Arc<RgbaImage>,
        fitted: Option<Arc<RgbaImage>>,
    },
    Failed,
}

struct Slot {
    src: ImageSource,
    state: SlotState,
}

#[derive(Default)]
pub struct ImageCache {
    policy: DecodePolicy,
    slots: HashMap<String, Slot>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("policy", &self.policy)
            .field("entries", &self.slots.len())
            .finish()
    }
}

impl ImageCache {
    pub fn new(policy: DecodePolicy) -> Self {
        Self {
            policy,
            slots: HashMap::new(),
        }
    }

    /// Current state of `element`'s image, starting a decode if needed.
    pub fn status(&mut self, element: &ImageElement) -> ImageStatus {
        let stale = self
            .slots
            .get(&element.id)
            .map_or(true, |slot| !slot.src.same_source(&element.src));
        if stale {
            let state = self.start_decode(&element.id, &element.src);
            self.slots.insert(
                element.id.clone(),
                Slot {
                    src: element.src.clone(),
                    state,
                },
            );
        }

        let Some(slot) = self.slots.get_mut(&element.id) else {
            return ImageStatus::Failed;
        };
        poll_slot(&element.id, slot);
        match &slot.state {
            SlotState::Pending(_) => ImageStatus::Pending,
            SlotState::Ready { image, .. } => ImageStatus::Ready {
                width: image.width(),
                height: image.height(),
            },
            SlotState::Failed => ImageStatus::Failed,
        }
    }

    /// The decoded image for `id` resized to `width` x `height`.
    ///
    /// The most recent fitted copy is memoized, so repeated frames at the
    /// same size do not resample.
    pub fn fitted(&mut self, id: &str, width: u32, height: u32) -> Option<Arc<RgbaImage>> {
        if width == 0 || height == 0 {
            return None;
        }
        let SlotState::Ready { image, fitted } = &mut self.slots.get_mut(id)?.state else {
            return None;
        };

        if image.width() == width && image.height() == height {
            return Some(Arc::clone(image));
        }
        if let Some(cached) = fitted {
            if cached.width() == width && cached.height() == height {
                return Some(Arc::clone(cached));
            }
        }

        let resized = Arc::new(imageops::resize(
            &**image,
            width,
            height,
            imageops::FilterType::Triangle,
        ));
        *fitted = Some(Arc::clone(&resized));
        Some(resized)
    }

    /// Start (or, with [`DecodePolicy::Blocking`], finish) decoding every
    /// image in `timeline`, and drop entries for elements no longer present.
    pub fn preload(&mut self, timeline: &Timeline) {
        let mut live = Vec::new();
        for slide in timeline.slides() {
            for element in &slide.elements {
                if let Element::Image(image) = element {
                    self.status(image);
                    live.push(image.id.as_str());
                }
            }
        }
        self.slots.retain(|id, _| live.contains(&id.as_str()));
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn start_decode(&self, id: &str, src: &ImageSource) -> SlotState {
        match self.policy {
            DecodePolicy::Blocking => settle(id, decode(src)),
            DecodePolicy::Background => {
                let src = src.clone();
                SlotState::Pending(std::thread::spawn(move || decode(&src)))
            }
        }
    }
}

fn poll_slot(id: &str, slot: &mut Slot) {
    let finished = matches!(&slot.state, SlotState::Pending(handle) if handle.is_finished());
    if !finished {
        return;
    }
    let state = std::mem::replace(&mut slot.state, SlotState::Failed);
    if let SlotState::Pending(handle) = state {
        let decoded = handle.join().unwrap_or_else(|_| {
            tracing::warn!(element = id, "Image decode worker panicked");
            None
        });
        slot.state = settle(id, decoded);
    }
}

fn settle(id: &str, decoded: Option<RgbaImage>) -> SlotState {
    match decoded {
        Some(image) => {
            tracing::debug!(
                element = id,
                width = image.width(),
                height = image.height(),
                "Image decoded"
            );
            SlotState::Ready {
                image: Arc::new(image),
                fitted: None,
            }
        }
        None => {
            tracing::warn!(element = id, "Image could not be decoded; it will not be drawn");
            SlotState::Failed
        }
    }
}

fn decode(src: &ImageSource) -> Option<RgbaImage> {
    if src.is_empty() {
        return None;
    }
    let image = match image::load_from_memory(src.bytes()) {
        Ok(image) => image.to_rgba8(),
        Err(err) => {
            tracing::debug!(mime = src.mime(), error = %err, "Image decode failed");
            return None;
        }
    };
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    Some(image)
}
