//! Ad carousel rotation state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::AdId;

/// Default time each ad stays on screen.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// One advertisement slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    /// Backend ad ID.
    pub id: AdId,
    /// Creative image URL.
    #[serde(alias = "imagen_url", alias = "imagen")]
    pub image_url: String,
    /// Click-through URL.
    #[serde(default, alias = "enlace", alias = "url")]
    pub link_url: Option<String>,
    /// Alt text.
    #[serde(default, alias = "texto_alternativo", alias = "titulo")]
    pub alt: Option<String>,
}

/// Errors from carousel navigation.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselError {
    /// Requested slide does not exist.
    #[error("slide {index} is out of range (carousel has {len} slides)")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Number of slides.
        len: usize,
    },
}

/// A rotating set of ads.
///
/// Time is fed in through [`Carousel::tick`], so the rotation is driven by
/// whatever clock the caller uses. Manual navigation restarts the countdown.
#[derive(Debug, Clone)]
pub struct Carousel {
    slides: Vec<Ad>,
    index: usize,
    interval: Duration,
    elapsed: Duration,
    paused: bool,
}

impl Carousel {
    /// Create a carousel starting at the first slide.
    ///
    /// A zero `interval` disables auto-advance.
    #[must_use]
    pub const fn new(slides: Vec<Ad>, interval: Duration) -> Self {
        Self {
            slides,
            index: 0,
            interval,
            elapsed: Duration::ZERO,
            paused: false,
        }
    }

    /// Number of slides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Whether there are no slides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Index of the visible slide.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The visible slide, or `None` for an empty carousel.
    #[must_use]
    pub fn current(&self) -> Option<&Ad> {
        self.slides.get(self.index)
    }

    /// Whether auto-advance is paused (e.g. pointer hovering).
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance one slide, wrapping to the first.
    pub fn next(&mut self) {
        if !self.slides.is_empty() {
            self.index = (self.index + 1) % self.slides.len();
        }
        self.elapsed = Duration::ZERO;
    }

    /// Go back one slide, wrapping to the last.
    pub fn prev(&mut self) {
        if !self.slides.is_empty() {
            self.index = self
                .index
                .checked_sub(1)
                .unwrap_or(self.slides.len() - 1);
        }
        self.elapsed = Duration::ZERO;
    }

    /// Jump to a slide (dot navigation).
    ///
    /// # Errors
    ///
    /// [`CarouselError::OutOfRange`] if `index` is past the last slide.
    pub fn go_to(&mut self, index: usize) -> Result<(), CarouselError> {
        if index >= self.slides.len() {
            return Err(CarouselError::OutOfRange {
                index,
                len: self.slides.len(),
            });
        }
        self.index = index;
        self.elapsed = Duration::ZERO;
        Ok(())
    }

    /// Stop auto-advance.
    pub const fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume auto-advance. The countdown continues where it stopped.
    pub const fn resume(&mut self) {
        self.paused = false;
    }

    /// Let `dt` pass. Returns the number of slides advanced.
    pub fn tick(&mut self, dt: Duration) -> usize {
        if self.paused || self.interval.is_zero() || self.slides.len() < 2 {
            return 0;
        }

        self.elapsed += dt;
        let mut advanced = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            self.index = (self.index + 1) % self.slides.len();
            advanced += 1;
        }
        advanced
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ads(n: i64) -> Vec<Ad> {
        (1..=n)
            .map(|i| Ad {
                id: AdId::new(i),
                image_url: format!("https://cdn.example.com/ad{i}.png"),
                link_url: None,
                alt: None,
            })
            .collect()
    }

    #[test]
    fn test_empty_carousel() {
        let mut c = Carousel::new(Vec::new(), DEFAULT_INTERVAL);
        assert!(c.current().is_none());
        c.next();
        c.prev();
        assert_eq!(c.tick(Duration::from_secs(60)), 0);
        assert!(c.go_to(0).is_err());
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut c = Carousel::new(ads(3), DEFAULT_INTERVAL);
        c.prev();
        assert_eq!(c.index(), 2);
        c.next();
        assert_eq!(c.index(), 0);
        c.next();
        assert_eq!(c.current().unwrap().id, AdId::new(2));
    }

    #[test]
    fn test_go_to() {
        let mut c = Carousel::new(ads(3), DEFAULT_INTERVAL);
        c.go_to(2).unwrap();
        assert_eq!(c.index(), 2);
        assert_eq!(
            c.go_to(3),
            Err(CarouselError::OutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_tick_advances_per_interval() {
        let mut c = Carousel::new(ads(3), Duration::from_secs(5));
        assert_eq!(c.tick(Duration::from_secs(4)), 0);
        assert_eq!(c.tick(Duration::from_secs(1)), 1);
        assert_eq!(c.index(), 1);
        assert_eq!(c.tick(Duration::from_secs(11)), 2);
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn test_pause_stops_rotation() {
        let mut c = Carousel::new(ads(2), Duration::from_secs(5));
        c.tick(Duration::from_secs(3));
        c.pause();
        assert_eq!(c.tick(Duration::from_secs(30)), 0);
        c.resume();
        assert_eq!(c.tick(Duration::from_secs(2)), 1);
    }

    #[test]
    fn test_manual_navigation_restarts_countdown() {
        let mut c = Carousel::new(ads(3), Duration::from_secs(5));
        c.tick(Duration::from_secs(4));
        c.next();
        assert_eq!(c.tick(Duration::from_secs(4)), 0);
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn test_single_slide_never_rotates() {
        let mut c = Carousel::new(ads(1), Duration::from_secs(1));
        assert_eq!(c.tick(Duration::from_secs(10)), 0);
    }

    #[test]
    fn test_ad_wire_format() {
        let ad: Ad = serde_json::from_str(
            r#"{"id": 3, "imagen_url": "https://cdn.example.com/a.png", "enlace": "https://shop.example.com"}"#,
        )
        .unwrap();
        assert_eq!(ad.link_url.as_deref(), Some("https://shop.example.com"));
    }
}
