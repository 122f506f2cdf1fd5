//! Presentational widget state: the ad carousel and the image crop tool.
//!
//! Neither widget talks to the backend or the session; they hold the state a
//! view needs to render and react to input.

pub mod carousel;
pub mod crop;

pub use carousel::{Ad, Carousel, CarouselError};
pub use crop::{AspectRatio, CropError, CropRegion, Cropper, Size};
