//! Dominant-color extraction for cover art
//!
//! Reduces decoded pixels to a ranked set of representative colors using
//! Lloyd-style k-means clustering. Channel order is explicit at every
//! boundary: samples carry whatever order the caller declares, and
//! [`Palette`] records it so consumers can convert for display.

pub mod cluster;
pub mod error;
pub mod palette;
pub mod pixel;

pub use cluster::{dominant_colors, ClusterConfig, ColorCluster};
pub use error::PaletteError;
pub use palette::Palette;
pub use pixel::{pixels_from_image, ChannelOrder, PixelSample};
