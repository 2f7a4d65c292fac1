//! Ranked palette output

use serde::{Deserialize, Serialize};

use crate::cluster::{dominant_colors, ClusterConfig, ColorCluster};
use crate::error::PaletteError;
use crate::pixel::{pixels_from_image, ChannelOrder, PixelSample};

/// Dominant colors of one image, most populous first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Channel order of every centroid in `clusters`
    pub order: ChannelOrder,
    pub clusters: Vec<ColorCluster>,
}

impl Palette {
    /// Cluster already-decoded samples
    pub fn from_pixels(
        pixels: &[PixelSample],
        order: ChannelOrder,
        k: usize,
        config: &ClusterConfig,
    ) -> Result<Self, PaletteError> {
        let clusters = dominant_colors(pixels, k, config)?;
        Ok(Self { order, clusters })
    }

    /// Decode an encoded image and cluster its pixels
    pub fn from_image(
        bytes: &[u8],
        order: ChannelOrder,
        k: usize,
        config: &ClusterConfig,
    ) -> Result<Self, PaletteError> {
        let pixels = pixels_from_image(bytes, order)?;
        Self::from_pixels(&pixels, order, k, config)
    }

    /// Most populous cluster
    pub fn dominant(&self) -> Option<&ColorCluster> {
        self.clusters.first()
    }

    /// Re-express every centroid in `target` order
    pub fn into_order(self, target: ChannelOrder) -> Self {
        let source = self.order;
        Self {
            order: target,
            clusters: self
                .clusters
                .into_iter()
                .map(|cluster| ColorCluster {
                    centroid: source.convert(cluster.centroid, target),
                    member_count: cluster.member_count,
                })
                .collect(),
        }
    }

    /// `#rrggbb` strings for every cluster, in rank order
    pub fn hex_colors(&self) -> Vec<String> {
        self.clusters
            .iter()
            .map(|cluster| hex(self.order.convert(cluster.centroid, ChannelOrder::Rgb)))
            .collect()
    }
}

fn hex(rgb: PixelSample) -> String {
    let channel = |value: f32| value.round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(rgb[0]),
        channel(rgb[1]),
        channel(rgb[2])
    )
}
