//! K-means color clustering
//!
//! **Algorithm (per attempt):**
//! 1. Seed `k` centroids from the pixels: the first uniformly at random, the
//!    rest weighted by squared distance to the nearest chosen centroid
//! 2. Assign every pixel to its nearest centroid (squared Euclidean distance,
//!    lowest centroid index wins ties)
//! 3. Move each centroid to the mean of its members; an empty cluster keeps
//!    its previous centroid
//! 4. Stop after `max_iterations` or once no centroid moved more than `epsilon`
//!
//! The attempt with the lowest compactness (sum of squared distances from each
//! pixel to its centroid) is kept, then clusters are ranked by population.

use cah_common::PaletteConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::PaletteError;
use crate::pixel::PixelSample;

/// Clustering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Iteration cap per attempt
    pub max_iterations: usize,
    /// Largest centroid movement (Euclidean) treated as converged
    pub epsilon: f32,
    /// Independent seedings; the most compact labelling wins
    pub attempts: usize,
    /// Fixed RNG seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 0.2,
            attempts: 10,
            seed: None,
        }
    }
}

impl ClusterConfig {
    /// Same parameters with a pinned seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl From<&PaletteConfig> for ClusterConfig {
    fn from(config: &PaletteConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            epsilon: config.epsilon,
            attempts: config.attempts,
            seed: config.seed,
        }
    }
}

/// One cluster of similar colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCluster {
    /// Mean color of the members, in the input channel order
    pub centroid: PixelSample,
    /// Number of pixels assigned to this cluster
    pub member_count: usize,
}

/// Result of one seeding
struct Attempt {
    centroids: Vec<PixelSample>,
    counts: Vec<usize>,
    compactness: f64,
}

/// Find the `k` dominant colors of `pixels`
///
/// Returns `min(k, pixels.len())` clusters ordered by descending
/// `member_count`; ties keep centroid index order. Clusters that ended with
/// no members sort last.
pub fn dominant_colors(
    pixels: &[PixelSample],
    k: usize,
    config: &ClusterConfig,
) -> Result<Vec<ColorCluster>, PaletteError> {
    if k == 0 {
        return Err(PaletteError::InvalidArgument("k must be positive".to_string()));
    }
    if pixels.is_empty() {
        return Err(PaletteError::InvalidArgument("pixel sequence is empty".to_string()));
    }
    if config.attempts == 0 || config.max_iterations == 0 {
        return Err(PaletteError::InvalidArgument(
            "attempts and max_iterations must be positive".to_string(),
        ));
    }
    if !(config.epsilon >= 0.0) {
        return Err(PaletteError::InvalidArgument("epsilon must be non-negative".to_string()));
    }

    let k = k.min(pixels.len());
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut best: Option<Attempt> = None;
    for attempt_index in 0..config.attempts {
        let attempt = run_attempt(pixels, k, config, &mut rng);
        tracing::trace!(
            attempt = attempt_index,
            compactness = attempt.compactness,
            "K-means attempt finished"
        );
        if best
            .as_ref()
            .map_or(true, |current| attempt.compactness < current.compactness)
        {
            best = Some(attempt);
        }
    }

    let best = best.ok_or_else(|| PaletteError::InvalidArgument("no attempt ran".to_string()))?;

    let mut clusters: Vec<ColorCluster> = best
        .centroids
        .into_iter()
        .zip(best.counts)
        .map(|(centroid, member_count)| ColorCluster {
            centroid,
            member_count,
        })
        .collect();
    // Stable: equal populations keep centroid index order
    clusters.sort_by(|a, b| b.member_count.cmp(&a.member_count));

    tracing::debug!(
        pixels = pixels.len(),
        k,
        compactness = best.compactness,
        "Computed dominant colors"
    );

    Ok(clusters)
}

fn run_attempt(
    pixels: &[PixelSample],
    k: usize,
    config: &ClusterConfig,
    rng: &mut StdRng,
) -> Attempt {
    let mut centroids = seed_centroids(pixels, k, rng);
    let mut labels = vec![0usize; pixels.len()];

    for _ in 0..config.max_iterations {
        assign(pixels, &centroids, &mut labels);

        let mut sums = vec![[0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (pixel, &label) in pixels.iter().zip(labels.iter()) {
            for channel in 0..3 {
                sums[label][channel] += f64::from(pixel[channel]);
            }
            counts[label] += 1;
        }

        let mut max_shift = 0f32;
        for (index, centroid) in centroids.iter_mut().enumerate() {
            if counts[index] == 0 {
                continue;
            }
            let count = counts[index] as f64;
            let moved = [
                (sums[index][0] / count) as f32,
                (sums[index][1] / count) as f32,
                (sums[index][2] / count) as f32,
            ];
            max_shift = max_shift.max(squared_distance(centroid, &moved).sqrt());
            *centroid = moved;
        }

        if max_shift <= config.epsilon {
            break;
        }
    }

    // Final labelling against the settled centroids
    let compactness = assign(pixels, &centroids, &mut labels);
    let mut counts = vec![0usize; k];
    for &label in &labels {
        counts[label] += 1;
    }

    Attempt {
        centroids,
        counts,
        compactness,
    }
}

/// D²-weighted seeding; falls back to uniform picks once every pixel
/// coincides with a chosen centroid
fn seed_centroids(pixels: &[PixelSample], k: usize, rng: &mut StdRng) -> Vec<PixelSample> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(pixels[rng.gen_range(0..pixels.len())]);

    let mut nearest: Vec<f64> = pixels
        .iter()
        .map(|pixel| f64::from(squared_distance(pixel, &centroids[0])))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut picked = pixels.len() - 1;
            for (index, weight) in nearest.iter().enumerate() {
                if target < *weight {
                    picked = index;
                    break;
                }
                target -= weight;
            }
            picked
        } else {
            rng.gen_range(0..pixels.len())
        };

        let centroid = pixels[chosen];
        for (pixel, best) in pixels.iter().zip(nearest.iter_mut()) {
            *best = best.min(f64::from(squared_distance(pixel, &centroid)));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Label each pixel with its nearest centroid; returns the compactness
fn assign(pixels: &[PixelSample], centroids: &[PixelSample], labels: &mut [usize]) -> f64 {
    let mut compactness = 0f64;
    for (pixel, label) in pixels.iter().zip(labels.iter_mut()) {
        let mut best_index = 0;
        let mut best_distance = f32::INFINITY;
        for (index, centroid) in centroids.iter().enumerate() {
            let distance = squared_distance(pixel, centroid);
            if distance < best_distance {
                best_distance = distance;
                best_index = index;
            }
        }
        *label = best_index;
        compactness += f64::from(best_distance);
    }
    compactness
}

fn squared_distance(a: &PixelSample, b: &PixelSample) -> f32 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: PixelSample = [255.0, 0.0, 0.0];
    const BLUE: PixelSample = [0.0, 0.0, 255.0];

    fn two_color_pixels(majority: usize, minority: usize) -> Vec<PixelSample> {
        let mut pixels = vec![RED; majority];
        pixels.extend(std::iter::repeat(BLUE).take(minority));
        pixels
    }

    fn close(a: &PixelSample, b: &PixelSample, tolerance: f32) -> bool {
        squared_distance(a, b).sqrt() <= tolerance
    }

    #[test]
    fn test_zero_k_is_invalid() {
        let result = dominant_colors(&[RED], 0, &ClusterConfig::default());
        assert!(matches!(result, Err(PaletteError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_pixels_are_invalid() {
        let result = dominant_colors(&[], 3, &ClusterConfig::default());
        assert!(matches!(result, Err(PaletteError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_attempts_is_invalid() {
        let config = ClusterConfig {
            attempts: 0,
            ..ClusterConfig::default()
        };
        let result = dominant_colors(&[RED], 1, &config);
        assert!(matches!(result, Err(PaletteError::InvalidArgument(_))));
    }

    #[test]
    fn test_majority_color_ranked_first() {
        // Given: 3:1 red/blue pixels
        let pixels = two_color_pixels(300, 100);

        // When: Asking for three clusters
        let clusters = dominant_colors(&pixels, 3, &ClusterConfig::default().with_seed(7)).unwrap();

        // Then: Red leads, blue follows, the spare cluster is empty
        assert_eq!(clusters.len(), 3);
        assert!(close(&clusters[0].centroid, &RED, 1.0));
        assert_eq!(clusters[0].member_count, 300);
        assert!(close(&clusters[1].centroid, &BLUE, 1.0));
        assert_eq!(clusters[1].member_count, 100);
        assert_eq!(clusters[2].member_count, 0);
    }

    #[test]
    fn test_member_counts_cover_every_pixel() {
        let pixels: Vec<PixelSample> = (0..200)
            .map(|i| {
                let v = (i % 50) as f32;
                [v, 255.0 - v, (i / 50) as f32 * 60.0]
            })
            .collect();

        let clusters = dominant_colors(&pixels, 4, &ClusterConfig::default().with_seed(1)).unwrap();

        let total: usize = clusters.iter().map(|c| c.member_count).sum();
        assert_eq!(total, pixels.len());
        assert!(clusters
            .windows(2)
            .all(|pair| pair[0].member_count >= pair[1].member_count));
    }

    #[test]
    fn test_k_clamped_to_pixel_count() {
        let clusters =
            dominant_colors(&[RED, BLUE], 5, &ClusterConfig::default().with_seed(3)).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].member_count, 1);
        assert_eq!(clusters[1].member_count, 1);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let pixels: Vec<PixelSample> = (0..120)
            .map(|i| [(i * 7 % 256) as f32, (i * 13 % 256) as f32, (i * 29 % 256) as f32])
            .collect();
        let config = ClusterConfig::default().with_seed(99);

        let first = dominant_colors(&pixels, 3, &config).unwrap();
        let second = dominant_colors(&pixels, 3, &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_single_color_collapses_into_first_cluster() {
        let pixels = vec![[12.0, 34.0, 56.0]; 50];

        let clusters = dominant_colors(&pixels, 3, &ClusterConfig::default().with_seed(5)).unwrap();

        assert_eq!(clusters[0].member_count, 50);
        assert_eq!(clusters[0].centroid, [12.0, 34.0, 56.0]);
        assert!(clusters[1..].iter().all(|c| c.member_count == 0));
    }

    #[test]
    fn test_config_from_palette_section() {
        let section = PaletteConfig {
            k: 5,
            max_iterations: 20,
            epsilon: 0.5,
            attempts: 2,
            seed: Some(11),
            analyze_uploaded: false,
        };

        let config = ClusterConfig::from(&section);

        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.attempts, 2);
        assert_eq!(config.seed, Some(11));
    }
}
