//! Similarity functions for comparing vectors.
//!
//! Every function follows the "higher is more similar" convention, so
//! Euclidean distance is negated before it is used as a score.
//!
//! Summation is a left-to-right fold in `f64`; repeated calls on the same
//! inputs return bit-identical results.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// A pure scoring strategy over two equal-length vectors.
pub trait SimilarityFunction: Send + Sync {
    /// Score `a` against `b`.
    ///
    /// Fails with [`Error::DimensionMismatch`] when the lengths differ.
    fn score(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_lengths(a, b)?;
        Ok(self.score_unchecked(a, b))
    }

    /// Score two vectors already known to have equal length.
    fn score_unchecked(&self, a: &[f64], b: &[f64]) -> f64;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

fn check_lengths(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::dimension_mismatch(a.len(), b.len()));
    }
    Ok(())
}

/// Dot product: `sum(a[i] * b[i])`.
#[inline]
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");
    a.iter().zip(b).fold(0.0, |acc, (x, y)| acc + x * y)
}

/// Largest absolute component, `0.0` for an empty or all-zero vector.
#[inline]
fn max_abs(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

/// Euclidean norm of a vector.
///
/// Components are divided by the largest magnitude before squaring, so
/// neither tiny nor huge finite vectors underflow to zero or overflow.
#[inline]
pub fn norm(a: &[f64]) -> f64 {
    let scale = max_abs(a);
    if scale == 0.0 {
        return 0.0;
    }
    let sum = a.iter().fold(0.0, |acc, x| {
        let x = x / scale;
        acc + x * x
    });
    scale * sum.sqrt()
}

/// Cosine similarity: `dot(a, b) / (norm(a) * norm(b))`.
///
/// A zero vector has similarity `0.0` to everything, itself included, so the
/// result is never NaN for finite input. Each vector is scaled by its largest
/// magnitude first; the angle is unchanged and the intermediate sums stay in
/// range for any finite components. The result is clamped to `[-1, 1]`.
///
/// ```
/// use glint_retrieval::vectorstores::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
/// assert!((cosine_similarity(&[1e200, 1e200], &[1e200, 1e200]) - 1.0).abs() < 1e-12);
/// ```
#[inline]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return 0.0;
    }

    let (dot, sum_a, sum_b) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0, 0.0), |(dot, sum_a, sum_b), (x, y)| {
            let x = x / scale_a;
            let y = y / scale_b;
            (dot + x * y, sum_a + x * x, sum_b + y * y)
        });

    (dot / (sum_a.sqrt() * sum_b.sqrt())).clamp(-1.0, 1.0)
}

/// Euclidean (L2) distance: `sqrt(sum((a[i] - b[i])^2))`.
///
/// Scaled like [`norm`]; the result is infinite only when a component
/// difference itself overflows.
#[inline]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");
    let scale = a
        .iter()
        .zip(b)
        .fold(0.0, |acc: f64, (x, y)| acc.max((x - y).abs()));
    if scale == 0.0 || scale.is_infinite() {
        return scale;
    }
    let sum = a.iter().zip(b).fold(0.0, |acc, (x, y)| {
        let d = (x - y) / scale;
        acc + d * d
    });
    scale * sum.sqrt()
}

/// Cosine similarity scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl SimilarityFunction for Cosine {
    fn score_unchecked(&self, a: &[f64], b: &[f64]) -> f64 {
        cosine_similarity(a, b)
    }

    fn name(&self) -> &str {
        "cosine"
    }
}

/// Dot product scorer, for pre-normalized vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProduct;

impl SimilarityFunction for DotProduct {
    fn score_unchecked(&self, a: &[f64], b: &[f64]) -> f64 {
        dot_product(a, b)
    }

    fn name(&self) -> &str {
        "dot_product"
    }
}

/// Negative Euclidean distance scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeEuclidean;

impl SimilarityFunction for NegativeEuclidean {
    fn score_unchecked(&self, a: &[f64], b: &[f64]) -> f64 {
        -euclidean_distance(a, b)
    }

    fn name(&self) -> &str {
        "negative_euclidean"
    }
}

/// Similarity metrics for comparing vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity, in [-1, 1]
    #[default]
    Cosine,
    /// Negative Euclidean distance, in (-inf, 0]
    Euclidean,
    /// Dot product, unbounded
    DotProduct,
}

impl SimilarityMetric {
    /// Smallest score this metric can produce, if bounded
    pub fn lower_bound(&self) -> Option<f64> {
        match self {
            SimilarityMetric::Cosine => Some(-1.0),
            SimilarityMetric::Euclidean | SimilarityMetric::DotProduct => None,
        }
    }

    /// Largest score this metric can produce, if bounded
    pub fn upper_bound(&self) -> Option<f64> {
        match self {
            SimilarityMetric::Cosine => Some(1.0),
            SimilarityMetric::Euclidean => Some(0.0),
            SimilarityMetric::DotProduct => None,
        }
    }
}

impl SimilarityFunction for SimilarityMetric {
    fn score_unchecked(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            SimilarityMetric::Cosine => Cosine.score_unchecked(a, b),
            SimilarityMetric::Euclidean => NegativeEuclidean.score_unchecked(a, b),
            SimilarityMetric::DotProduct => DotProduct.score_unchecked(a, b),
        }
    }

    fn name(&self) -> &str {
        match self {
            SimilarityMetric::Cosine => Cosine.name(),
            SimilarityMetric::Euclidean => NegativeEuclidean.name(),
            SimilarityMetric::DotProduct => DotProduct.name(),
        }
    }
}
