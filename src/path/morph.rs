//! Path morphing: vertex-count matching, rotational correspondence and
//! per-vertex blending between two vector paths.

use super::{BezierPath, BezierVertex};
use lru::LruCache;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Capacity of the prepared-pair cache.
pub const MORPH_CACHE_CAPACITY: usize = 100;

/// Handle length factor applied to tangent-derived handles when resampling.
const RESAMPLE_HANDLE_FACTOR: f64 = 0.33;

/// Strategy for matching vertex counts before morphing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Repeatedly subdivide the longest segment of the shorter path until
    /// counts match.
    #[default]
    SubdivideShorter,
    /// Subdivide both paths up to the larger vertex count.
    SubdivideBoth,
    /// Arc-length-uniform resampling of both paths to a common vertex count.
    Resample,
}

/// Configuration for morph preparation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MorphConfig {
    pub strategy: MatchStrategy,
    /// Vertex count for `Resample`; defaults to the larger of the two input
    /// counts when absent.
    #[serde(default)]
    pub resample_count: Option<usize>,
}

/// A source/target pair with equal vertex counts and resolved correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedMorphPaths {
    pub source: BezierPath,
    pub target: BezierPath,
}

/// Bounded LRU cache of prepared morph pairs, keyed by the structural hash of
/// each input path.
pub struct MorphCache {
    entries: LruCache<(u64, u64), PreparedMorphPaths>,
    hits: u64,
    misses: u64,
}

impl MorphCache {
    pub fn new() -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(MORPH_CACHE_CAPACITY).unwrap()),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up or compute the prepared pair for `(source, target)`.
    pub fn prepare(
        &mut self,
        source: &BezierPath,
        target: &BezierPath,
        config: &MorphConfig,
    ) -> PreparedMorphPaths {
        let key = (source.structural_hash(), target.structural_hash());
        if let Some(prepared) = self.entries.get(&key) {
            self.hits += 1;
            return prepared.clone();
        }
        self.misses += 1;
        let prepared = prepare_morph_paths(source, target, config);
        self.entries.put(key, prepared.clone());
        prepared
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for MorphCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Subdivide `path` (longest segment at its midpoint) until it has `count`
/// vertices.
fn subdivide_to_count(path: &mut BezierPath, count: usize) {
    while path.vertex_count() < count {
        match path.longest_segment() {
            Some(i) => path.split_segment(i, 0.5),
            None => break,
        }
    }
}

/// Arc-length-uniform resampling to `count` vertices with tangent-derived
/// handles.
fn resample(path: &BezierPath, count: usize) -> BezierPath {
    if count < 2 || path.vertex_count() < 2 {
        return path.clone();
    }
    let total = path.length();
    // Closed paths resample the full loop; open paths include both endpoints.
    let spacing = if path.closed {
        total / count as f64
    } else {
        total / (count - 1) as f64
    };
    let mut vertices = Vec::with_capacity(count);
    for i in 0..count {
        let d = spacing * i as f64;
        let point = match path.point_at_length(d) {
            Some(p) => p,
            None => break,
        };
        let tangent = path.tangent_at_length(d).unwrap_or_else(Vector2::zeros);
        let handle = tangent * (spacing * RESAMPLE_HANDLE_FACTOR);
        vertices.push(BezierVertex {
            point,
            in_handle: -handle,
            out_handle: handle,
        });
    }
    BezierPath {
        vertices,
        closed: path.closed,
    }
}

/// Total per-vertex Euclidean travel distance from `source` vertices to a
/// rotated (and optionally reversed) view of `target` vertices.
fn travel_cost(source: &[BezierVertex], target: &[BezierVertex], offset: usize, reversed: bool) -> f64 {
    let n = source.len();
    let mut cost = 0.0;
    for i in 0..n {
        let j = if reversed {
            (offset + n - i) % n
        } else {
            (offset + i) % n
        };
        cost += (target[j].point - source[i].point).norm();
    }
    cost
}

/// Rotate (and optionally reverse) the target's vertex order so that vertex
/// correspondence minimizes total travel distance. Closed paths only; open
/// paths keep their authored order.
fn resolve_correspondence(source: &BezierPath, target: &mut BezierPath) {
    if !target.closed || target.vertices.len() != source.vertices.len() {
        return;
    }
    let n = target.vertices.len();
    if n == 0 {
        return;
    }
    let try_reversed = source.closed && target.closed;

    let mut best_offset = 0;
    let mut best_reversed = false;
    let mut best_cost = f64::INFINITY;
    for offset in 0..n {
        let cost = travel_cost(&source.vertices, &target.vertices, offset, false);
        if cost < best_cost {
            best_cost = cost;
            best_offset = offset;
            best_reversed = false;
        }
        if try_reversed {
            let cost = travel_cost(&source.vertices, &target.vertices, offset, true);
            if cost < best_cost {
                best_cost = cost;
                best_offset = offset;
                best_reversed = true;
            }
        }
    }

    if best_offset == 0 && !best_reversed {
        return;
    }
    let old = &target.vertices;
    let mut rotated = Vec::with_capacity(n);
    for i in 0..n {
        let j = if best_reversed {
            (best_offset + n - i) % n
        } else {
            (best_offset + i) % n
        };
        let v = old[j];
        rotated.push(if best_reversed { v.reversed() } else { v });
    }
    target.vertices = rotated;
}

/// Prepare a `(source, target)` pair for morphing: match vertex counts with
/// the configured strategy, then resolve rotational correspondence.
pub fn prepare_morph_paths(
    source: &BezierPath,
    target: &BezierPath,
    config: &MorphConfig,
) -> PreparedMorphPaths {
    let (source, mut target) = match config.strategy {
        MatchStrategy::SubdivideShorter => {
            let mut s = source.clone();
            let mut t = target.clone();
            let count = s.vertex_count().max(t.vertex_count());
            if s.vertex_count() < count {
                subdivide_to_count(&mut s, count);
            } else {
                subdivide_to_count(&mut t, count);
            }
            (s, t)
        }
        MatchStrategy::SubdivideBoth => {
            let mut s = source.clone();
            let mut t = target.clone();
            let count = s.vertex_count().max(t.vertex_count());
            subdivide_to_count(&mut s, count);
            subdivide_to_count(&mut t, count);
            (s, t)
        }
        MatchStrategy::Resample => {
            let count = config
                .resample_count
                .unwrap_or_else(|| source.vertex_count().max(target.vertex_count()))
                .max(2);
            (resample(source, count), resample(target, count))
        }
    };

    // Correspondence rotates the target against the (possibly subdivided)
    // source; the source keeps its authored order.
    resolve_correspondence(&source, &mut target);
    PreparedMorphPaths { source, target }
}

/// Blend two prepared paths at parameter `t`.
///
/// `t = 0` and `t = 1` short-circuit to exact clones. A vertex-count
/// mismatch is tolerated by truncating both paths to the shorter length
/// (with a warning), never by raising an error.
pub fn morph_paths(source: &BezierPath, target: &BezierPath, t: f64) -> BezierPath {
    if t <= 0.0 {
        return source.clone();
    }
    if t >= 1.0 {
        return target.clone();
    }

    let mut n = source.vertices.len();
    if source.vertices.len() != target.vertices.len() {
        n = source.vertices.len().min(target.vertices.len());
        log::warn!(
            "morph_paths: vertex count mismatch ({} vs {}), truncating to {}",
            source.vertices.len(),
            target.vertices.len(),
            n
        );
    }

    let lerp_v = |a: Vector2<f64>, b: Vector2<f64>| a + (b - a) * t;
    let mut vertices = Vec::with_capacity(n);
    for i in 0..n {
        let a = &source.vertices[i];
        let b = &target.vertices[i];
        vertices.push(BezierVertex {
            point: a.point + (b.point - a.point) * t,
            in_handle: lerp_v(a.in_handle, b.in_handle),
            out_handle: lerp_v(a.out_handle, b.out_handle),
        });
    }
    BezierPath {
        vertices,
        closed: if t < 0.5 { source.closed } else { target.closed },
    }
}
