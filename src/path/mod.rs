//! Vector paths: ordered cubic-bezier vertex sequences.
//!
//! Segments run between consecutive vertices (wrapping for closed paths);
//! each vertex carries in/out tangent handles as offsets from its point.

pub mod morph;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Number of chord samples used for per-segment arc-length approximation.
const ARC_LENGTH_SAMPLES: usize = 10;

/// A single path vertex: anchor point plus tangent-handle offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierVertex {
    /// Anchor point.
    pub point: Point2<f64>,
    /// Incoming tangent handle, as an offset from `point`.
    #[serde(rename = "inHandle")]
    pub in_handle: Vector2<f64>,
    /// Outgoing tangent handle, as an offset from `point`.
    #[serde(rename = "outHandle")]
    pub out_handle: Vector2<f64>,
}

impl BezierVertex {
    /// Vertex with zero-length handles (a corner point).
    #[inline]
    pub fn corner(x: f64, y: f64) -> Self {
        Self {
            point: Point2::new(x, y),
            in_handle: Vector2::zeros(),
            out_handle: Vector2::zeros(),
        }
    }

    /// Vertex with explicit handle offsets.
    #[inline]
    pub fn with_handles(point: Point2<f64>, in_handle: Vector2<f64>, out_handle: Vector2<f64>) -> Self {
        Self {
            point,
            in_handle,
            out_handle,
        }
    }

    /// Swap the in/out handle roles (used when reversing traversal order).
    #[inline]
    pub fn reversed(self) -> Self {
        Self {
            point: self.point,
            in_handle: self.out_handle,
            out_handle: self.in_handle,
        }
    }
}

/// An ordered sequence of bezier vertices, optionally closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BezierPath {
    pub vertices: Vec<BezierVertex>,
    pub closed: bool,
}

/// The four absolute control points of one cubic segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub p0: Point2<f64>,
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
    pub p3: Point2<f64>,
}

impl Segment {
    /// Point on the curve at parameter `t` (Bernstein basis).
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point2::new(
            b0 * self.p0.x + b1 * self.p1.x + b2 * self.p2.x + b3 * self.p3.x,
            b0 * self.p0.y + b1 * self.p1.y + b2 * self.p2.y + b3 * self.p3.y,
        )
    }

    /// First derivative at parameter `t`.
    pub fn derivative_at(&self, t: f64) -> Vector2<f64> {
        let u = 1.0 - t;
        let d0 = 3.0 * u * u;
        let d1 = 6.0 * u * t;
        let d2 = 3.0 * t * t;
        Vector2::new(
            d0 * (self.p1.x - self.p0.x) + d1 * (self.p2.x - self.p1.x) + d2 * (self.p3.x - self.p2.x),
            d0 * (self.p1.y - self.p0.y) + d1 * (self.p2.y - self.p1.y) + d2 * (self.p3.y - self.p2.y),
        )
    }

    /// Chord-length approximation of the segment length.
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        let mut prev = self.p0;
        for i in 1..=ARC_LENGTH_SAMPLES {
            let t = i as f64 / ARC_LENGTH_SAMPLES as f64;
            let p = self.point_at(t);
            total += (p - prev).norm();
            prev = p;
        }
        total
    }

    /// De Casteljau split at parameter `t`, yielding the two half-segments.
    pub fn split(&self, t: f64) -> (Segment, Segment) {
        let lerp_p = |a: Point2<f64>, b: Point2<f64>| Point2::new(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
        );
        let q0 = lerp_p(self.p0, self.p1);
        let q1 = lerp_p(self.p1, self.p2);
        let q2 = lerp_p(self.p2, self.p3);
        let r0 = lerp_p(q0, q1);
        let r1 = lerp_p(q1, q2);
        let s = lerp_p(r0, r1);
        (
            Segment {
                p0: self.p0,
                p1: q0,
                p2: r0,
                p3: s,
            },
            Segment {
                p0: s,
                p1: r1,
                p2: q2,
                p3: self.p3,
            },
        )
    }
}

impl BezierPath {
    /// Open path from corner points.
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        Self {
            vertices: points.iter().map(|&(x, y)| BezierVertex::corner(x, y)).collect(),
            closed: false,
        }
    }

    /// Closed path from corner points.
    pub fn closed_from_points(points: &[(f64, f64)]) -> Self {
        Self {
            vertices: points.iter().map(|&(x, y)| BezierVertex::corner(x, y)).collect(),
            closed: true,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of cubic segments (wrapping segment included when closed).
    #[inline]
    pub fn segment_count(&self) -> usize {
        let n = self.vertices.len();
        if n < 2 {
            0
        } else if self.closed {
            n
        } else {
            n - 1
        }
    }

    /// Control points of segment `i` (callers keep `i < segment_count()`).
    pub fn segment(&self, i: usize) -> Segment {
        let n = self.vertices.len();
        let a = &self.vertices[i % n];
        let b = &self.vertices[(i + 1) % n];
        Segment {
            p0: a.point,
            p1: a.point + a.out_handle,
            p2: b.point + b.in_handle,
            p3: b.point,
        }
    }

    /// Total path length (10-sample chord approximation per segment).
    pub fn length(&self) -> f64 {
        (0..self.segment_count()).map(|i| self.segment(i).length()).sum()
    }

    /// Point at an arc-length distance along the path.
    ///
    /// Accumulates segment lengths until the target is reached, then
    /// interpolates locally within that segment. Distances beyond the path
    /// end clamp to the final point.
    pub fn point_at_length(&self, distance: f64) -> Option<Point2<f64>> {
        let segs = self.segment_count();
        if segs == 0 {
            return self.vertices.first().map(|v| v.point);
        }
        if distance <= 0.0 {
            return Some(self.segment(0).p0);
        }
        let mut remaining = distance;
        for i in 0..segs {
            let seg = self.segment(i);
            let len = seg.length();
            if remaining <= len || i == segs - 1 {
                if len <= f64::EPSILON {
                    return Some(seg.p3);
                }
                let t = (remaining / len).clamp(0.0, 1.0);
                return Some(seg.point_at(t));
            }
            remaining -= len;
        }
        None
    }

    /// Tangent (unit) at an arc-length distance along the path.
    pub fn tangent_at_length(&self, distance: f64) -> Option<Vector2<f64>> {
        let segs = self.segment_count();
        if segs == 0 {
            return None;
        }
        let mut remaining = distance.max(0.0);
        for i in 0..segs {
            let seg = self.segment(i);
            let len = seg.length();
            if remaining <= len || i == segs - 1 {
                let t = if len <= f64::EPSILON {
                    0.0
                } else {
                    (remaining / len).clamp(0.0, 1.0)
                };
                let d = seg.derivative_at(t);
                let norm = d.norm();
                return if norm > f64::EPSILON {
                    Some(d / norm)
                } else {
                    None
                };
            }
            remaining -= len;
        }
        None
    }

    /// Split segment `i` at parameter `t`, inserting the split point as a new
    /// vertex and rewriting the neighboring handles.
    pub fn split_segment(&mut self, i: usize, t: f64) {
        let n = self.vertices.len();
        if n < 2 || i >= self.segment_count() {
            return;
        }
        let seg = self.segment(i);
        let (left, right) = seg.split(t);
        let ia = i % n;
        let ib = (i + 1) % n;

        self.vertices[ia].out_handle = left.p1 - left.p0;
        self.vertices[ib].in_handle = right.p2 - right.p3;

        let mid = BezierVertex {
            point: left.p3,
            in_handle: left.p2 - left.p3,
            out_handle: right.p1 - right.p0,
        };
        self.vertices.insert(ia + 1, mid);
    }

    /// Index of the longest segment by arc length.
    pub fn longest_segment(&self) -> Option<usize> {
        let segs = self.segment_count();
        if segs == 0 {
            return None;
        }
        let mut best = 0;
        let mut best_len = f64::NEG_INFINITY;
        for i in 0..segs {
            let len = self.segment(i).length();
            if len > best_len {
                best_len = len;
                best = i;
            }
        }
        Some(best)
    }

    /// Structural hash: vertex count, closed flag and first/last point rounded
    /// to one decimal. Cheap identity for morph-preparation caching.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.vertices.len().hash(&mut hasher);
        self.closed.hash(&mut hasher);
        let round1 = |v: f64| (v * 10.0).round() as i64;
        if let Some(first) = self.vertices.first() {
            round1(first.point.x).hash(&mut hasher);
            round1(first.point.y).hash(&mut hasher);
        }
        if let Some(last) = self.vertices.last() {
            round1(last.point.x).hash(&mut hasher);
            round1(last.point.y).hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_segment_endpoints() {
        let path = BezierPath::from_points(&[(0.0, 0.0), (10.0, 0.0)]);
        let seg = path.segment(0);
        assert_eq!(seg.point_at(0.0), Point2::new(0.0, 0.0));
        assert_eq!(seg.point_at(1.0), Point2::new(10.0, 0.0));
    }

    #[test]
    fn test_straight_segment_length() {
        let path = BezierPath::from_points(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_relative_eq!(path.length(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_closed_path_wraps() {
        let path = BezierPath::closed_from_points(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(path.segment_count(), 3);
        let wrap = path.segment(2);
        assert_eq!(wrap.p0, Point2::new(1.0, 1.0));
        assert_eq!(wrap.p3, Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_split_preserves_shape_endpoints() {
        let mut path = BezierPath::from_points(&[(0.0, 0.0), (10.0, 0.0)]);
        path.split_segment(0, 0.5);
        assert_eq!(path.vertex_count(), 3);
        assert_relative_eq!(path.vertices[1].point.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(path.length(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_at_length_midpoint() {
        let path = BezierPath::from_points(&[(0.0, 0.0), (10.0, 0.0)]);
        let p = path.point_at_length(5.0).unwrap();
        assert_relative_eq!(p.x, 5.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_structural_hash_stability() {
        let a = BezierPath::from_points(&[(0.0, 0.0), (10.0, 0.0)]);
        let b = a.clone();
        assert_eq!(a.structural_hash(), b.structural_hash());
        let c = BezierPath::from_points(&[(0.0, 0.0), (10.0, 3.0)]);
        assert_ne!(a.structural_hash(), c.structural_hash());
    }
}
