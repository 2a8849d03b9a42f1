//! Piecewise-linear paths with orientation-continuous frames.
//!
//! A [`Curve`] is built from an ordered list of control points. Every edge carries a frame whose
//! front is the edge direction; frames are propagated from edge to edge by the minimal rotation
//! between consecutive directions, so the up/right axes never twist at a vertex unless the path
//! itself turns. Open curves clamp queries at both ends and report how far past the end the query
//! landed (the overpass); looped curves wrap around.

use glam::{Quat, Vec3};
use log::{debug, warn};

use crate::config::MIN_EDGE_LENGTH;
use crate::error::{JointError, Result};
use crate::utils::math::Frame;

/// One straight segment of a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveEdge {
    pub length: f32,
    /// Arclength of all edges preceding this one.
    pub start_distance: f32,
    pub start: usize,
    pub end: usize,
    /// Origin at the start point, front along the edge.
    pub frame: Frame,
}

impl CurveEdge {
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.frame.front()
    }

    #[inline]
    pub fn start_point(&self) -> Vec3 {
        self.frame.origin
    }

    #[inline]
    pub fn end_point(&self) -> Vec3 {
        self.frame.origin + self.frame.front() * self.length
    }

    #[inline]
    pub fn end_distance(&self) -> f32 {
        self.start_distance + self.length
    }
}

/// Result of a curve query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveLocation {
    /// Frame at the located point; front is the local tangent.
    pub frame: Frame,
    /// Arclength from the start of the curve.
    pub distance: f32,
    /// Signed distance past an open curve's start (negative) or end (positive).
    pub overpass: f32,
    /// Index of the edge the point lies on.
    pub edge: usize,
}

impl CurveLocation {
    pub fn point(&self) -> Vec3 {
        self.frame.origin
    }

    pub fn tangent(&self) -> Vec3 {
        self.frame.front()
    }
}

#[derive(Debug, Clone, Copy)]
struct Projection {
    edge: usize,
    /// Unclamped parameter along the edge.
    along: f32,
    clamped: f32,
    point: Vec3,
    distance_squared: f32,
}

impl Projection {
    fn is_interior(&self, length: f32) -> bool {
        self.along >= 0.0 && self.along <= length
    }
}

const SEARCH_EPSILON: f32 = 1.0e-9;

/// Ordered control points and the edge list derived from them.
#[derive(Debug, Clone)]
pub struct Curve {
    points: Vec<Vec3>,
    edges: Vec<CurveEdge>,
    length: f32,
    looped: bool,
    reference_up: Vec3,
}

impl Default for Curve {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            edges: Vec::new(),
            length: 0.0,
            looped: false,
            reference_up: Vec3::Y,
        }
    }
}

impl Curve {
    pub fn new(points: Vec<Vec3>, looped: bool) -> Self {
        let mut curve = Self::default();
        curve.rebuild(points, looped);
        curve
    }

    /// Up direction that seeds the first edge's frame; later edges inherit it by transport.
    pub fn reference_up(&self) -> Vec3 {
        self.reference_up
    }

    /// Takes effect at the next rebuild. A zero vector falls back to +Y.
    pub fn set_reference_up(&mut self, up: Vec3) {
        self.reference_up = up.normalize_or(Vec3::Y);
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn edges(&self) -> &[CurveEdge] {
        &self.edges
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Whether the curve has at least one usable edge.
    pub fn is_usable(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Discards the edge list and rebuilds it from `points`. Returns the number of usable edges.
    ///
    /// Edges shorter than [`MIN_EDGE_LENGTH`] are skipped; the rest keep their frames continuous.
    pub fn rebuild(&mut self, points: Vec<Vec3>, looped: bool) -> usize {
        self.points = points;
        self.looped = looped;
        self.edges.clear();
        self.length = 0.0;

        let count = self.points.len();
        if count < 2 {
            debug!("curve rebuild with {count} point(s): no edges");
            return 0;
        }

        let segment_count = if looped { count } else { count - 1 };
        let mut previous: Option<Frame> = None;
        for start in 0..segment_count {
            let end = (start + 1) % count;
            let a = self.points[start];
            let b = self.points[end];
            let delta = b - a;
            let length = delta.length();
            if length < MIN_EDGE_LENGTH {
                if !(looped && start == count - 1 && length == 0.0) {
                    warn!("skipping degenerate curve edge {start} -> {end} (length {length})");
                }
                continue;
            }
            let direction = delta / length;

            let frame = match previous {
                None => Frame::from_front_up(direction, self.reference_up, a),
                Some(prev) => {
                    let turn = Quat::from_rotation_arc(prev.front(), direction);
                    prev.rotated(turn).with_origin(a).orthonormalized()
                }
            };

            self.edges.push(CurveEdge {
                length,
                start_distance: self.length,
                start,
                end,
                frame,
            });
            self.length += length;
            previous = Some(frame);
        }

        if self.edges.is_empty() {
            warn!("curve rebuild produced no usable edges from {count} points");
        }
        self.edges.len()
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.edges.is_empty() {
            return Err(JointError::DegenerateGeometry(
                "curve needs at least two distinct points",
            ));
        }
        Ok(())
    }

    /// Frame at arclength `distance`.
    ///
    /// Open curves clamp to `[0, length]` and report the clamp delta as overpass; looped curves
    /// wrap modulo the total length.
    pub fn locate_by_distance(&self, distance: f32) -> Result<CurveLocation> {
        self.ensure_usable()?;

        let (target, overpass) = if self.looped {
            (distance.rem_euclid(self.length), 0.0)
        } else {
            let clamped = distance.clamp(0.0, self.length);
            (clamped, distance - clamped)
        };

        let edge_index = self.edge_index_at(target);
        let edge = &self.edges[edge_index];
        let residual = (target - edge.start_distance).clamp(0.0, edge.length);
        Ok(CurveLocation {
            frame: edge
                .frame
                .with_origin(edge.start_point() + edge.direction() * residual),
            distance: edge.start_distance + residual,
            overpass,
            edge: edge_index,
        })
    }

    /// Closest point on the whole curve to `point`.
    ///
    /// At a vertex shared by two edges the frame is blended between both edges' frames according
    /// to where `point` sits in the corner, so it varies continuously across the vertex.
    pub fn locate_by_point(&self, point: Vec3) -> Result<CurveLocation> {
        self.ensure_usable()?;

        let mut best = self.project(0, point);
        for index in 1..self.edges.len() {
            let candidate = self.project(index, point);
            if candidate.distance_squared < best.distance_squared {
                best = candidate;
            }
        }

        let mut location = self.finish(best, point);
        location.overpass = 0.0;
        Ok(location)
    }

    /// Per-tick query of a live slider: closest point near the previously known arclength.
    ///
    /// The edge holding `last_distance` is kept as long as `point` still projects onto it. When it
    /// does not, the search walks outward from that edge in both directions, each direction only
    /// continuing while the distance keeps shrinking, so the result never jumps to a remote part of
    /// the path that happens to pass close by. On loops a step is only taken while the candidate
    /// still lies the shorter way round in the walking direction. Open curves treat their ends as
    /// hard stops.
    pub fn locate_near_previous(&self, last_distance: f32, point: Vec3) -> Result<CurveLocation> {
        self.ensure_usable()?;

        let start_distance = if self.looped {
            last_distance.rem_euclid(self.length)
        } else {
            last_distance.clamp(0.0, self.length)
        };
        let current = self.edge_index_at(start_distance);
        let incumbent = self.project(current, point);
        if incumbent.is_interior(self.edges[current].length) {
            return Ok(self.finish(incumbent, point));
        }

        let count = self.edges.len();
        let mut backward = incumbent;
        let mut forward = incumbent;
        let mut backward_alive = true;
        let mut forward_alive = true;

        for step in 1..count {
            if backward_alive {
                backward_alive = self.advance_search(
                    &mut backward,
                    current,
                    -(step as isize),
                    start_distance,
                    point,
                );
            }
            if forward_alive {
                forward_alive =
                    self.advance_search(&mut forward, current, step as isize, start_distance, point);
            }
            if !backward_alive && !forward_alive {
                break;
            }
        }

        let chosen = if (backward.distance_squared - forward.distance_squared).abs()
            <= SEARCH_EPSILON
        {
            let back_gap = self.separation(start_distance, self.projection_distance(&backward));
            let front_gap = self.separation(start_distance, self.projection_distance(&forward));
            if back_gap < front_gap {
                backward
            } else {
                forward
            }
        } else if backward.distance_squared < forward.distance_squared {
            backward
        } else {
            forward
        };

        Ok(self.finish(chosen, point))
    }

    /// One step of the outward walk: the neighbor `offset` edges from `origin` replaces `best` if
    /// it is strictly closer to `point`. On loops it must also lie on the walking side of
    /// `start_distance` when measured the shorter way round, so a walk never wraps past the half
    /// of the loop behind it. Returns whether the walk in this direction goes on.
    fn advance_search(
        &self,
        best: &mut Projection,
        origin: usize,
        offset: isize,
        start_distance: f32,
        point: Vec3,
    ) -> bool {
        let Some(index) = self.neighbor(origin, offset) else {
            return false;
        };
        let candidate = self.project(index, point);
        if candidate.distance_squared >= best.distance_squared - SEARCH_EPSILON {
            return false;
        }
        if self.looped {
            let travelled =
                self.signed_separation(start_distance, self.projection_distance(&candidate));
            if travelled * (offset.signum() as f32) < 0.0 {
                return false;
            }
        }
        *best = candidate;
        true
    }

    /// Relocates a pin frame onto the curve point nearest to the child.
    ///
    /// Both frames are expressed in the curve's space. The returned pin keeps the curve's frame at
    /// that point: origin on the curve, front along the tangent.
    pub fn adjust_pin_to_curve(&self, child_frame: &Frame, pin_frame: &Frame) -> Result<Frame> {
        match self.locate_by_point(child_frame.origin) {
            Ok(location) => Ok(location.frame),
            Err(err) => {
                debug!("pin left at {:?}: {err}", pin_frame.origin);
                Err(err)
            }
        }
    }

    /// Arclength between two positions, the shorter way round on loops.
    pub fn separation(&self, a: f32, b: f32) -> f32 {
        let direct = (a - b).abs();
        if self.looped && self.length > 0.0 {
            let wrapped = direct.rem_euclid(self.length);
            wrapped.min(self.length - wrapped)
        } else {
            direct
        }
    }

    /// Signed arclength travelled from `from` to `to`, taking the shorter way round on loops.
    pub fn signed_separation(&self, from: f32, to: f32) -> f32 {
        let delta = to - from;
        if self.looped && self.length > 0.0 {
            let half = 0.5 * self.length;
            (delta + half).rem_euclid(self.length) - half
        } else {
            delta
        }
    }

    fn edge_index_at(&self, distance: f32) -> usize {
        let mut index = 0;
        for (i, edge) in self.edges.iter().enumerate() {
            index = i;
            if distance < edge.end_distance() {
                break;
            }
        }
        index
    }

    fn neighbor(&self, index: usize, offset: isize) -> Option<usize> {
        let count = self.edges.len() as isize;
        let target = index as isize + offset;
        if self.looped {
            Some(target.rem_euclid(count) as usize)
        } else if (0..count).contains(&target) {
            Some(target as usize)
        } else {
            None
        }
    }

    fn project(&self, index: usize, point: Vec3) -> Projection {
        let edge = &self.edges[index];
        let along = (point - edge.start_point()).dot(edge.direction());
        let clamped = along.clamp(0.0, edge.length);
        let on_edge = edge.start_point() + edge.direction() * clamped;
        Projection {
            edge: index,
            along,
            clamped,
            point: on_edge,
            distance_squared: on_edge.distance_squared(point),
        }
    }

    fn projection_distance(&self, projection: &Projection) -> f32 {
        self.edges[projection.edge].start_distance + projection.clamped
    }

    fn finish(&self, projection: Projection, query: Vec3) -> CurveLocation {
        let edge = &self.edges[projection.edge];
        let last = self.edges.len() - 1;

        let mut overpass = 0.0;
        if !self.looped {
            if projection.edge == 0 && projection.along < 0.0 {
                overpass = projection.along;
            } else if projection.edge == last && projection.along > edge.length {
                overpass = projection.along - edge.length;
            }
        }

        let at_start = projection.clamped <= 0.0;
        let at_end = projection.clamped >= edge.length;
        let blended = if at_start {
            self.neighbor(projection.edge, -1)
                .filter(|&prev| prev != projection.edge)
                .and_then(|prev| {
                    blend_corner(&self.edges[prev], edge, projection.point, query)
                })
        } else if at_end {
            self.neighbor(projection.edge, 1)
                .filter(|&next| next != projection.edge)
                .and_then(|next| {
                    blend_corner(edge, &self.edges[next], projection.point, query)
                })
        } else {
            None
        };

        CurveLocation {
            frame: blended.unwrap_or_else(|| edge.frame.with_origin(projection.point)),
            distance: self.projection_distance(&projection),
            overpass,
            edge: projection.edge,
        }
    }
}

/// Frame at the vertex between `incoming` and `outgoing` for a query point in the outer corner.
///
/// The incoming frame is rotated about the axis perpendicular to both edges by the fraction of
/// the turn that `query` has swept through, reaching the outgoing frame at the far boundary.
fn blend_corner(
    incoming: &CurveEdge,
    outgoing: &CurveEdge,
    vertex: Vec3,
    query: Vec3,
) -> Option<Frame> {
    let f1 = incoming.direction();
    let f2 = outgoing.direction();
    let offset = query - vertex;
    let past_incoming = offset.dot(f1);
    let before_outgoing = offset.dot(f2);
    if past_incoming <= 0.0 || before_outgoing >= 0.0 {
        return None;
    }

    let normal = f1.cross(f2);
    if normal.length_squared() < 1.0e-10 {
        return None;
    }
    let turn = f1.dot(f2).clamp(-1.0, 1.0).acos();
    let weight = past_incoming / (past_incoming - before_outgoing);
    let rotation = Quat::from_axis_angle(normal.normalize(), turn * weight);
    Some(incoming.frame.rotated(rotation).with_origin(vertex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn l_shape() -> Curve {
        Curve::new(
            vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 3.0)],
            false,
        )
    }

    #[test]
    fn rebuild_accumulates_lengths() {
        let curve = l_shape();
        assert_eq!(curve.edges().len(), 2);
        assert_relative_eq!(curve.length(), 5.0, epsilon = 1.0e-6);
        assert_relative_eq!(curve.edges()[1].start_distance, 2.0, epsilon = 1.0e-6);
    }

    #[test]
    fn degenerate_edges_are_skipped() {
        let curve = Curve::new(
            vec![Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::X, Vec3::new(1.0, 1.0, 0.0)],
            false,
        );
        assert_eq!(curve.edges().len(), 2);
        assert_relative_eq!(curve.length(), 2.0, epsilon = 1.0e-6);
    }

    #[test]
    fn single_point_curve_is_unusable() {
        let curve = Curve::new(vec![Vec3::ONE], false);
        assert!(!curve.is_usable());
        assert!(matches!(
            curve.locate_by_distance(0.0),
            Err(JointError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn parallel_transport_keeps_up_axis_on_planar_turn() {
        let curve = l_shape();
        let first = curve.edges()[0].frame;
        let second = curve.edges()[1].frame;
        // Turning within the XZ plane rotates about Y, so up stays put.
        assert!(first.up().abs_diff_eq(second.up(), 1.0e-5));
        assert!(second.front().abs_diff_eq(Vec3::Z, 1.0e-5));
    }

    #[test]
    fn distance_queries_clamp_on_open_curves() {
        let curve = l_shape();
        let before = curve.locate_by_distance(-1.5).unwrap();
        assert_relative_eq!(before.overpass, -1.5, epsilon = 1.0e-6);
        assert!(before.point().abs_diff_eq(Vec3::ZERO, 1.0e-6));

        let after = curve.locate_by_distance(6.0).unwrap();
        assert_relative_eq!(after.overpass, 1.0, epsilon = 1.0e-6);
        assert!(after.point().abs_diff_eq(Vec3::new(2.0, 0.0, 3.0), 1.0e-5));

        let middle = curve.locate_by_distance(3.0).unwrap();
        assert_eq!(middle.edge, 1);
        assert!(middle.point().abs_diff_eq(Vec3::new(2.0, 0.0, 1.0), 1.0e-5));
    }

    #[test]
    fn distance_queries_wrap_on_loops() {
        let square = Curve::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::Z,
            ],
            true,
        );
        assert_relative_eq!(square.length(), 4.0, epsilon = 1.0e-6);
        let wrapped = square.locate_by_distance(4.5).unwrap();
        assert_relative_eq!(wrapped.distance, 0.5, epsilon = 1.0e-5);
        assert_eq!(wrapped.overpass, 0.0);
        let negative = square.locate_by_distance(-0.5).unwrap();
        assert_relative_eq!(negative.distance, 3.5, epsilon = 1.0e-5);
    }

    #[test]
    fn corner_frame_blends_continuously() {
        let curve = l_shape();
        let vertex = Vec3::new(2.0, 0.0, 0.0);
        // Query points sweep around the outer side of the corner.
        let near_incoming = curve
            .locate_by_point(vertex + Vec3::new(1.0e-3, 0.0, -1.0))
            .unwrap();
        let diagonal = curve.locate_by_point(vertex + Vec3::new(1.0, 0.0, -1.0)).unwrap();
        let near_outgoing = curve
            .locate_by_point(vertex + Vec3::new(1.0, 0.0, -1.0e-3))
            .unwrap();

        assert!(near_incoming.tangent().abs_diff_eq(Vec3::X, 1.0e-2));
        assert!(near_outgoing.tangent().abs_diff_eq(Vec3::Z, 1.0e-2));
        let halfway = Vec3::new(1.0, 0.0, 1.0).normalize();
        assert!(diagonal.tangent().abs_diff_eq(halfway, 1.0e-4));
        assert!(diagonal.point().abs_diff_eq(vertex, 1.0e-6));
    }

    #[test]
    fn near_previous_ignores_distant_fold() {
        // A hairpin: the return leg passes 0.2 away from the outgoing leg.
        let curve = Curve::new(
            vec![
                Vec3::ZERO,
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(10.0, 0.0, 0.2),
                Vec3::new(0.0, 0.0, 0.2),
            ],
            false,
        );
        // Slightly closer to the return leg, but the slider was last on the first leg.
        let sample = Vec3::new(5.0, 0.0, 0.11);
        let global = curve.locate_by_point(sample).unwrap();
        assert_eq!(global.edge, 2);

        let tracked = curve.locate_near_previous(5.0, sample).unwrap();
        assert_eq!(tracked.edge, 0);
        assert_relative_eq!(tracked.distance, 5.0, epsilon = 1.0e-5);
    }

    #[test]
    fn near_previous_reports_open_end_overpass() {
        let curve = l_shape();
        let location = curve
            .locate_near_previous(4.9, Vec3::new(2.0, 0.0, 3.4))
            .unwrap();
        assert_eq!(location.edge, 1);
        assert_relative_eq!(location.overpass, 0.4, epsilon = 1.0e-5);
        assert_relative_eq!(location.distance, 5.0, epsilon = 1.0e-5);
    }

    #[test]
    fn adjust_pin_moves_onto_curve() {
        let curve = l_shape();
        let child = Frame::from_translation(Vec3::new(1.0, 0.5, 0.0));
        let pin = curve.adjust_pin_to_curve(&child, &Frame::IDENTITY).unwrap();
        assert!(pin.origin.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1.0e-6));
        assert!(pin.front().abs_diff_eq(Vec3::X, 1.0e-6));
    }
}
