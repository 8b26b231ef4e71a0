//! Douglas-Peucker reduction of the Location track.
//!
//! Distances are planar in geographic degrees: a fix is kept when it lies
//! more than `tolerance` degrees from the chord between the surrounding
//! kept fixes. Only the Location channel is ever simplified.

use geo::{Coord, EuclideanDistance, Line, Point};
use std::collections::HashSet;

use crate::types::{Channel, RecordSet, LOCATION_CHANNEL};

/// Indices of the polyline vertices that survive simplification.
///
/// Endpoints are always kept. A tolerance of zero (or below) keeps every
/// vertex. The split ranges live on an explicit stack so long tracks do not
/// recurse.
pub fn simplify_indices(points: &[Coord<f64>], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 || !(tolerance > 0.0) {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut ranges = vec![(0usize, n - 1)];
    while let Some((first, last)) = ranges.pop() {
        if last - first < 2 {
            continue;
        }

        let chord = Line::new(points[first], points[last]);
        let mut max_dist = 0.0;
        let mut index = first;
        for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
            let dist = Point::from(*p).euclidean_distance(&chord);
            if dist > max_dist {
                max_dist = dist;
                index = i;
            }
        }

        if max_dist > tolerance {
            keep[index] = true;
            ranges.push((first, index));
            ranges.push((index, last));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Replace the Location channel with its simplified track.
///
/// Location records without a usable latitude/longitude are not part of the
/// polyline and pass through unchanged; all other channels are untouched.
pub fn simplify_track(mut set: RecordSet, tolerance: f64) -> RecordSet {
    if tolerance > 0.0 {
        if let Some(channel) = set.channel_mut(LOCATION_CHANNEL) {
            simplify_channel(channel, tolerance);
        }
    }
    set
}

fn simplify_channel(channel: &mut Channel, tolerance: f64) {
    let (fix_indices, coords): (Vec<usize>, Vec<Coord<f64>>) = channel
        .records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            r.position().map(|p| {
                (
                    i,
                    Coord {
                        x: p.longitude,
                        y: p.latitude,
                    },
                )
            })
        })
        .unzip();

    let kept: HashSet<usize> = simplify_indices(&coords, tolerance)
        .into_iter()
        .map(|i| fix_indices[i])
        .collect();
    let fixes: HashSet<usize> = fix_indices.iter().copied().collect();

    let mut index = 0usize;
    channel.records.retain(|_| {
        let keep = !fixes.contains(&index) || kept.contains(&index);
        index += 1;
        keep
    });

    log::debug!(
        "simplify: {} -> {} points with tolerance={}",
        coords.len(),
        kept.len(),
        tolerance
    );
}
