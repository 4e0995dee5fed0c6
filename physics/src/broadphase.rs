use crate::{arena::GeomHandle, bounds::Bounds};
use glam::Vec3;
use std::cmp::Ordering;

/// Candidate pair of geometries. `a` always has the lower slot index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionPair {
    pub a: GeomHandle,
    pub b: GeomHandle,
}

impl CollisionPair {
    pub fn new(a: GeomHandle, b: GeomHandle) -> Self {
        if b < a {
            Self { a: b, b: a }
        } else {
            Self { a, b }
        }
    }
}

/// What the broad phase needs to know about a geometry.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Proxy {
    pub handle: GeomHandle,
    pub bounds: Bounds,
    /// Normal and offset of a half-space, planes are not swept.
    pub plane: Option<(Vec3, f32)>,
    /// Static geometries have no body and never move.
    pub is_static: bool,
}

#[derive(Copy, Clone, Debug)]
struct PseudoBody {
    proxy: usize,
    value: f32,
    is_min: bool,
}

// total order so that equal values still sort the same regardless of insertion order
fn compare_sap(a: &PseudoBody, b: &PseudoBody, proxies: &[Proxy]) -> Ordering {
    a.value
        .total_cmp(&b.value)
        .then_with(|| b.is_min.cmp(&a.is_min))
        .then_with(|| proxies[a.proxy].handle.cmp(&proxies[b.proxy].handle))
}

fn sort_proxy_bounds(proxies: &[Proxy]) -> Vec<PseudoBody> {
    let mut sorted = Vec::with_capacity(proxies.len() * 2);

    let axis = Vec3::ONE.normalize();
    for (i, proxy) in proxies.iter().enumerate() {
        if proxy.plane.is_some() {
            continue;
        }
        sorted.push(PseudoBody {
            proxy: i,
            value: axis.dot(proxy.bounds.mins),
            is_min: true,
        });
        sorted.push(PseudoBody {
            proxy: i,
            value: axis.dot(proxy.bounds.maxs),
            is_min: false,
        });
    }

    sorted.sort_unstable_by(|a, b| compare_sap(a, b, proxies));

    sorted
}

fn wants_pair(a: &Proxy, b: &Proxy) -> bool {
    !(a.is_static && b.is_static)
}

fn plane_reaches(plane: (Vec3, f32), bounds: &Bounds) -> bool {
    let (normal, offset) = plane;
    bounds.min_along(normal) <= offset
}

fn plane_pairs(proxies: &[Proxy], pairs: &mut Vec<CollisionPair>) {
    for plane in proxies.iter() {
        let Some(half_space) = plane.plane else {
            continue;
        };
        for other in proxies.iter() {
            if other.plane.is_some() || !wants_pair(plane, other) {
                continue;
            }
            if plane_reaches(half_space, &other.bounds) {
                pairs.push(CollisionPair::new(plane.handle, other.handle));
            }
        }
    }
}

fn finish(mut pairs: Vec<CollisionPair>) -> Vec<CollisionPair> {
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// Sweeps sorted bound endpoints along the (1, 1, 1) diagonal, then confirms each overlap on all
/// three axes.
pub(crate) fn sweep_and_prune(proxies: &[Proxy]) -> Vec<CollisionPair> {
    let sorted = sort_proxy_bounds(proxies);
    let mut pairs = Vec::new();

    for i in 0..sorted.len() {
        let a = &sorted[i];
        if !a.is_min {
            continue;
        }

        for b in &sorted[(i + 1)..] {
            // reached the end of a, no later interval can overlap it
            if b.proxy == a.proxy {
                break;
            }

            if !b.is_min {
                continue;
            }

            let (proxy_a, proxy_b) = (&proxies[a.proxy], &proxies[b.proxy]);
            if wants_pair(proxy_a, proxy_b) && proxy_a.bounds.intersects(&proxy_b.bounds) {
                pairs.push(CollisionPair::new(proxy_a.handle, proxy_b.handle));
            }
        }
    }

    plane_pairs(proxies, &mut pairs);
    finish(pairs)
}

/// Tests every pair, used as the reference for [`sweep_and_prune`].
pub(crate) fn brute_force(proxies: &[Proxy]) -> Vec<CollisionPair> {
    let mut pairs = Vec::new();
    for (i, a) in proxies.iter().enumerate() {
        if a.plane.is_some() {
            continue;
        }
        for b in &proxies[(i + 1)..] {
            if b.plane.is_some() || !wants_pair(a, b) {
                continue;
            }
            if a.bounds.intersects(&b.bounds) {
                pairs.push(CollisionPair::new(a.handle, b.handle));
            }
        }
    }
    plane_pairs(proxies, &mut pairs);
    finish(pairs)
}
