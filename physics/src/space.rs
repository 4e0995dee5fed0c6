use crate::{
    arena::{Arena, GeomHandle},
    broadphase::{brute_force, sweep_and_prune, CollisionPair, Proxy},
    config::BroadPhaseKind,
    geom::Geom,
    shapes::Shape,
};
use std::collections::BTreeSet;

/// Broad-phase index over the enabled geometries of a world.
#[derive(Clone, Debug, Default)]
pub struct Space {
    kind: BroadPhaseKind,
    members: BTreeSet<GeomHandle>,
}

impl Space {
    pub fn new(kind: BroadPhaseKind) -> Self {
        Self {
            kind,
            members: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> BroadPhaseKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BroadPhaseKind) {
        self.kind = kind;
    }

    /// Returns false if the geometry was already a member.
    pub fn insert(&mut self, geom: GeomHandle) -> bool {
        self.members.insert(geom)
    }

    pub fn remove(&mut self, geom: GeomHandle) -> bool {
        self.members.remove(&geom)
    }

    pub fn contains(&self, geom: GeomHandle) -> bool {
        self.members.contains(&geom)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = GeomHandle> + '_ {
        self.members.iter().copied()
    }

    /// Every pair of members whose bounds overlap, excluding pairs of two static geometries.
    ///
    /// Uses the bounds cached on each geometry, so poses must be synced before calling this.
    pub fn collide(&self, geoms: &Arena<Geom>) -> Vec<CollisionPair> {
        let proxies: Vec<Proxy> = self
            .members
            .iter()
            .filter_map(|&handle| {
                let geom = geoms.get(handle)?;
                if !geom.is_enabled() {
                    return None;
                }
                let plane = match geom.shape() {
                    Shape::Plane(plane) => Some((plane.normal(), plane.offset())),
                    _ => None,
                };
                Some(Proxy {
                    handle,
                    bounds: *geom.bounds(),
                    plane,
                    is_static: geom.body().is_none(),
                })
            })
            .collect();

        let pairs = match self.kind {
            BroadPhaseKind::SweepAndPrune => sweep_and_prune(&proxies),
            BroadPhaseKind::BruteForce => brute_force(&proxies),
        };
        tracing::trace!(
            "space: {} proxies, {} candidate pairs",
            proxies.len(),
            pairs.len()
        );
        pairs
    }
}

#[cfg(test)]
mod test {
    use super::Space;
    use crate::{
        arena::Arena,
        body::Body,
        broadphase::CollisionPair,
        config::BroadPhaseKind,
        geom::Geom,
        math::Pose,
        shapes::Shape,
    };
    use glam::Vec3;
    use rand::{seq::SliceRandom, Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn random_geoms(rng: &mut Pcg32, count: usize) -> Vec<(Geom, bool)> {
        (0..count)
            .map(|_| {
                let shape = match rng.gen_range(0..3) {
                    0 => Shape::make_sphere(rng.gen_range(0.1..1.0)).unwrap(),
                    1 => Shape::make_box(Vec3::splat(rng.gen_range(0.2..1.5))).unwrap(),
                    _ => Shape::make_capsule(0.2, rng.gen_range(0.0..1.0)).unwrap(),
                };
                let position = Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-1.0..5.0),
                );
                let dynamic = rng.gen_bool(0.7);
                (Geom::new(shape).with_pose(Pose::from_position(position)), dynamic)
            })
            .collect()
    }

    /// Builds a space from `geoms` inserted in `order`, returning pairs as indices into `geoms`.
    fn pairs_in_order(
        geoms: &[(Geom, bool)],
        order: &[usize],
        kind: BroadPhaseKind,
    ) -> Vec<(usize, usize)> {
        // any body handle marks a geometry as dynamic for the broad phase
        let mut bodies = Arena::new();
        let body = bodies.insert(Body::default());

        let mut arena = Arena::new();
        let mut space = Space::new(kind);
        let mut ids = Vec::new();
        for &i in order {
            let (mut geom, dynamic) = geoms[i].clone();
            if dynamic {
                geom.body = Some(body);
            }
            let handle = arena.insert(geom);
            space.insert(handle);
            ids.push((handle, i));
        }
        let id_of = |handle| {
            ids.iter()
                .find(|(h, _)| *h == handle)
                .map(|(_, i)| *i)
                .unwrap()
        };
        let mut pairs: Vec<(usize, usize)> = space
            .collide(&arena)
            .into_iter()
            .map(|CollisionPair { a, b }| {
                let (a, b) = (id_of(a), id_of(b));
                (a.min(b), a.max(b))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn test_sweep_and_prune_matches_brute_force() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut geoms = random_geoms(&mut rng, 60);
        geoms.push((
            Geom::new(Shape::make_plane(Vec3::Z, 0.0).unwrap()),
            false,
        ));
        let order: Vec<usize> = (0..geoms.len()).collect();
        let sap = pairs_in_order(&geoms, &order, BroadPhaseKind::SweepAndPrune);
        let brute = pairs_in_order(&geoms, &order, BroadPhaseKind::BruteForce);
        assert!(!sap.is_empty());
        assert_eq!(sap, brute);
    }

    #[test]
    fn test_insertion_order_independent() {
        let mut rng = Pcg32::seed_from_u64(11);
        let geoms = random_geoms(&mut rng, 40);
        let order: Vec<usize> = (0..geoms.len()).collect();
        let expected = pairs_in_order(&geoms, &order, BroadPhaseKind::SweepAndPrune);
        for _ in 0..5 {
            let mut shuffled = order.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(
                pairs_in_order(&geoms, &shuffled, BroadPhaseKind::SweepAndPrune),
                expected
            );
        }
    }

    #[test]
    fn test_static_pairs_and_disabled_skipped() {
        let mut arena = Arena::new();
        let mut space = Space::default();
        let a = arena.insert(Geom::new(Shape::make_sphere(1.0).unwrap()));
        let b = arena.insert(Geom::new(Shape::make_sphere(1.0).unwrap()));
        let ground = arena.insert(Geom::new(Shape::make_plane(Vec3::Z, 0.0).unwrap()));
        space.insert(a);
        space.insert(b);
        space.insert(ground);
        assert!(space.collide(&arena).is_empty());

        let mut bodies = Arena::new();
        arena.get_mut(a).unwrap().body = Some(bodies.insert(Body::default()));
        assert_eq!(
            space.collide(&arena),
            vec![CollisionPair::new(a, b), CollisionPair::new(a, ground)]
        );

        arena.get_mut(b).unwrap().enabled = false;
        assert_eq!(space.collide(&arena), vec![CollisionPair::new(a, ground)]);
        assert!(space.remove(ground));
        assert!(space.collide(&arena).is_empty());
    }
}
