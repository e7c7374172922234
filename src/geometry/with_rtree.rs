use rstar::{primitives::GeomWithData, RTree, RTreeObject, AABB};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub aabb: AABB<[i64; 3]>,
}

impl Bbox {
    pub fn new(aabb: AABB<[i64; 3]>) -> Bbox {
        Self { aabb }
    }
}

impl RTreeObject for Bbox {
    type Envelope = AABB<[i64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub type BboxedIndex<I> = GeomWithData<Bbox, I>;

/// R-tree over layered bounding boxes. The third coordinate is the layer, so an entry spanning
/// several layers (a via, a through-hole pad) covers all of them.
#[derive(Debug, Clone)]
pub struct RtreeIndex<I: Copy + PartialEq> {
    rtree: RTree<BboxedIndex<I>>,
}

impl<I: Copy + PartialEq> Default for RtreeIndex<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy + PartialEq> RtreeIndex<I> {
    pub fn new() -> Self {
        Self {
            rtree: RTree::new(),
        }
    }

    pub fn insert(&mut self, aabb: AABB<[i64; 3]>, data: I) {
        self.rtree.insert(BboxedIndex::new(Bbox::new(aabb), data));
    }

    /// Removes the entry, which must be given with the same envelope it was inserted with.
    pub fn remove(&mut self, aabb: AABB<[i64; 3]>, data: I) -> bool {
        self.rtree
            .remove(&BboxedIndex::new(Bbox::new(aabb), data))
            .is_some()
    }

    pub fn locate_in_envelope_intersecting<'a>(
        &'a self,
        envelope: &'a AABB<[i64; 3]>,
    ) -> impl Iterator<Item = I> + 'a {
        self.rtree
            .locate_in_envelope_intersecting(envelope)
            .map(|wrapper| wrapper.data)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AABB<[i64; 3]>, I)> + '_ {
        self.rtree
            .iter()
            .map(|wrapper| (&wrapper.geom().aabb, wrapper.data))
    }

    pub fn size(&self) -> usize {
        self.rtree.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_are_separate() {
        let mut index = RtreeIndex::new();
        index.insert(AABB::from_corners([0, 0, 0], [10, 10, 0]), 1u32);
        index.insert(AABB::from_corners([0, 0, 1], [10, 10, 1]), 2u32);
        index.insert(AABB::from_corners([0, 0, 0], [10, 10, 1]), 3u32);

        let on_top: Vec<u32> = index
            .locate_in_envelope_intersecting(&AABB::from_corners([5, 5, 0], [6, 6, 0]))
            .collect();
        assert!(on_top.contains(&1));
        assert!(!on_top.contains(&2));
        assert!(on_top.contains(&3));

        assert!(index.remove(AABB::from_corners([0, 0, 0], [10, 10, 0]), 1));
        assert!(!index.remove(AABB::from_corners([0, 0, 0], [10, 10, 0]), 1));
        assert_eq!(index.size(), 2);
    }
}
