/// A correspondence between a point in one image and a point in another.
///
/// The order matters for estimation: models fitted on `FeatureMatch(a, b)`
/// map `a` onto `b`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FeatureMatch<P>(pub P, pub P);

/// A pairing of two descriptor indices with their descriptor distance.
///
/// Lower distance means more similar descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorMatch {
    /// Index into the first (query) descriptor set.
    pub query: usize,
    /// Index into the second (train) descriptor set.
    pub train: usize,
    /// Descriptor distance between the two.
    pub distance: u32,
}
