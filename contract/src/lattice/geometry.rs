// SPDX-License-Identifier: AGPL-3.0-only

//! Local lattice geometry: which sites this node owns and where they sit.
//!
//! The contraction only needs three facts from the geometry: the global
//! extents `[Nx, Ny, Nz, Nt]`, the number of sites owned by this node, and
//! the global coordinates of local site `i`. Site ordering and node layout
//! belong to the caller; the contraction works for any of them.
//!
//! Two concrete layouts are provided:
//!
//! - [`LocalLattice`]: one node owns the full lattice.
//! - [`TimeSlab`]: a node owns a contiguous range of time slices, so only
//!   part of the output correlator receives contributions.

/// Site enumeration for the sites owned by this node.
pub trait LocalGeometry: Sync {
    /// Global lattice extents `[Nx, Ny, Nz, Nt]`.
    fn dims(&self) -> [usize; 4];

    /// Number of sites owned by this node.
    fn sites_on_node(&self) -> usize;

    /// Global `[x, y, z, t]` of local site `i`, for `i < sites_on_node()`.
    fn coords(&self, i: usize) -> [usize; 4];

    /// Node (process) identity used in diagnostics.
    fn node(&self) -> usize {
        0
    }

    /// Global time extent `Nt`.
    fn nt(&self) -> usize {
        self.dims()[3]
    }
}

/// A single node owning every site of an `[Nx, Ny, Nz, Nt]` lattice.
///
/// Index order: z fastest, then y, then x, then t (slowest).
/// `idx = t*NxNyNz + x*NyNz + y*Nz + z`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalLattice {
    pub dims: [usize; 4],
}

impl LocalLattice {
    #[must_use]
    pub const fn new(dims: [usize; 4]) -> Self {
        Self { dims }
    }

    /// Total number of lattice sites.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2] * self.dims[3]
    }

    /// Convert 4D coordinates to linear site index.
    #[must_use]
    pub const fn site_index(&self, x: [usize; 4]) -> usize {
        x[3] * (self.dims[0] * self.dims[1] * self.dims[2])
            + x[0] * (self.dims[1] * self.dims[2])
            + x[1] * self.dims[2]
            + x[2]
    }

    /// Convert linear site index to 4D coordinates.
    #[must_use]
    pub const fn site_coords(&self, idx: usize) -> [usize; 4] {
        spatial_then_time(self.dims, idx, 0)
    }
}

impl LocalGeometry for LocalLattice {
    fn dims(&self) -> [usize; 4] {
        self.dims
    }

    fn sites_on_node(&self) -> usize {
        self.volume()
    }

    fn coords(&self, i: usize) -> [usize; 4] {
        self.site_coords(i)
    }
}

/// A node owning time slices `t0 .. t0 + lt` of a global lattice.
///
/// Sites are ordered as in [`LocalLattice`] with the time coordinate offset
/// by `t0`. Time slices outside the slab get no contribution from this node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSlab {
    pub dims: [usize; 4],
    pub t0: usize,
    pub lt: usize,
    pub node: usize,
}

impl TimeSlab {
    /// Slab of `lt` slices starting at `t0`, clipped to the global extent.
    #[must_use]
    pub fn new(dims: [usize; 4], t0: usize, lt: usize, node: usize) -> Self {
        let t0 = t0.min(dims[3]);
        let lt = lt.min(dims[3] - t0);
        Self { dims, t0, lt, node }
    }

    /// Split `[Nx, Ny, Nz, Nt]` into `n_nodes` time slabs, remainder slices
    /// going to the lowest nodes.
    #[must_use]
    pub fn partition(dims: [usize; 4], n_nodes: usize) -> Vec<Self> {
        let n_nodes = n_nodes.max(1);
        let base = dims[3] / n_nodes;
        let extra = dims[3] % n_nodes;
        let mut t0 = 0;
        (0..n_nodes)
            .map(|node| {
                let lt = base + usize::from(node < extra);
                let slab = Self::new(dims, t0, lt, node);
                t0 += lt;
                slab
            })
            .collect()
    }

    /// Time slices owned by this slab.
    #[must_use]
    pub fn time_range(&self) -> std::ops::Range<usize> {
        self.t0..self.t0 + self.lt
    }

    /// Convert global coordinates (t inside the slab) to a local index.
    #[must_use]
    pub const fn site_index(&self, x: [usize; 4]) -> usize {
        (x[3] - self.t0) * (self.dims[0] * self.dims[1] * self.dims[2])
            + x[0] * (self.dims[1] * self.dims[2])
            + x[1] * self.dims[2]
            + x[2]
    }
}

impl LocalGeometry for TimeSlab {
    fn dims(&self) -> [usize; 4] {
        self.dims
    }

    fn sites_on_node(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2] * self.lt
    }

    fn coords(&self, i: usize) -> [usize; 4] {
        spatial_then_time(self.dims, i, self.t0)
    }

    fn node(&self) -> usize {
        self.node
    }
}

const fn spatial_then_time(dims: [usize; 4], idx: usize, t0: usize) -> [usize; 4] {
    let nxyz = dims[0] * dims[1] * dims[2];
    let t = idx / nxyz;
    let rem = idx % nxyz;
    let x0 = rem / (dims[1] * dims[2]);
    let rem2 = rem % (dims[1] * dims[2]);
    let x1 = rem2 / dims[2];
    let x2 = rem2 % dims[2];
    [x0, x1, x2, t + t0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_index_roundtrip() {
        let lat = LocalLattice::new([4, 3, 2, 5]);
        for idx in 0..lat.volume() {
            assert_eq!(lat.site_index(lat.site_coords(idx)), idx);
        }
    }

    #[test]
    fn z_runs_fastest() {
        let lat = LocalLattice::new([4, 4, 4, 8]);
        assert_eq!(lat.coords(1), [0, 0, 1, 0]);
        assert_eq!(lat.coords(4), [0, 1, 0, 0]);
        assert_eq!(lat.coords(16), [1, 0, 0, 0]);
        assert_eq!(lat.coords(64), [0, 0, 0, 1]);
    }

    #[test]
    fn slab_offsets_time() {
        let slab = TimeSlab::new([2, 2, 2, 8], 3, 2, 1);
        assert_eq!(slab.sites_on_node(), 16);
        assert_eq!(slab.coords(0)[3], 3);
        assert_eq!(slab.coords(15)[3], 4);
        assert_eq!(slab.node(), 1);
        assert_eq!(slab.nt(), 8);
        for i in 0..slab.sites_on_node() {
            assert_eq!(slab.site_index(slab.coords(i)), i);
        }
    }

    #[test]
    fn slab_clipped_to_extent() {
        let slab = TimeSlab::new([2, 2, 2, 4], 3, 10, 0);
        assert_eq!(slab.time_range(), 3..4);
        let empty = TimeSlab::new([2, 2, 2, 4], 9, 2, 0);
        assert_eq!(empty.sites_on_node(), 0);
    }

    #[test]
    fn partition_covers_every_slice_once() {
        let slabs = TimeSlab::partition([2, 2, 2, 7], 3);
        assert_eq!(slabs.len(), 3);
        let lts: Vec<usize> = slabs.iter().map(|s| s.lt).collect();
        assert_eq!(lts, vec![3, 2, 2]);
        let total: usize = slabs.iter().map(LocalGeometry::sites_on_node).sum();
        assert_eq!(total, 2 * 2 * 2 * 7);
        assert_eq!(slabs[2].time_range(), 5..7);
    }
}
