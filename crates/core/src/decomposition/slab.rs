//! Vertical slab decomposition
//!
//! The global vertical extent `nz_tot` (counted in w-planes) is split into
//! `nproc` slabs that overlap by one plane: local plane `nz` of rank `r` is the
//! same physical plane as local plane `1` of rank `r + 1`. Each slab therefore
//! stores `(nz_tot - 1) / nproc + 1` planes above its ghost plane.

use crate::error::{ForcingError, ForcingResult};
use serde::{Deserialize, Serialize};

/// Position of one slab in the decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabPosition {
    /// Rank of this slab, counted from the bottom
    pub rank: usize,
    /// Total number of slabs
    pub nproc: usize,
}

impl SlabPosition {
    /// Single-slab run: the slab owns both physical boundaries
    #[must_use]
    pub const fn serial() -> Self {
        Self { rank: 0, nproc: 1 }
    }

    /// Which physical edges this slab is responsible for
    #[must_use]
    pub const fn ownership(&self) -> BoundaryOwnership {
        BoundaryOwnership {
            bottom: self.rank == 0,
            top: self.rank + 1 == self.nproc,
        }
    }

    /// Check that the rank lies inside the decomposition
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InvalidConfig`] for `nproc == 0` or
    /// `rank >= nproc`.
    pub fn validate(&self) -> ForcingResult<()> {
        if self.nproc == 0 {
            return Err(ForcingError::config("nproc", "must be positive"));
        }
        if self.rank >= self.nproc {
            return Err(ForcingError::config(
                "rank",
                format!("rank {} outside decomposition of {}", self.rank, self.nproc),
            ));
        }
        Ok(())
    }
}

impl Default for SlabPosition {
    fn default() -> Self {
        Self::serial()
    }
}

/// Physical boundaries owned by a slab, derived once from its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundaryOwnership {
    /// Slab holds the global bottom plane (`k = 1`)
    pub bottom: bool,
    /// Slab holds the global top plane (`k = nz`)
    pub top: bool,
}

/// Extent of one slab within the global vertical grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabExtent {
    /// Position of the slab
    pub position: SlabPosition,
    /// Local top-plane index; the slab stores planes `0..=nz`
    pub nz: usize,
    /// Global index of local plane `0`
    pub k_offset: usize,
}

impl SlabExtent {
    /// Global plane index of local plane `k`
    #[must_use]
    pub const fn global_k(&self, k: usize) -> usize {
        self.k_offset + k
    }
}

/// Split `nz_tot` global planes across `nproc` overlapping slabs
///
/// # Errors
///
/// Returns [`ForcingError::Decomposition`] when `nproc` is zero, when
/// `nz_tot - 1` is not divisible by `nproc`, or when a slab would have fewer
/// than two planes above its ghost.
pub fn decompose_z(nz_tot: usize, nproc: usize) -> ForcingResult<Vec<SlabExtent>> {
    if nproc == 0 {
        return Err(ForcingError::Decomposition(
            "decomposition requires nproc >= 1".to_string(),
        ));
    }
    if nz_tot < 2 {
        return Err(ForcingError::Decomposition(format!(
            "decomposition requires nz_tot >= 2, got {nz_tot}"
        )));
    }
    if (nz_tot - 1) % nproc != 0 {
        return Err(ForcingError::Decomposition(format!(
            "nz_tot - 1 = {} is not divisible by nproc = {nproc}",
            nz_tot - 1
        )));
    }

    let nz = (nz_tot - 1) / nproc + 1;
    if nz < 2 {
        return Err(ForcingError::Decomposition(format!(
            "cannot split nz_tot={nz_tot} across nproc={nproc}: slabs would hold {nz} plane(s)"
        )));
    }

    Ok((0..nproc)
        .map(|rank| SlabExtent {
            position: SlabPosition { rank, nproc },
            nz,
            k_offset: rank * (nz - 1),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_owns_both_edges() {
        let own = SlabPosition::serial().ownership();
        assert!(own.top && own.bottom);
    }

    #[test]
    fn test_ownership_is_unique() {
        let nproc = 4;
        let owners: Vec<_> = (0..nproc)
            .map(|rank| SlabPosition { rank, nproc }.ownership())
            .collect();
        assert_eq!(owners.iter().filter(|o| o.bottom).count(), 1);
        assert_eq!(owners.iter().filter(|o| o.top).count(), 1);
        assert!(owners[0].bottom);
        assert!(owners[3].top);
    }

    #[test]
    fn test_rank_outside_decomposition() {
        let pos = SlabPosition { rank: 2, nproc: 2 };
        assert!(pos.validate().is_err());
    }

    #[test]
    fn test_decompose_z_overlaps_by_one_plane() {
        let slabs = decompose_z(17, 4).expect("17 planes split across 4 slabs");
        assert_eq!(slabs.len(), 4);
        for slab in &slabs {
            assert_eq!(slab.nz, 5);
        }
        // Top plane of one slab is plane 1 of the next
        for pair in slabs.windows(2) {
            assert_eq!(pair[0].global_k(pair[0].nz), pair[1].global_k(1));
            assert_eq!(pair[0].global_k(pair[0].nz - 1), pair[1].global_k(0));
        }
        let last = slabs.last().expect("slab expected");
        assert_eq!(last.global_k(last.nz), 17);
    }

    #[test]
    fn test_decompose_z_rejects_indivisible() {
        let err = decompose_z(16, 4).expect_err("15 planes do not split by 4");
        assert!(matches!(err, ForcingError::Decomposition(_)));
    }
}
