//! Ghost-plane exchange between vertically adjacent slabs
//!
//! Because neighbouring slabs overlap by one plane, an exchange sends plane `1`
//! down (it becomes plane `nz` of the slab below) and plane `nz - 1` up (it
//! becomes plane `0` of the slab above). Every call blocks until the planes it
//! expects have arrived, so all slabs must exchange the same fields in the same
//! order.

use super::slab::SlabPosition;
use crate::error::{ForcingError, ForcingResult};
use crate::grid::Field3;
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::trace;

/// Which ghost planes to refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Send plane `1` down; receive plane `nz` from above
    Down,
    /// Send plane `nz - 1` up; receive plane `0` from below
    Up,
    /// Both directions
    DownUp,
}

impl SyncDirection {
    const fn sends_down(self) -> bool {
        matches!(self, Self::Down | Self::DownUp)
    }

    const fn sends_up(self) -> bool {
        matches!(self, Self::Up | Self::DownUp)
    }
}

/// Synchronous plane exchange with the slabs directly above and below
pub trait HaloExchange: Send {
    /// Position of the local slab
    fn position(&self) -> SlabPosition;

    /// Exchange boundary planes of `field` with the neighbours
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::HaloExchange`] if a neighbour disappeared and
    /// [`ForcingError::ShapeMismatch`] if a received plane has the wrong size.
    fn exchange(&mut self, field: &mut Field3, direction: SyncDirection) -> ForcingResult<()>;
}

/// Exchange for a single slab that owns the whole vertical extent
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialHalo;

impl HaloExchange for SerialHalo {
    fn position(&self) -> SlabPosition {
        SlabPosition::serial()
    }

    fn exchange(&mut self, _field: &mut Field3, _direction: SyncDirection) -> ForcingResult<()> {
        Ok(())
    }
}

/// Channel pair towards one neighbour
#[derive(Debug)]
struct Link {
    tx: Sender<Vec<f64>>,
    rx: Receiver<Vec<f64>>,
}

/// Exchange between slabs running on separate threads
///
/// Build a connected set with [`slab_chain`] and move one endpoint into each
/// slab's thread.
#[derive(Debug)]
pub struct ChannelHalo {
    position: SlabPosition,
    below: Option<Link>,
    above: Option<Link>,
}

/// Connected halo endpoints for `nproc` stacked slabs, ordered by rank
#[must_use]
pub fn slab_chain(nproc: usize) -> Vec<ChannelHalo> {
    let mut halos: Vec<ChannelHalo> = (0..nproc)
        .map(|rank| ChannelHalo {
            position: SlabPosition { rank, nproc },
            below: None,
            above: None,
        })
        .collect();

    for rank in 1..nproc {
        let (up_tx, up_rx) = channel();
        let (down_tx, down_rx) = channel();
        halos[rank - 1].above = Some(Link {
            tx: up_tx,
            rx: down_rx,
        });
        halos[rank].below = Some(Link {
            tx: down_tx,
            rx: up_rx,
        });
    }

    halos
}

impl ChannelHalo {
    fn send(&self, link: &Link, plane: &[f64], towards: &str) -> ForcingResult<()> {
        link.tx
            .send(plane.to_vec())
            .map_err(|_| ForcingError::HaloExchange {
                rank: self.position.rank,
                message: format!("neighbour {towards} disconnected before send"),
            })
    }

    fn receive_into(
        &self,
        link: &Link,
        field: &mut Field3,
        k: usize,
        from: &str,
    ) -> ForcingResult<()> {
        let plane = link.rx.recv().map_err(|_| ForcingError::HaloExchange {
            rank: self.position.rank,
            message: format!("neighbour {from} disconnected before receive"),
        })?;
        let target = field.plane_mut(k);
        if plane.len() != target.len() {
            return Err(ForcingError::ShapeMismatch {
                what: "halo plane",
                expected: target.len(),
                actual: plane.len(),
            });
        }
        target.copy_from_slice(&plane);
        Ok(())
    }
}

impl HaloExchange for ChannelHalo {
    fn position(&self) -> SlabPosition {
        self.position
    }

    fn exchange(&mut self, field: &mut Field3, direction: SyncDirection) -> ForcingResult<()> {
        let nz = field.dims().nz;

        // Post all sends before blocking on receives
        if direction.sends_down() {
            if let Some(below) = &self.below {
                self.send(below, field.plane(1), "below")?;
            }
        }
        if direction.sends_up() {
            if let Some(above) = &self.above {
                self.send(above, field.plane(nz - 1), "above")?;
            }
        }

        if direction.sends_down() {
            if let Some(above) = &self.above {
                self.receive_into(above, field, nz, "above")?;
            }
        }
        if direction.sends_up() {
            if let Some(below) = &self.below {
                self.receive_into(below, field, 0, "below")?;
            }
        }

        trace!(
            "rank {} exchanged {:?} halo planes",
            self.position.rank, direction
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDims;
    use std::thread;

    #[test]
    fn test_serial_exchange_leaves_field_untouched() {
        let dims = GridDims::new(3, 2, 4);
        let mut field = Field3::from_fn(dims, |i, j, k| (i + 10 * j + 100 * k) as f64);
        let before = field.clone();
        SerialHalo
            .exchange(&mut field, SyncDirection::DownUp)
            .expect("serial exchange");
        assert_eq!(field, before);
    }

    #[test]
    fn test_chain_positions() {
        let chain = slab_chain(3);
        let ranks: Vec<_> = chain.iter().map(|h| h.position().rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(chain[0].below.is_none());
        assert!(chain[2].above.is_none());
    }

    #[test]
    fn test_three_slab_exchange_fills_ghost_planes() {
        let dims = GridDims::new(2, 2, 3);
        let chain = slab_chain(3);

        let fields: Vec<Field3> = thread::scope(|s| {
            let handles: Vec<_> = chain
                .into_iter()
                .map(|mut halo| {
                    s.spawn(move || {
                        let rank = halo.position().rank;
                        // Value encodes (rank, plane) so ghost sources are visible
                        let mut field =
                            Field3::from_fn(dims, |_, _, k| (10 * rank + k) as f64);
                        halo.exchange(&mut field, SyncDirection::DownUp)
                            .expect("exchange");
                        field
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("slab thread panicked"))
                .collect()
        });

        // Bottom slab: ghost 0 untouched, top overlap from rank 1 plane 1
        assert!(fields[0].plane(0).iter().all(|&v| v == 0.0));
        assert!(fields[0].plane(3).iter().all(|&v| v == 11.0));
        // Middle slab receives from both sides
        assert!(fields[1].plane(0).iter().all(|&v| v == 2.0));
        assert!(fields[1].plane(3).iter().all(|&v| v == 21.0));
        // Top slab: ghost 0 from rank 1 plane nz-1, top plane untouched
        assert!(fields[2].plane(0).iter().all(|&v| v == 12.0));
        assert!(fields[2].plane(3).iter().all(|&v| v == 23.0));
    }

    #[test]
    fn test_disconnected_neighbour_is_an_error() {
        let dims = GridDims::new(2, 2, 3);
        let mut chain = slab_chain(2);
        let upper = chain.pop().expect("two endpoints");
        let mut lower = chain.pop().expect("two endpoints");
        drop(upper);

        let mut field = Field3::new(dims);
        let err = lower
            .exchange(&mut field, SyncDirection::Up)
            .expect_err("neighbour is gone");
        assert!(matches!(err, ForcingError::HaloExchange { rank: 0, .. }));
    }
}
