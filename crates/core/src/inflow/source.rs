//! Exit-plane velocity sources for file-replay inflow
//!
//! The on-disk precursor format is owned by the host application; this module
//! only defines the plane container, the reader capability, and an in-memory
//! record that replays planes captured from a precursor run.

use crate::error::{ForcingError, ForcingResult};
use serde::{Deserialize, Serialize};

/// One `y-z` velocity plane at a fixed streamwise index
///
/// Covers `j = 0..ny` and `k = 1..=nz`, stored as `(k - 1) * ny + j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflowPlane {
    ny: usize,
    nz: usize,
    /// Streamwise velocity
    pub u: Vec<f64>,
    /// Spanwise velocity
    pub v: Vec<f64>,
    /// Vertical velocity
    pub w: Vec<f64>,
}

impl InflowPlane {
    /// Zero plane for a slab with `ny` spanwise cells and top plane `nz`
    #[must_use]
    pub fn new(ny: usize, nz: usize) -> Self {
        Self {
            ny,
            nz,
            u: vec![0.0; ny * nz],
            v: vec![0.0; ny * nz],
            w: vec![0.0; ny * nz],
        }
    }

    /// Plane with uniform streamwise velocity
    #[must_use]
    pub fn uniform(ny: usize, nz: usize, speed: f64) -> Self {
        let mut plane = Self::new(ny, nz);
        plane.u.fill(speed);
        plane
    }

    /// Spanwise extent
    #[must_use]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Top plane index
    #[must_use]
    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Values per component
    #[must_use]
    pub fn len(&self) -> usize {
        self.ny * self.nz
    }

    /// True when the plane holds no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage offset of `(j, k)`, `k` in `1..=nz`
    #[inline]
    #[must_use]
    pub fn offset(&self, j: usize, k: usize) -> usize {
        (k - 1) * self.ny + j
    }

    /// Check that the plane matches the slab shape and every component is sized
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::ShapeMismatch`] on any size disagreement.
    pub fn check_shape(&self, ny: usize, nz: usize) -> ForcingResult<()> {
        let expected = ny * nz;
        for actual in [self.ny * self.nz, self.u.len(), self.v.len(), self.w.len()] {
            if actual != expected {
                return Err(ForcingError::ShapeMismatch {
                    what: "inflow plane",
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Capability that supplies the exit-plane velocity each step
pub trait InflowPlaneReader: Send {
    /// Fill `plane` with the next inflow plane
    ///
    /// # Errors
    ///
    /// Implementations return [`ForcingError::InflowSource`] or
    /// [`ForcingError::ShapeMismatch`]; the error reaches the caller unchanged.
    fn read_plane(&mut self, plane: &mut InflowPlane) -> ForcingResult<()>;
}

/// Planes recorded from a precursor simulation, replayed in a loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecursorRecord {
    frames: Vec<InflowPlane>,
    cursor: usize,
}

impl PrecursorRecord {
    /// Create a record from recorded frames
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InflowSource`] if `frames` is empty and
    /// [`ForcingError::ShapeMismatch`] if the frames differ in shape.
    pub fn new(frames: Vec<InflowPlane>) -> ForcingResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| ForcingError::InflowSource("precursor record is empty".to_string()))?;
        let (ny, nz) = (first.ny, first.nz);
        for frame in &frames {
            frame.check_shape(ny, nz)?;
        }
        Ok(Self { frames, cursor: 0 })
    }

    /// Number of recorded frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when there is nothing to replay
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the frame returned by the next read
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl InflowPlaneReader for PrecursorRecord {
    fn read_plane(&mut self, plane: &mut InflowPlane) -> ForcingResult<()> {
        let frame = self
            .frames
            .get(self.cursor)
            .ok_or_else(|| ForcingError::InflowSource("precursor record is empty".to_string()))?;
        frame.check_shape(plane.ny, plane.nz)?;
        plane.u.copy_from_slice(&frame.u);
        plane.v.copy_from_slice(&frame.v);
        plane.w.copy_from_slice(&frame.w);
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_offset() {
        let plane = InflowPlane::new(4, 3);
        assert_eq!(plane.len(), 12);
        assert_eq!(plane.offset(0, 1), 0);
        assert_eq!(plane.offset(3, 3), 11);
    }

    #[test]
    fn test_record_replays_cyclically() {
        let frames = vec![
            InflowPlane::uniform(2, 2, 1.0),
            InflowPlane::uniform(2, 2, 2.0),
        ];
        let mut record = PrecursorRecord::new(frames).expect("valid record");
        let mut plane = InflowPlane::new(2, 2);

        let mut seen = Vec::new();
        for _ in 0..5 {
            record.read_plane(&mut plane).expect("read");
            seen.push(plane.u[0]);
        }
        assert_eq!(seen, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
        assert_eq!(record.cursor(), 1);
    }

    #[test]
    fn test_empty_record_rejected() {
        let err = PrecursorRecord::new(Vec::new()).expect_err("empty record");
        assert!(matches!(err, ForcingError::InflowSource(_)));
    }

    #[test]
    fn test_mixed_frame_shapes_rejected() {
        let frames = vec![InflowPlane::new(2, 2), InflowPlane::new(3, 2)];
        assert!(PrecursorRecord::new(frames).is_err());
    }

    #[test]
    fn test_read_into_wrong_shape_fails() {
        let mut record =
            PrecursorRecord::new(vec![InflowPlane::new(2, 2)]).expect("valid record");
        let mut plane = InflowPlane::new(4, 2);
        let err = record.read_plane(&mut plane).expect_err("shape mismatch");
        assert!(matches!(err, ForcingError::ShapeMismatch { .. }));
    }
}
