//! Dense scratch buffers that can live on the heap or in an unlinked,
//! memory-mapped temporary file.
//!
//! The correlation computation needs two large buffers: a working copy of the
//! augmented feature matrix and the square output matrix. For wide inputs
//! neither fits comfortably next to the caller's own copy of the data, so both
//! can be spilled to disk. A spilled buffer is backed by an anonymous temporary
//! file that the OS removes as soon as the mapping is dropped, so no file ever
//! outlives the computation, whichever path it exits by.

use memmap2::MmapMut;
use ndarray::{ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

pub const SCRATCH_BUDGET_ENV: &str = "QMSELECT_SCRATCH_BUDGET_BYTES";
pub const DEFAULT_SCRATCH_BUDGET_BYTES: usize = 1024 * 1024 * 1024;

/// Where scratch buffers for the correlation computation are placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePolicy {
    /// Heap while the combined scratch size fits the budget, disk beyond it.
    #[default]
    Auto,
    InMemory,
    Disk,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScratchLocation {
    Memory,
    Disk,
}

/// Budget in bytes for heap-resident scratch buffers, read from
/// [`SCRATCH_BUDGET_ENV`]. `0` disables spilling.
pub fn scratch_budget_bytes() -> usize {
    parse_scratch_budget(std::env::var(SCRATCH_BUDGET_ENV).ok().as_deref())
}

/// Interprets a budget setting: unset or unparsable falls back to the default,
/// `0` means unlimited.
pub fn parse_scratch_budget(value: Option<&str>) -> usize {
    match value.map(|raw| raw.trim().parse::<u64>()) {
        Some(Ok(0)) => usize::MAX,
        Some(Ok(parsed)) => usize::try_from(parsed).unwrap_or(usize::MAX),
        Some(Err(_)) | None => DEFAULT_SCRATCH_BUDGET_BYTES,
    }
}

pub fn scratch_size_bytes(rows: usize, cols: usize) -> Option<usize> {
    rows.checked_mul(cols)?
        .checked_mul(core::mem::size_of::<f64>())
}

impl StoragePolicy {
    /// Decides where buffers totalling `required_bytes` go, against the
    /// budget from the environment. `None` means the size overflowed, which
    /// always spills.
    pub fn resolve(self, required_bytes: Option<usize>) -> ScratchLocation {
        self.resolve_with_budget(required_bytes, scratch_budget_bytes())
    }

    pub fn resolve_with_budget(
        self,
        required_bytes: Option<usize>,
        budget_bytes: usize,
    ) -> ScratchLocation {
        match self {
            Self::InMemory => ScratchLocation::Memory,
            Self::Disk => ScratchLocation::Disk,
            Self::Auto => match required_bytes {
                Some(bytes) if bytes <= budget_bytes => ScratchLocation::Memory,
                _ => ScratchLocation::Disk,
            },
        }
    }
}

enum Backing {
    Heap(Vec<f64>),
    Mapped(MmapMut),
}

/// A zero-initialised, row-major `rows x cols` matrix of `f64`.
pub struct ScratchMatrix {
    rows: usize,
    cols: usize,
    backing: Backing,
}

impl ScratchMatrix {
    pub fn zeros(
        rows: usize,
        cols: usize,
        location: ScratchLocation,
        spill_dir: Option<&Path>,
    ) -> io::Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| io::Error::other("scratch matrix dimensions overflow"))?;
        match location {
            ScratchLocation::Disk if len > 0 => Self::mapped(rows, cols, len, spill_dir),
            _ => Ok(Self {
                rows,
                cols,
                backing: Backing::Heap(vec![0.0; len]),
            }),
        }
    }

    fn mapped(rows: usize, cols: usize, len: usize, spill_dir: Option<&Path>) -> io::Result<Self> {
        let bytes = scratch_size_bytes(rows, cols)
            .ok_or_else(|| io::Error::other("scratch matrix byte size overflows"))?;
        let file = match spill_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        // set_len extends with zeros, which is exactly 0.0 for f64.
        file.set_len(bytes as u64)?;
        // The file is unlinked and private to this process; nothing else can
        // truncate it underneath the mapping.
        let map = unsafe { MmapMut::map_mut(&file)? };
        debug_assert_eq!(map.len(), len * core::mem::size_of::<f64>());
        Ok(Self {
            rows,
            cols,
            backing: Backing::Mapped(map),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    pub fn as_slice(&self) -> &[f64] {
        let len = self.rows * self.cols;
        match &self.backing {
            Backing::Heap(values) => values.as_slice(),
            // Mappings are page aligned and sized for exactly `len` values.
            Backing::Mapped(map) => unsafe {
                std::slice::from_raw_parts(map.as_ptr().cast::<f64>(), len)
            },
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        let len = self.rows * self.cols;
        match &mut self.backing {
            Backing::Heap(values) => values.as_mut_slice(),
            Backing::Mapped(map) => unsafe {
                std::slice::from_raw_parts_mut(map.as_mut_ptr().cast::<f64>(), len)
            },
        }
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        let shape = self.shape();
        ArrayView2::from_shape(shape, self.as_slice())
            .expect("scratch buffer length matches its shape")
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        let shape = self.shape();
        ArrayViewMut2::from_shape(shape, self.as_mut_slice())
            .expect("scratch buffer length matches its shape")
    }
}
