//! Structured diagnostics for the Volume Manager.
//!
//! A library has no business writing to `stderr` on a caller's behalf, so
//! each validation failure is a variant here instead, with the diagnostic
//! text available through `Display`.

use std::fmt;
use std::io;

/// A validation failure raised by the Volume Manager before any mutation or
/// drive access took place.
#[derive(Debug)]
pub enum VolumeError {
    /// `add_volume` was called while the MBR already holds `MAX_VOLUMES`
    /// entries.
    CapacityExceeded,
    /// The proposed volume's first cylinder is beyond the drive's geometry.
    CylinderOutOfRange,
    /// The proposed volume's first sector is beyond the drive's geometry.
    SectorOutOfRange,
    /// The proposed volume's first sector is absolute sector 0, which would
    /// overwrite the MBR.
    WouldOverwriteMbr,
    /// The proposed volume's last sector lies beyond the end of the drive.
    OffEndOfDrive,
    /// The proposed volume overlaps an already-registered volume.
    Overlap,
    /// The given volume index is not `< nb_volumes()`.
    UnknownVolume(u8),
    /// The given block index is not `< nb_blocks(volume)`.
    UnknownBlock { volume: u8, block: u32 },
}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "the maximum number of volumes has been reached"),
            Self::CylinderOutOfRange => write!(f, "the cylinder number is too large"),
            Self::SectorOutOfRange => write!(f, "the sector number is too large"),
            Self::WouldOverwriteMbr => write!(f, "the volume would overwrite the MBR"),
            Self::OffEndOfDrive => write!(f, "the volume extends past the end of the drive"),
            Self::Overlap => write!(f, "the volume overlaps an existing volume"),
            Self::UnknownVolume(v) => write!(f, "volume {v} does not exist"),
            Self::UnknownBlock { volume, block } => {
                write!(f, "block {block} does not exist in volume {volume}")
            }
        }
    }
}

impl std::error::Error for VolumeError {}

/// Either a validation failure or an underlying drive I/O failure.
///
/// Validation always happens before any drive access, so a caller can tell
/// from the variant alone whether the drive was ever touched.
#[derive(Debug)]
pub enum VmError {
    /// A [`VolumeError`]; the drive was never accessed.
    Invalid(VolumeError),
    /// The drive itself reported a failure while servicing an otherwise
    /// valid request.
    Io(io::Error),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<VolumeError> for VmError {
    fn from(e: VolumeError) -> Self {
        Self::Invalid(e)
    }
}

impl From<io::Error> for VmError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
