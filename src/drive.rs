//! The drive interface consumed by the Volume Manager.
//!
//! Sector read/write, geometry query, and formatting are not implemented by
//! this crate. This module only defines the contract; see
//! [`crate::testing::MemDrive`] for the in-memory fixture this crate's own
//! tests drive against.

use std::io;

/// Drive geometry, captured once at [`crate::volume::VolumeManager::drive_start`]
/// time and immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriveInfo {
    pub nb_cylinder: u32,
    pub nb_sector: u32,
    pub sector_size: u32,
}

/// Raw sector-level operations a drive must provide.
///
/// Sector size must equal [`crate::mbr::BLOCK_SIZE`]; the Volume Manager
/// does not adapt to any other size.
pub trait Drive {
    /// Idempotent hardware initialization.
    fn init_material(&mut self) -> io::Result<()>;

    /// Returns the drive's geometry.
    fn drive_infos(&self) -> DriveInfo;

    /// Reads one sector into `buf`. `buf` must be exactly `sector_size`
    /// bytes long.
    fn read_sector(&mut self, cylinder: u16, sector: u16, buf: &mut [u8]) -> io::Result<()>;

    /// Writes one sector from `buf`. `buf` must be exactly `sector_size`
    /// bytes long.
    fn write_sector(&mut self, cylinder: u16, sector: u16, buf: &[u8]) -> io::Result<()>;

    /// Fills `n` consecutive sectors starting at `(cylinder, sector)` with
    /// `fill_byte`.
    fn format_sector(
        &mut self,
        cylinder: u16,
        sector: u16,
        n: usize,
        fill_byte: u8,
    ) -> io::Result<()>;
}
