//! The Volume Manager: owns the in-memory MBR, translates `(volume, block)`
//! addresses to `(cylinder, sector)`, and mediates all sector I/O from
//! higher layers.

use crate::drive::{Drive, DriveInfo};
use crate::error::{VmError, VolumeError};
use crate::mbr::{CylSec, Mbr, VolumeDescriptor, BLOCK_SIZE, MAX_VOLUMES, MBR_MAGIC};

/// Owns a drive, its geometry, and the in-memory MBR; translates volume
/// addresses and enforces volume placement invariants.
pub struct VolumeManager<D: Drive> {
    drive: D,
    info: DriveInfo,
    mbr: Mbr,
}

impl<D: Drive> VolumeManager<D> {
    /// Initializes the drive, captures its geometry, and reads sector 0.
    /// If the magic does not match, the drive is treated as unformatted and
    /// silently reinitialized.
    ///
    /// Calling this twice on an already-formatted drive is idempotent: the
    /// second call reads back the same MBR it wrote and does not touch the
    /// drive again.
    pub fn drive_start(mut drive: D) -> Result<Self, VmError> {
        drive.init_material()?;
        let info = drive.drive_infos();
        debug_assert_eq!(info.sector_size as usize, BLOCK_SIZE);

        let mut buf = vec![0u8; info.sector_size as usize];
        drive.read_sector(0, 0, &mut buf)?;
        let mbr = Mbr::deserialize(&buf);

        let mbr = if mbr.magic == MBR_MAGIC {
            mbr
        } else {
            let fresh = Mbr::empty();
            let mut buf = vec![0u8; info.sector_size as usize];
            fresh.serialize(&mut buf);
            drive.write_sector(0, 0, &buf)?;
            fresh
        };

        Ok(Self { drive, info, mbr })
    }

    /// Returns the drive's geometry.
    pub fn drive_infos(&self) -> DriveInfo {
        self.info
    }

    /// The number of active volumes.
    pub fn nb_volumes(&self) -> u8 {
        self.mbr.count
    }

    /// The number of blocks in volume `v`.
    pub fn nb_blocks(&self, v: u8) -> Result<u32, VolumeError> {
        self.volume(v).map(|d| d.nb_blocks)
    }

    /// Returns the volume containing absolute sector `abs`, if any (linear
    /// scan).
    pub fn volume_at_sector(&self, abs: u32) -> Option<u8> {
        (0..self.mbr.count).find(|&v| self.contains_sector(v, abs))
    }

    /// Registers a new volume. Validates before mutating; on any failure,
    /// the MBR is left untouched and the drive is never written.
    pub fn add_volume(&mut self, desc: VolumeDescriptor) -> Result<(), VmError> {
        if self.mbr.count as usize == MAX_VOLUMES {
            return Err(VolumeError::CapacityExceeded.into());
        }
        if desc.first.cylinder as u32 >= self.info.nb_cylinder {
            return Err(VolumeError::CylinderOutOfRange.into());
        }
        if desc.first.sector as u32 >= self.info.nb_sector {
            return Err(VolumeError::SectorOutOfRange.into());
        }
        if desc.first.cylinder == 0 && desc.first.sector == 0 {
            return Err(VolumeError::WouldOverwriteMbr.into());
        }

        let first_abs = desc.first.to_absolute(self.info.nb_sector);
        let last_abs = first_abs + desc.nb_blocks - 1;
        if last_abs >= self.info.nb_cylinder * self.info.nb_sector {
            return Err(VolumeError::OffEndOfDrive.into());
        }
        if (first_abs..=last_abs).any(|abs| self.volume_at_sector(abs).is_some()) {
            return Err(VolumeError::Overlap.into());
        }

        let slot = self.mbr.count as usize;
        self.mbr.volumes[slot] = desc;
        self.mbr.count += 1;
        self.persist_mbr()?;
        Ok(())
    }

    /// Removes volume `v`, shifting every later volume down by one slot.
    /// The vacated on-disk blocks are not zeroed.
    pub fn remove_volume(&mut self, v: u8) -> Result<(), VmError> {
        self.volume(v)?;
        let count = self.mbr.count as usize;
        for i in (v as usize)..(count - 1) {
            self.mbr.volumes[i] = self.mbr.volumes[i + 1];
        }
        self.mbr.count -= 1;
        self.persist_mbr()?;
        Ok(())
    }

    /// Reads block `n` of volume `v` into `buf`. `buf` must be exactly
    /// `BLOCK_SIZE` bytes.
    pub fn read_bloc(&mut self, v: u8, n: u32, buf: &mut [u8]) -> Result<(), VmError> {
        let cyl_sec = self.cyl_sec_for_block(v, n)?;
        self.drive
            .read_sector(cyl_sec.cylinder, cyl_sec.sector, buf)?;
        Ok(())
    }

    /// Writes block `n` of volume `v` from `buf`. `buf` must be exactly
    /// `BLOCK_SIZE` bytes.
    pub fn write_bloc(&mut self, v: u8, n: u32, buf: &[u8]) -> Result<(), VmError> {
        let cyl_sec = self.cyl_sec_for_block(v, n)?;
        self.drive
            .write_sector(cyl_sec.cylinder, cyl_sec.sector, buf)?;
        Ok(())
    }

    /// Formats every block of volume `v` (fills with zero).
    pub fn format_vol(&mut self, v: u8) -> Result<(), VmError> {
        let nb_blocks = self.nb_blocks(v)?;
        for n in 0..nb_blocks {
            let cyl_sec = self.cyl_sec_for_block(v, n)?;
            self.drive
                .format_sector(cyl_sec.cylinder, cyl_sec.sector, 1, 0)?;
        }
        Ok(())
    }

    fn volume(&self, v: u8) -> Result<VolumeDescriptor, VolumeError> {
        if v >= self.mbr.count {
            return Err(VolumeError::UnknownVolume(v));
        }
        Ok(self.mbr.volumes[v as usize])
    }

    /// Validates `(v, n)` and translates it to an absolute cylinder/sector.
    /// Validation precedes any drive access.
    fn cyl_sec_for_block(&self, v: u8, n: u32) -> Result<CylSec, VmError> {
        let desc = self.volume(v)?;
        if n >= desc.nb_blocks {
            return Err(VolumeError::UnknownBlock { volume: v, block: n }.into());
        }
        let first_abs = desc.first.to_absolute(self.info.nb_sector);
        Ok(CylSec::from_absolute(first_abs + n, self.info.nb_sector))
    }

    fn contains_sector(&self, v: u8, abs: u32) -> bool {
        let desc = self.mbr.volumes[v as usize];
        let first = desc.first.to_absolute(self.info.nb_sector);
        let last = first + desc.nb_blocks - 1;
        (first..=last).contains(&abs)
    }

    fn persist_mbr(&mut self) -> Result<(), VmError> {
        let mut buf = vec![0u8; self.info.sector_size as usize];
        self.mbr.serialize(&mut buf);
        self.drive.write_sector(0, 0, &buf)?;
        Ok(())
    }
}
