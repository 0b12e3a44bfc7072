//! Reference fixtures for the external collaborators this crate only
//! defines as traits ([`crate::drive::Drive`], [`crate::inode::InodeStore`]).
//!
//! Neither type is production code; they exist so this crate's own test
//! suite (and any integration test built against it) has something to drive
//! the Volume Manager and Indexed File Layer with. `MemDrive` is a byte
//! buffer standing in for a block device; `MapInodeStore` is a free-block
//! bitmap allocator standing in for an inode-to-block mapper.

use crate::drive::{Drive, DriveInfo};
use crate::inode::{InodeKind, InodeMeta, InodeStore, VolumeInfos};
use crate::mbr::BLOCK_SIZE;
use std::io;

/// An in-memory [`Drive`]: `nb_cylinder * nb_sector` sectors of
/// [`BLOCK_SIZE`] bytes each, backed by a flat `Vec<u8>`.
pub struct MemDrive {
    nb_cylinder: u32,
    nb_sector: u32,
    bytes: Vec<u8>,
}

impl MemDrive {
    pub fn new(nb_cylinder: u32, nb_sector: u32) -> Self {
        let total = nb_cylinder as usize * nb_sector as usize * BLOCK_SIZE;
        Self {
            nb_cylinder,
            nb_sector,
            bytes: vec![0u8; total],
        }
    }

    fn offset(&self, cylinder: u16, sector: u16) -> usize {
        let abs = cylinder as usize * self.nb_sector as usize + sector as usize;
        abs * BLOCK_SIZE
    }
}

impl Drive for MemDrive {
    fn init_material(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn drive_infos(&self) -> DriveInfo {
        DriveInfo {
            nb_cylinder: self.nb_cylinder,
            nb_sector: self.nb_sector,
            sector_size: BLOCK_SIZE as u32,
        }
    }

    fn read_sector(&mut self, cylinder: u16, sector: u16, buf: &mut [u8]) -> io::Result<()> {
        let off = self.offset(cylinder, sector);
        buf.copy_from_slice(&self.bytes[off..off + BLOCK_SIZE]);
        Ok(())
    }

    fn write_sector(&mut self, cylinder: u16, sector: u16, buf: &[u8]) -> io::Result<()> {
        let off = self.offset(cylinder, sector);
        self.bytes[off..off + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn format_sector(
        &mut self,
        cylinder: u16,
        sector: u16,
        n: usize,
        fill_byte: u8,
    ) -> io::Result<()> {
        let start = self.offset(cylinder, sector);
        let end = start + n * BLOCK_SIZE;
        self.bytes[start..end].fill(fill_byte);
        Ok(())
    }
}

/// A bitmap-backed [`InodeStore`]: inode `0` is reserved (invalid), inodes
/// `1..nb_block` each own a growable list of directly-addressed block
/// numbers, allocated first-fit from a free-block bitmap.
pub struct MapInodeStore {
    volume: u8,
    block_size: u32,
    nb_block: u32,
    /// `true` at index `b` means block `b` is free. Block `0` is never
    /// handed out: it doubles as the "no block"/"hole" sentinel.
    free: Vec<bool>,
    inodes: Vec<Option<InodeEntry>>,
}

struct InodeEntry {
    meta: InodeMeta,
    direct: Vec<u32>,
}

impl MapInodeStore {
    /// `volume` is the index the mapper resolves file blocks against;
    /// `nb_block` must match that volume's block count.
    pub fn new(volume: u8, nb_block: u32) -> Self {
        let mut free = vec![true; nb_block as usize];
        if !free.is_empty() {
            free[0] = false;
        }
        Self {
            volume,
            block_size: BLOCK_SIZE as u32,
            nb_block,
            free,
            inodes: Vec::new(),
        }
    }

}

impl InodeStore for MapInodeStore {
    fn init(&mut self) {}

    fn volume_infos(&self) -> VolumeInfos {
        VolumeInfos {
            block_size: self.block_size,
            nb_block: self.nb_block,
        }
    }

    fn current_volume(&self) -> u8 {
        self.volume
    }

    fn create_inode(&mut self, kind: InodeKind) -> u32 {
        self.inodes.push(Some(InodeEntry {
            meta: InodeMeta { kind, size: 0 },
            direct: Vec::new(),
        }));
        self.inodes.len() as u32
    }

    fn delete_inode(&mut self, inode: u32) {
        if let Some(slot) = self.inodes.get_mut(inode as usize - 1) {
            if let Some(entry) = slot.take() {
                for b in entry.direct {
                    self.free[b as usize] = true;
                }
            }
        }
    }

    fn truncate_inode(&mut self, inode: u32) {
        if let Some(Some(entry)) = self.inodes.get_mut(inode as usize - 1) {
            for b in entry.direct.drain(..) {
                self.free[b as usize] = true;
            }
            entry.meta.size = 0;
        }
    }

    fn read_inode(&self, inode: u32) -> InodeMeta {
        self.inodes[inode as usize - 1].as_ref().unwrap().meta
    }

    fn write_inode(&mut self, inode: u32, meta: InodeMeta) {
        self.inodes[inode as usize - 1].as_mut().unwrap().meta = meta;
    }

    fn fileblock_to_volblock(&mut self, inode: u32, file_block_index: u64, allocate: bool) -> u32 {
        let idx = file_block_index as usize;
        let entry = self.inodes[inode as usize - 1].as_mut().unwrap();
        if idx < entry.direct.len() {
            return entry.direct[idx];
        }
        if !allocate {
            return 0;
        }
        while entry.direct.len() <= idx {
            let free = &mut self.free;
            let block = match free.iter().position(|&f| f).map(|b| b as u32) {
                Some(b) => {
                    free[b as usize] = false;
                    b
                }
                None => return 0,
            };
            entry.direct.push(block);
        }
        entry.direct[idx]
    }
}
