//! The Indexed File Layer: a stream abstraction over a volume, backed by an
//! inode-addressed block allocation, with a single-block write-back cache
//! per open descriptor.
//!
//! The monotonic descriptor-id counter and the "current volume" context
//! live on an explicitly-constructed [`IndexedFileLayer`] value rather than
//! as shared global state.

use crate::drive::Drive;
use crate::inode::{InodeKind, InodeMeta, InodeStore};
use crate::volume::VolumeManager;

/// The in-memory state of one open file: position, single-block cache, and
/// dirty flag.
///
/// A descriptor is valid iff its `inode` is nonzero and within the current
/// volume's inode bound; [`IndexedFileLayer::open`] establishes that,
/// [`IndexedFileLayer::close`] clears it by zeroing `inode`.
pub struct FileDescriptor {
    id: u64,
    inode: u32,
    kind: InodeKind,
    size: u64,
    stored_size: u64,
    current_pos: u64,
    current_pos_in_buffer: u32,
    buffer_index: u64,
    buffer_pos: u64,
    buffer_block: u32,
    buffer: Option<Vec<u8>>,
    buffer_modified: bool,
}

impl FileDescriptor {
    /// A closed descriptor: invalid until [`IndexedFileLayer::open`]
    /// populates it.
    pub fn closed() -> Self {
        Self {
            id: 0,
            inode: 0,
            kind: InodeKind::Regular,
            size: 0,
            stored_size: 0,
            current_pos: 0,
            current_pos_in_buffer: 0,
            buffer_index: 0,
            buffer_pos: 0,
            buffer_block: 0,
            buffer: None,
            buffer_modified: false,
        }
    }

    /// The descriptor's unique id, assigned at `open` time.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The inode this descriptor is open on, or `0` if closed.
    pub fn inode(&self) -> u32 {
        self.inode
    }

    /// The file's current size, as seen by this descriptor. May be ahead of
    /// what is persisted on disk until the next flush.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The absolute byte offset of the next read/write.
    pub fn position(&self) -> u64 {
        self.current_pos
    }
}

impl Default for FileDescriptor {
    fn default() -> Self {
        Self::closed()
    }
}

/// Outcome of a single-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadByte {
    /// A byte was read and the position advanced by one.
    Byte(u8),
    /// The descriptor's position was already at or past its size.
    Eof,
    /// The descriptor is invalid (closed or never opened).
    Invalid,
}

/// Outcome of a single-byte write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteByte {
    /// The byte was stored and the position advanced by one.
    Written,
    /// The descriptor is invalid (closed or never opened).
    Invalid,
    /// The inode mapper could not allocate a block for this write.
    NoFreeSpace,
}

/// Outcome of a bulk read/write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// `n` bytes were transferred. Equal to the requested length on full
    /// success; shorter on the first EOF (read) or out-of-space (write).
    Completed(usize),
    /// The descriptor is invalid; nothing was transferred.
    Invalid,
}

/// A stream abstraction over one volume, backed by an [`InodeStore`].
///
/// Borrows the [`VolumeManager`] it reads/writes blocks through, and owns
/// the `S: InodeStore` it resolves file blocks against.
pub struct IndexedFileLayer<'v, D: Drive, S: InodeStore> {
    volumes: &'v mut VolumeManager<D>,
    inodes: S,
    block_size: u32,
    next_desc_id: u64,
}

impl<'v, D: Drive, S: InodeStore> IndexedFileLayer<'v, D, S> {
    /// Runs the inode mapper's one-time setup and caches its block size.
    pub fn init(volumes: &'v mut VolumeManager<D>, mut inodes: S) -> Self {
        inodes.init();
        let block_size = inodes.volume_infos().block_size;
        Self {
            volumes,
            inodes,
            block_size,
            next_desc_id: 0,
        }
    }

    /// Creates a new inode. No descriptor-level state changes.
    pub fn create(&mut self, kind: InodeKind) -> u32 {
        self.inodes.create_inode(kind)
    }

    /// Deletes an inode. Returns `false` if the inode number is invalid.
    /// Deleting an inode another descriptor still has open is the caller's
    /// responsibility; behavior of that descriptor afterwards is undefined.
    pub fn delete(&mut self, inode: u32) -> bool {
        if !self.inode_valid(inode) {
            return false;
        }
        self.inodes.delete_inode(inode);
        true
    }

    /// Truncates an inode to zero length. Returns `false` if the inode
    /// number is invalid.
    pub fn truncate(&mut self, inode: u32) -> bool {
        if !self.inode_valid(inode) {
            return false;
        }
        self.inodes.truncate_inode(inode);
        true
    }

    /// Opens `inode` into `fd`. On an invalid inode, returns `false` and
    /// leaves `fd` untouched.
    pub fn open(&mut self, fd: &mut FileDescriptor, inode: u32) -> bool {
        if !self.inode_valid(inode) {
            return false;
        }
        let meta = self.inodes.read_inode(inode);
        let id = self.next_desc_id;
        self.next_desc_id += 1;
        *fd = FileDescriptor {
            id,
            inode,
            kind: meta.kind,
            size: meta.size,
            stored_size: meta.size,
            current_pos: 0,
            current_pos_in_buffer: 0,
            buffer_index: 0,
            buffer_pos: 0,
            buffer_block: 0,
            buffer: None,
            buffer_modified: false,
        };
        true
    }

    /// Flushes, releases the buffer, and invalidates `fd`. A no-op if `fd`
    /// was already invalid.
    pub fn close(&mut self, fd: &mut FileDescriptor) {
        if !self.fd_valid(fd) {
            return;
        }
        self.flush(fd);
        fd.buffer = None;
        fd.inode = 0;
    }

    /// Seeks to an absolute byte offset. No upper-bound clamp: seeking past
    /// the end is permitted.
    pub fn seek_abs(&mut self, fd: &mut FileDescriptor, offset: u64) {
        if !self.fd_valid(fd) {
            return;
        }
        self.change_position(fd, offset);
    }

    /// Seeks by a relative byte delta. A negative delta larger in magnitude
    /// than the current position clamps to offset 0.
    pub fn seek_rel(&mut self, fd: &mut FileDescriptor, delta: i64) {
        if !self.fd_valid(fd) {
            return;
        }
        let delta = if delta < 0 && (-delta) as u64 > fd.current_pos {
            -(fd.current_pos as i64)
        } else {
            delta
        };
        let new_pos = (fd.current_pos as i64 + delta) as u64;
        self.change_position(fd, new_pos);
    }

    /// Reads one byte and advances the position by one.
    pub fn readc(&mut self, fd: &mut FileDescriptor) -> ReadByte {
        if !self.fd_valid(fd) {
            return ReadByte::Invalid;
        }
        if fd.current_pos >= fd.size {
            return ReadByte::Eof;
        }
        if fd.buffer.is_none() {
            self.load_buffer_for_read(fd);
        }
        let byte = fd.buffer.as_ref().unwrap()[fd.current_pos_in_buffer as usize];
        self.change_position(fd, fd.current_pos + 1);
        ReadByte::Byte(byte)
    }

    /// Writes one byte and advances the position by one, growing `size` if
    /// needed.
    pub fn writec(&mut self, fd: &mut FileDescriptor, byte: u8) -> WriteByte {
        if !self.fd_valid(fd) {
            return WriteByte::Invalid;
        }
        if fd.buffer.is_none() || fd.buffer_block == 0 {
            let current_volume = self.inodes.current_volume();
            let block = self
                .inodes
                .fileblock_to_volblock(fd.inode, fd.buffer_index, true);
            if block == 0 {
                return WriteByte::NoFreeSpace;
            }
            fd.buffer_block = block;
            if fd.buffer.is_none() {
                let block_size = self.block_size as u64;
                let mut buf = vec![0u8; block_size as usize];
                // A block that starts at or past the file's current size
                // holds no real data yet, whatever garbage is left over on
                // disk from a previous occupant; treat it as a hole instead
                // of reading it back.
                if fd.buffer_index * block_size < fd.size {
                    self.volumes
                        .read_bloc(current_volume, block, &mut buf)
                        .expect("volume read failed for a block resolved by the inode mapper");
                }
                fd.buffer = Some(buf);
            }
        }
        fd.buffer.as_mut().unwrap()[fd.current_pos_in_buffer as usize] = byte;
        fd.buffer_modified = true;
        self.change_position(fd, fd.current_pos + 1);
        if fd.current_pos > fd.size {
            fd.size = fd.current_pos;
        }
        WriteByte::Written
    }

    /// Reads up to `buf.len()` bytes, stopping at the first EOF.
    pub fn read(&mut self, fd: &mut FileDescriptor, buf: &mut [u8]) -> BulkOutcome {
        for (i, slot) in buf.iter_mut().enumerate() {
            match self.readc(fd) {
                ReadByte::Invalid => return BulkOutcome::Invalid,
                ReadByte::Eof => return BulkOutcome::Completed(i),
                ReadByte::Byte(b) => *slot = b,
            }
        }
        BulkOutcome::Completed(buf.len())
    }

    /// Writes `buf.len()` bytes, stopping at the first allocation failure.
    pub fn write(&mut self, fd: &mut FileDescriptor, buf: &[u8]) -> BulkOutcome {
        for (i, &byte) in buf.iter().enumerate() {
            match self.writec(fd, byte) {
                WriteByte::Invalid => return BulkOutcome::Invalid,
                WriteByte::NoFreeSpace => return BulkOutcome::Completed(i),
                WriteByte::Written => {}
            }
        }
        BulkOutcome::Completed(buf.len())
    }

    /// A descriptor is valid iff its inode is in `(0, nb_block)` of the
    /// current volume.
    fn inode_valid(&self, inode: u32) -> bool {
        inode > 0 && inode < self.inodes.volume_infos().nb_block
    }

    fn fd_valid(&self, fd: &FileDescriptor) -> bool {
        self.inode_valid(fd.inode)
    }

    /// The sole mutator of position fields. On a block-index change,
    /// flushes and releases the old buffer before moving the window.
    fn change_position(&mut self, fd: &mut FileDescriptor, new_pos: u64) {
        if new_pos == fd.current_pos {
            return;
        }
        let block_size = self.block_size as u64;
        let new_buffer_index = new_pos / block_size;
        let new_pos_in_buffer = (new_pos % block_size) as u32;

        if new_buffer_index != fd.buffer_index {
            self.flush(fd);
            fd.buffer = None;
            fd.buffer_block = 0;
            fd.buffer_modified = false;
            fd.buffer_pos = new_buffer_index * block_size;
            fd.buffer_index = new_buffer_index;
        }
        fd.current_pos = new_pos;
        fd.current_pos_in_buffer = new_pos_in_buffer;
    }

    /// Writes a dirty buffer back and, if `size` has grown, persists the
    /// inode's new size. A no-op on an invalid descriptor, an empty buffer,
    /// or a clean one.
    fn flush(&mut self, fd: &mut FileDescriptor) {
        if !self.fd_valid(fd) {
            return;
        }
        let Some(buffer) = fd.buffer.as_ref() else {
            return;
        };
        if !fd.buffer_modified {
            return;
        }
        let current_volume = self.inodes.current_volume();
        self.volumes
            .write_bloc(current_volume, fd.buffer_block, buffer)
            .expect("volume write failed for a block resolved by the inode mapper");
        fd.buffer_modified = false;
        if fd.size != fd.stored_size {
            let mut meta = self.inodes.read_inode(fd.inode);
            meta.size = fd.size;
            self.inodes.write_inode(fd.inode, meta);
            fd.stored_size = fd.size;
        }
    }

    /// Loads the block for a read miss: resolves without allocating, and
    /// materializes a hole as zeros.
    fn load_buffer_for_read(&mut self, fd: &mut FileDescriptor) {
        let current_volume = self.inodes.current_volume();
        let block = self
            .inodes
            .fileblock_to_volblock(fd.inode, fd.buffer_index, false);
        fd.buffer_block = block;
        let mut buf = vec![0u8; self.block_size as usize];
        if block != 0 {
            self.volumes
                .read_bloc(current_volume, block, &mut buf)
                .expect("volume read failed for a block resolved by the inode mapper");
        }
        fd.buffer = Some(buf);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mbr::{CylSec, VolumeDescriptor, VolumeType};
    use crate::testing::{MapInodeStore, MemDrive};
    use crate::volume::VolumeManager;

    fn fixture() -> VolumeManager<MemDrive> {
        let drive = MemDrive::new(4, 16);
        let mut vm = VolumeManager::drive_start(drive).unwrap();
        // One BASE volume of 8 blocks (1024 bytes).
        vm.add_volume(VolumeDescriptor::new(CylSec::new(0, 1), 8, VolumeType::Base))
            .unwrap();
        vm
    }

    #[test]
    fn write_seek_read_round_trip() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));

        let inode = ifl.create(InodeKind::Regular);
        assert_ne!(inode, 0);

        let mut fd = FileDescriptor::closed();
        assert!(ifl.open(&mut fd, inode));

        assert_eq!(ifl.write(&mut fd, b"Hello"), BulkOutcome::Completed(5));

        ifl.seek_abs(&mut fd, 0);
        let mut buf = [0u8; 5];
        assert_eq!(ifl.read(&mut fd, &mut buf), BulkOutcome::Completed(5));
        assert_eq!(&buf, b"Hello");

        ifl.close(&mut fd);
        assert_eq!(fd.inode(), 0);

        let mut fd2 = FileDescriptor::closed();
        assert!(ifl.open(&mut fd2, inode));
        assert_eq!(fd2.size(), 5);
        let mut buf2 = [0u8; 5];
        assert_eq!(ifl.read(&mut fd2, &mut buf2), BulkOutcome::Completed(5));
        assert_eq!(&buf2, b"Hello");
    }

    #[test]
    fn cross_block_write() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let inode = ifl.create(InodeKind::Regular);
        let mut fd = FileDescriptor::closed();
        ifl.open(&mut fd, inode);

        ifl.seek_abs(&mut fd, 126);
        assert_eq!(
            ifl.write(&mut fd, &[b'A', b'A', b'A', b'A']),
            BulkOutcome::Completed(4)
        );

        ifl.seek_abs(&mut fd, 126);
        let mut buf = [0u8; 4];
        assert_eq!(ifl.read(&mut fd, &mut buf), BulkOutcome::Completed(4));
        assert_eq!(&buf, b"AAAA");
    }

    #[test]
    fn out_of_space() {
        let mut vm = fixture();
        // Only one data block free (plus the one the mapper reserves for
        // the inode's own block list), so the file fills up quickly.
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let inode = ifl.create(InodeKind::Regular);
        let mut fd = FileDescriptor::closed();
        ifl.open(&mut fd, inode);

        // Exhaust every free data block the volume has.
        let mut total = 0usize;
        loop {
            match ifl.writec(&mut fd, 0x42) {
                WriteByte::Written => total += 1,
                WriteByte::NoFreeSpace => break,
                WriteByte::Invalid => panic!("descriptor unexpectedly invalid"),
            }
        }
        let size_before = fd.size();
        assert_eq!(ifl.writec(&mut fd, 0x43), WriteByte::NoFreeSpace);
        assert_eq!(fd.size(), size_before);
        assert!(total > 0);
    }

    #[test]
    fn seek_rel_clamps_at_zero() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let inode = ifl.create(InodeKind::Regular);
        let mut fd = FileDescriptor::closed();
        ifl.open(&mut fd, inode);

        ifl.write(&mut fd, b"abc");
        ifl.seek_rel(&mut fd, -1000);
        assert_eq!(fd.position(), 0);
    }

    #[test]
    fn seek_past_end_then_read_is_eof() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let inode = ifl.create(InodeKind::Regular);
        let mut fd = FileDescriptor::closed();
        ifl.open(&mut fd, inode);

        ifl.seek_abs(&mut fd, 1000);
        assert_eq!(ifl.readc(&mut fd), ReadByte::Eof);
    }

    #[test]
    fn seek_past_end_then_write_extends_and_reads_back_a_hole() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let inode = ifl.create(InodeKind::Regular);
        let mut fd = FileDescriptor::closed();
        ifl.open(&mut fd, inode);

        ifl.seek_abs(&mut fd, 4);
        assert_eq!(ifl.writec(&mut fd, 0x7F), WriteByte::Written);
        assert_eq!(fd.size(), 5);

        ifl.seek_abs(&mut fd, 0);
        let mut buf = [0xFFu8; 5];
        ifl.read(&mut fd, &mut buf);
        assert_eq!(buf, [0, 0, 0, 0, 0x7F]);
    }

    #[test]
    fn operations_on_closed_descriptor_are_invalid() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let mut fd = FileDescriptor::closed();

        assert_eq!(ifl.readc(&mut fd), ReadByte::Invalid);
        assert_eq!(ifl.writec(&mut fd, 1), WriteByte::Invalid);
        assert_eq!(ifl.read(&mut fd, &mut [0u8; 4]), BulkOutcome::Invalid);
        assert_eq!(ifl.write(&mut fd, &[0u8; 4]), BulkOutcome::Invalid);
        ifl.close(&mut fd); // no-op, must not panic
    }

    #[test]
    fn format_then_reopen_is_immediately_eof() {
        let mut vm = fixture();
        let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));
        let inode = ifl.create(InodeKind::Regular);
        let mut fd = FileDescriptor::closed();
        ifl.open(&mut fd, inode);
        ifl.write(&mut fd, b"data");
        ifl.close(&mut fd);

        ifl.truncate(inode);
        let mut fd2 = FileDescriptor::closed();
        ifl.open(&mut fd2, inode);
        assert_eq!(fd2.size(), 0);
        assert_eq!(ifl.readc(&mut fd2), ReadByte::Eof);
    }
}
