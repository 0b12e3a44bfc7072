//! A small block-device filesystem stack.
//!
//! The crate partitions a simulated cylinder/sector drive into up to
//! [`mbr::MAX_VOLUMES`] logical volumes (the [`volume::VolumeManager`]) and
//! exposes a stream-oriented file abstraction on top of one such volume (the
//! [`file::IndexedFileLayer`]). Both layers consume external collaborators
//! through traits: [`drive::Drive`] for raw sector I/O and
//! [`inode::InodeStore`] for inode-to-block resolution. Neither has a
//! production implementation here; see [`testing`] for the in-memory
//! fixtures used by this crate's own test suite.

pub mod drive;
pub mod error;
pub mod file;
pub mod inode;
pub mod mbr;
pub mod testing;
pub mod volume;

pub use drive::{Drive, DriveInfo};
pub use error::{VmError, VolumeError};
pub use file::{BulkOutcome, FileDescriptor, IndexedFileLayer, ReadByte, WriteByte};
pub use inode::{InodeKind, InodeMeta, InodeStore, VolumeInfos};
pub use mbr::{CylSec, VolumeDescriptor, VolumeType, BLOCK_SIZE, MAX_VOLUMES, MBR_MAGIC};
pub use volume::VolumeManager;
