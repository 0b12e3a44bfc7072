//! The inode-to-block mapper interface consumed by the Indexed File Layer.
//!
//! The mapper's internal allocation policy is not implemented by this
//! crate. This module only defines the contract; see
//! [`crate::testing::MapInodeStore`] for the bitmap-backed fixture this
//! crate's own tests drive against.

/// The type an inode was created with. The Indexed File Layer stores this
/// on the descriptor but never interprets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InodeKind {
    Regular,
    Directory,
}

/// The subset of inode metadata the Indexed File Layer reads and writes:
/// its type (set once, at creation) and its size (read at `open`, written
/// back on flush).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InodeMeta {
    pub kind: InodeKind,
    pub size: u64,
}

/// Geometry of the currently selected volume, as seen by the inode mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeInfos {
    pub block_size: u32,
    /// Also the upper bound past which an inode number is invalid: a
    /// descriptor is valid iff `0 < inode < nb_block`.
    pub nb_block: u32,
}

/// The inode-to-block mapping layer the Indexed File Layer is built on top
/// of.
pub trait InodeStore {
    /// Runs whatever one-time setup the mapper needs. Called once by
    /// [`crate::file::IndexedFileLayer::init`].
    fn init(&mut self);

    /// Returns the current volume's block size and inode-number upper
    /// bound.
    fn volume_infos(&self) -> VolumeInfos;

    /// Returns the index of the volume inodes are currently resolved
    /// against.
    fn current_volume(&self) -> u8;

    /// Creates a new inode of the given kind. Returns `0` on failure.
    fn create_inode(&mut self, kind: InodeKind) -> u32;

    /// Deletes an inode. The caller has already validated the inode number.
    fn delete_inode(&mut self, inode: u32);

    /// Truncates an inode to zero length. The caller has already validated
    /// the inode number.
    fn truncate_inode(&mut self, inode: u32);

    /// Reads an inode's metadata. The caller has already validated the
    /// inode number.
    fn read_inode(&self, inode: u32) -> InodeMeta;

    /// Writes an inode's metadata back. The caller has already validated
    /// the inode number.
    fn write_inode(&mut self, inode: u32, meta: InodeMeta);

    /// Resolves file-block index `file_block_index` of `inode` to a volume
    /// block number. When `allocate` is `false` (reads) an unmapped block
    /// returns `0` (the "hole" case). When `allocate` is `true` (writes),
    /// the mapper may allocate a fresh block on demand; `0` means
    /// allocation failed.
    fn fileblock_to_volblock(&mut self, inode: u32, file_block_index: u64, allocate: bool) -> u32;
}
