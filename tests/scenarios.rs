//! End-to-end scenarios exercising the Volume Manager and the Indexed File
//! Layer together, through the public API only.

use vfsim::{
    BulkOutcome, CylSec, FileDescriptor, IndexedFileLayer, InodeKind, VolumeDescriptor,
    VolumeManager, VolumeType, WriteByte,
};

use vfsim::testing::{MapInodeStore, MemDrive};

fn single_volume_drive(nb_blocks: u32) -> VolumeManager<MemDrive> {
    let drive = MemDrive::new(4, 16);
    let mut vm = VolumeManager::drive_start(drive).unwrap();
    vm.add_volume(VolumeDescriptor::new(CylSec::new(0, 1), nb_blocks, VolumeType::Base))
        .unwrap();
    vm
}

#[test]
fn two_volumes_address_independent_block_ranges() {
    let mut vm = VolumeManager::drive_start(MemDrive::new(4, 16)).unwrap();
    vm.add_volume(VolumeDescriptor::new(CylSec::new(0, 1), 8, VolumeType::Base))
        .unwrap();
    vm.add_volume(VolumeDescriptor::new(CylSec::new(1, 0), 4, VolumeType::Annx))
        .unwrap();

    let mut a = vec![0xAAu8; vfsim::BLOCK_SIZE];
    let mut b = vec![0xBBu8; vfsim::BLOCK_SIZE];
    vm.write_bloc(0, 0, &a).unwrap();
    vm.write_bloc(1, 0, &b).unwrap();

    a.fill(0);
    b.fill(0);
    vm.read_bloc(0, 0, &mut a).unwrap();
    vm.read_bloc(1, 0, &mut b).unwrap();
    assert!(a.iter().all(|&x| x == 0xAA));
    assert!(b.iter().all(|&x| x == 0xBB));
}

#[test]
fn a_file_written_then_reopened_keeps_its_bytes_and_size() {
    let mut vm = single_volume_drive(8);
    let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));

    let inode = ifl.create(InodeKind::Regular);
    let mut fd = FileDescriptor::closed();
    assert!(ifl.open(&mut fd, inode));
    assert_eq!(ifl.write(&mut fd, b"roundtrip"), BulkOutcome::Completed(9));
    ifl.close(&mut fd);

    let mut fd2 = FileDescriptor::closed();
    assert!(ifl.open(&mut fd2, inode));
    assert_eq!(fd2.size(), 9);
    let mut buf = [0u8; 9];
    assert_eq!(ifl.read(&mut fd2, &mut buf), BulkOutcome::Completed(9));
    assert_eq!(&buf, b"roundtrip");
}

#[test]
fn deleting_an_inode_frees_it_for_new_content() {
    let mut vm = single_volume_drive(8);
    let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 8));

    let inode = ifl.create(InodeKind::Regular);
    let mut fd = FileDescriptor::closed();
    ifl.open(&mut fd, inode);
    ifl.write(&mut fd, b"temp");
    ifl.close(&mut fd);

    assert!(ifl.delete(inode));

    let inode2 = ifl.create(InodeKind::Regular);
    let mut fd2 = FileDescriptor::closed();
    assert!(ifl.open(&mut fd2, inode2));
    assert_eq!(fd2.size(), 0);
}

#[test]
fn full_volume_reports_no_free_space_without_corrupting_existing_data() {
    let mut vm = single_volume_drive(4);
    let mut ifl = IndexedFileLayer::init(&mut vm, MapInodeStore::new(0, 4));

    let inode = ifl.create(InodeKind::Regular);
    let mut fd = FileDescriptor::closed();
    ifl.open(&mut fd, inode);

    let mut written = 0usize;
    loop {
        match ifl.writec(&mut fd, b'x') {
            WriteByte::Written => written += 1,
            WriteByte::NoFreeSpace => break,
            WriteByte::Invalid => panic!("descriptor went invalid mid-write"),
        }
    }
    assert!(written > 0);

    ifl.seek_abs(&mut fd, 0);
    let mut buf = vec![0u8; written];
    assert_eq!(
        ifl.read(&mut fd, &mut buf),
        BulkOutcome::Completed(written)
    );
    assert!(buf.iter().all(|&b| b == b'x'));
}
