use std::io::Cursor;

use binrw::BinWrite;
use byte_store::Record;
use ext2::layout::{FileBlock, FolderBlock, Inode, InodeKind, Permissions, PointerBlock, SuperBlock};
use ext2::{BLOCK_SIZE, INODE_SIZE, SUPER_BLOCK_SIZE};

fn encoded_len<R: Record>(record: &R) -> usize {
    let mut cursor = Cursor::new(Vec::new());
    record.write_le(&mut cursor).unwrap();
    cursor.into_inner().len()
}

#[test]
fn records() {
    assert_eq!(92, SUPER_BLOCK_SIZE);
    assert_eq!(100, INODE_SIZE);
    assert_eq!(64, BLOCK_SIZE);

    assert_eq!(SuperBlock::SIZE, encoded_len(&SuperBlock::new(0, 8, 0)));
    assert_eq!(
        Inode::SIZE,
        encoded_len(&Inode::new(InodeKind::File, Permissions::default_entry(), 0))
    );
    assert_eq!(FolderBlock::SIZE, encoded_len(&FolderBlock::new(0, 0)));
    assert_eq!(FileBlock::SIZE, encoded_len(&FileBlock::new(b"abc")));
    assert_eq!(PointerBlock::SIZE, encoded_len(&PointerBlock::EMPTY));
}
