//! # 分区表操作
//!
//! 所有函数都直接作用于字节存储，互斥由调用方（[`Session`](crate::Session)）负责。

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use byte_store::{ByteStore, DiskFile, encode_name, read_record, unix_now, write_record, zero_fill};
use rand_core::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use vfs::{Error, Result};

use crate::fit::{self, Gap};
use crate::layout::{EBR_SIZE, Ebr, Fit, ID_LEN, MBR_SIZE, Mbr, NAME_LEN, PartType, Partition, Status};

/// Creates a zero-filled disk image holding an empty partition table.
pub fn create_disk(path: &Path, size: i64, fit: Fit) -> Result<DiskFile> {
    check_disk_size(size)?;

    let disk = DiskFile::create(path, size as u64)?;
    let mbr = init_table(&disk, fit)?;
    log::info!(
        "disk {path:?} created: {size} bytes, fit {fit}, signature {:#010x}",
        mbr.signature
    );

    Ok(disk)
}

pub fn delete_disk(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::NotFound(path.display().to_string()));
    }

    fs::remove_file(path)?;
    log::info!("disk {path:?} removed");
    Ok(())
}

/// A disk must at least hold its MBR.
fn check_disk_size(size: i64) -> Result<()> {
    if size < 1 {
        return Err(Error::InvalidSize(size));
    }
    if size < MBR_SIZE as i64 {
        return Err(Error::DiskTooSmall {
            size,
            min: MBR_SIZE,
        });
    }
    Ok(())
}

/// Writes a fresh MBR with all four entries free.
pub fn init_table(store: &dyn ByteStore, fit: Fit) -> Result<Mbr> {
    let size = store.len()? as i64;
    check_disk_size(size)?;

    let mbr = Mbr::new(size, unix_now(), random_signature(), fit);
    write_mbr(store, &mbr)?;
    Ok(mbr)
}

#[inline]
pub fn read_mbr(store: &dyn ByteStore) -> Result<Mbr> {
    read_record(store, 0)
}

#[inline]
pub fn write_mbr(store: &dyn ByteStore, mbr: &Mbr) -> Result<()> {
    write_record(store, 0, MBR_SIZE, mbr)
}

/// 创建分区，返回其数据区首字节的偏移。
///
/// 检查顺序：类型，空间，名称。
pub fn create_partition(
    store: &dyn ByteStore,
    kind: PartType,
    fit: Fit,
    size: i64,
    name: &str,
) -> Result<i64> {
    if size < 1 {
        return Err(Error::InvalidSize(size));
    }
    let name_field = encode_name::<NAME_LEN>(name)?;

    let mut mbr = read_mbr(store)?;
    let extended = mbr.extended().map(|(_, part)| *part);
    match (kind, extended) {
        (PartType::Extended, Some(_)) => {
            return Err(Error::InvalidPartitionType(
                "an extended partition already exists".to_owned(),
            ));
        }
        (PartType::Logical, None) => {
            return Err(Error::InvalidPartitionType(
                "a logical partition needs an extended partition".to_owned(),
            ));
        }
        _ => {}
    }

    if let (PartType::Logical, Some(extended)) = (kind, extended) {
        return create_logical(store, &mbr, &extended, fit, size, name, name_field);
    }

    if kind == PartType::Extended && size < EBR_SIZE as i64 {
        return Err(Error::InvalidSize(size));
    }
    let slot = mbr
        .partitions
        .iter()
        .position(Partition::is_free)
        .ok_or(Error::NoSpaceAvailable(size))?;
    let gaps = fit::free_gaps(mbr.used_ranges(), MBR_SIZE as i64, mbr.size);
    let Gap { start, .. } = fit.choose(&gaps, size).ok_or(Error::NoSpaceAvailable(size))?;
    check_unique(store, &mbr, name)?;

    let entry = Partition {
        status: Status::Unused,
        kind,
        fit,
        start,
        size,
        name: name_field,
        correlative: slot as i32 + 1,
        id: [0; ID_LEN],
    };
    mbr.partitions[slot] = entry;
    write_mbr(store, &mbr)?;
    if kind == PartType::Extended {
        write_record(store, start as u64, (start + size) as u64, &Ebr::empty(fit))?;
    }

    if read_mbr(store)?.partitions[slot] != entry {
        return Err(Error::Corrupt(format!("partition {name} did not persist")));
    }
    log::info!("{kind} partition {name} created at {start} with {size} bytes");

    Ok(start)
}

fn create_logical(
    store: &dyn ByteStore,
    mbr: &Mbr,
    extended: &Partition,
    fit: Fit,
    size: i64,
    name: &str,
    name_field: [u8; NAME_LEN],
) -> Result<i64> {
    let chain = read_chain(store, extended)?;
    let ext_start = extended.start;
    let ext_end = extended.start + extended.size;
    let used = chain
        .iter()
        .filter(|(_, ebr)| !ebr.is_empty())
        .map(|(offset, ebr)| (*offset, *offset + EBR_SIZE as i64 + ebr.size));
    let gaps = fit::free_gaps(used, ext_start, ext_end);

    let footprint = EBR_SIZE as i64 + size;
    let Gap { start: offset, .. } = fit
        .choose(&gaps, footprint)
        .ok_or(Error::NoSpaceAvailable(size))?;
    check_unique(store, mbr, name)?;

    let data_start = offset + EBR_SIZE as i64;
    let mut node = Ebr {
        mount: Status::Unused,
        fit,
        start: data_start,
        size,
        next: -1,
        name: name_field,
    };

    if offset == ext_start {
        // 空的链表头就地复用
        let (_, head) = &chain[0];
        node.next = head.next;
        write_record(store, offset as u64, ext_end as u64, &node)?;
    } else {
        let Some((pred_offset, pred)) = chain.iter().rev().find(|(at, _)| *at < offset) else {
            return Err(Error::Corrupt(format!("no EBR precedes offset {offset}")));
        };
        node.next = pred.next;
        write_record(store, offset as u64, ext_end as u64, &node)?;

        let mut pred = pred.clone();
        pred.next = offset;
        write_record(store, *pred_offset as u64, ext_end as u64, &pred)?;
    }

    let written: Ebr = read_record(store, offset as u64)?;
    if written != node {
        return Err(Error::Corrupt(format!("logical partition {name} did not persist")));
    }
    log::info!("logical partition {name} created at {data_start} with {size} bytes");

    Ok(data_start)
}

/// Frees the partition named `name`.
///
/// Primary and extended entries are released and their range zero-filled.
/// Logical ones are unlinked from the EBR chain, the head being emptied in place.
pub fn delete_partition(store: &dyn ByteStore, name: &str) -> Result<()> {
    let mut mbr = read_mbr(store)?;

    if let Some((slot, part)) = mbr.find(name) {
        let Partition { start, size, .. } = *part;
        mbr.partitions[slot] = Partition::FREE;
        write_mbr(store, &mbr)?;
        zero_fill(store, start as u64, size as u64)?;
        log::info!("partition {name} deleted");
        return Ok(());
    }

    let Some((_, extended)) = mbr.extended() else {
        return Err(Error::NotFound(name.to_owned()));
    };
    let ext_end = (extended.start + extended.size) as u64;
    let chain = read_chain(store, extended)?;
    let Some(index) = chain
        .iter()
        .position(|(_, ebr)| !ebr.is_empty() && ebr.name() == name)
    else {
        return Err(Error::NotFound(name.to_owned()));
    };

    let (offset, node) = &chain[index];
    if index == 0 {
        let mut head = Ebr::empty(node.fit);
        head.next = node.next;
        write_record(store, *offset as u64, ext_end, &head)?;
        zero_fill(store, node.start as u64, node.size as u64)?;
    } else {
        let (pred_offset, pred) = &chain[index - 1];
        let mut pred = pred.clone();
        pred.next = node.next;
        write_record(store, *pred_offset as u64, ext_end, &pred)?;
        zero_fill(store, *offset as u64, EBR_SIZE + node.size as u64)?;
    }
    log::info!("logical partition {name} deleted");

    Ok(())
}

/// Walks the EBR chain of `extended`, head included.
///
/// Offsets must strictly increase and stay inside the extended partition,
/// which also rules out cycles.
pub fn read_chain(store: &dyn ByteStore, extended: &Partition) -> Result<Vec<(i64, Ebr)>> {
    let end = extended.start + extended.size;
    let mut chain = Vec::new();
    let mut offset = extended.start;

    loop {
        if offset + EBR_SIZE as i64 > end {
            return Err(Error::Corrupt(format!("EBR at {offset} leaves the extended partition")));
        }
        let ebr: Ebr = read_record(store, offset as u64)?;
        let next = ebr.next;
        chain.push((offset, ebr));

        if next == -1 {
            break;
        }
        if next <= offset {
            return Err(Error::Corrupt(format!("EBR chain goes back from {offset} to {next}")));
        }
        offset = next;
    }

    Ok(chain)
}

/// Used logical partitions of the disk, in chain order.
pub fn logical_partitions(store: &dyn ByteStore, mbr: &Mbr) -> Result<Vec<Ebr>> {
    let Some((_, extended)) = mbr.extended() else {
        return Ok(Vec::new());
    };

    Ok(read_chain(store, extended)?
        .into_iter()
        .map(|(_, ebr)| ebr)
        .filter(|ebr| !ebr.is_empty())
        .collect())
}

fn check_unique(store: &dyn ByteStore, mbr: &Mbr, name: &str) -> Result<()> {
    let taken = mbr.find(name).is_some()
        || logical_partitions(store, mbr)?
            .iter()
            .any(|ebr| ebr.name() == name);
    if taken {
        return Err(Error::DuplicateName(name.to_owned()));
    }
    Ok(())
}

fn random_signature() -> u32 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    Xoshiro256PlusPlus::seed_from_u64(seed).next_u32()
}

#[cfg(test)]
mod tests {
    use byte_store::MemStore;

    use super::*;

    const K: i64 = 1024;

    fn disk(size: usize) -> MemStore {
        let store = MemStore::new(size);
        init_table(&store, Fit::First).unwrap();
        store
    }

    #[test]
    fn table_needs_room_for_mbr() {
        assert!(matches!(
            init_table(&MemStore::new(MBR_SIZE as usize - 1), Fit::First),
            Err(Error::DiskTooSmall { size: 208, min: MBR_SIZE })
        ));
        assert!(init_table(&MemStore::new(MBR_SIZE as usize), Fit::First).is_ok());
    }

    #[test]
    fn empty_table() {
        let store = disk(4096);
        let mbr = read_mbr(&store).unwrap();
        assert_eq!(mbr.size, 4096);
        assert!(mbr.partitions.iter().all(Partition::is_free));
        assert!(mbr.extended().is_none());
    }

    #[test]
    fn primaries_are_packed_after_mbr() {
        let store = disk(8 * K as usize);
        let a = create_partition(&store, PartType::Primary, Fit::First, K, "a").unwrap();
        let b = create_partition(&store, PartType::Primary, Fit::First, K, "b").unwrap();
        assert_eq!(a, MBR_SIZE as i64);
        assert_eq!(b, a + K);

        let mbr = read_mbr(&store).unwrap();
        assert_eq!(mbr.partitions[0].correlative, 1);
        assert_eq!(mbr.partitions[1].correlative, 2);
        assert_eq!(mbr.partitions[1].name(), "b");
    }

    #[test]
    fn fifth_entry_has_no_slot() {
        let store = disk(8 * K as usize);
        for name in ["a", "b", "c", "d"] {
            create_partition(&store, PartType::Primary, Fit::First, 100, name).unwrap();
        }
        assert!(matches!(
            create_partition(&store, PartType::Primary, Fit::First, 100, "e"),
            Err(Error::NoSpaceAvailable(100))
        ));
    }

    #[test]
    fn type_rules() {
        let store = disk(8 * K as usize);
        assert!(matches!(
            create_partition(&store, PartType::Logical, Fit::First, 100, "l"),
            Err(Error::InvalidPartitionType(_))
        ));
        create_partition(&store, PartType::Extended, Fit::First, 2 * K, "e").unwrap();
        assert!(matches!(
            create_partition(&store, PartType::Extended, Fit::First, 100, "e2"),
            Err(Error::InvalidPartitionType(_))
        ));
    }

    #[test]
    fn duplicate_and_oversized() {
        let store = disk(4 * K as usize);
        create_partition(&store, PartType::Primary, Fit::First, K, "a").unwrap();
        assert!(matches!(
            create_partition(&store, PartType::Primary, Fit::First, K, "a"),
            Err(Error::DuplicateName(_))
        ));
        assert!(matches!(
            create_partition(&store, PartType::Primary, Fit::First, 4 * K, "big"),
            Err(Error::NoSpaceAvailable(_))
        ));
        assert!(matches!(
            create_partition(&store, PartType::Primary, Fit::First, 0, "zero"),
            Err(Error::InvalidSize(0))
        ));
    }

    #[test]
    fn logical_chain() {
        let store = disk(8 * K as usize);
        let ext = create_partition(&store, PartType::Extended, Fit::First, 2 * K, "ext").unwrap();
        let l1 = create_partition(&store, PartType::Logical, Fit::First, 100, "l1").unwrap();
        let l2 = create_partition(&store, PartType::Logical, Fit::First, 200, "l2").unwrap();
        assert_eq!(l1, ext + EBR_SIZE as i64);
        assert_eq!(l2, l1 + 100 + EBR_SIZE as i64);

        let mbr = read_mbr(&store).unwrap();
        let (_, extended) = mbr.extended().unwrap();
        let chain = read_chain(&store, extended).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].1.next, chain[1].0);
        assert_eq!(chain[1].1.next, -1);

        // 逻辑分区名与主分区名共享命名空间
        assert!(matches!(
            create_partition(&store, PartType::Primary, Fit::First, 100, "l2"),
            Err(Error::DuplicateName(_))
        ));
    }

    #[test]
    fn logical_reuses_freed_head() {
        let store = disk(8 * K as usize);
        let ext = create_partition(&store, PartType::Extended, Fit::First, 2 * K, "ext").unwrap();
        create_partition(&store, PartType::Logical, Fit::First, 100, "l1").unwrap();
        create_partition(&store, PartType::Logical, Fit::First, 100, "l2").unwrap();

        delete_partition(&store, "l1").unwrap();
        let mbr = read_mbr(&store).unwrap();
        let names: Vec<_> = logical_partitions(&store, &mbr)
            .unwrap()
            .iter()
            .map(Ebr::name)
            .collect();
        assert_eq!(names, ["l2"]);

        let again = create_partition(&store, PartType::Logical, Fit::First, 50, "l3").unwrap();
        assert_eq!(again, ext + EBR_SIZE as i64);
        let names: Vec<_> = logical_partitions(&store, &mbr)
            .unwrap()
            .iter()
            .map(Ebr::name)
            .collect();
        assert_eq!(names, ["l3", "l2"]);
    }

    #[test]
    fn delete_primary_frees_slot() {
        let store = disk(4 * K as usize);
        create_partition(&store, PartType::Primary, Fit::First, K, "a").unwrap();
        delete_partition(&store, "a").unwrap();
        assert!(read_mbr(&store).unwrap().partitions.iter().all(Partition::is_free));
        assert!(matches!(delete_partition(&store, "a"), Err(Error::NotFound(_))));
    }
}
