use std::env;
use std::fs;
use std::path::PathBuf;

use partition::{Fit, PartType, Session, Status, table};
use vfs::Error;

fn temp_disk(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("partition-tests-{}", std::process::id()));
    let path = dir.join(name);
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn create_disk_layout() {
    let path = temp_disk("layout.dsk");
    let session = Session::default();
    session.create_disk(&path, 4096, Fit::Best).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 4096);
    let mbr = session.with_disk(&path, |disk| table::read_mbr(disk)).unwrap();
    assert_eq!(mbr.size, 4096);
    assert_eq!(mbr.fit, Fit::Best);
    assert!(mbr.partitions.iter().all(|part| part.is_free()));

    assert!(matches!(
        session.create_disk(&temp_disk("tiny.dsk"), 0, Fit::First),
        Err(Error::InvalidSize(0))
    ));

    // 放不下一个MBR的磁盘不会被创建，错误里给出下限
    let small = temp_disk("small.dsk");
    let err = session.create_disk(&small, 100, Fit::First).unwrap_err();
    assert!(matches!(err, Error::DiskTooSmall { size: 100, min: 209 }));
    assert!(err.to_string().contains("209"));
    assert!(!small.exists());
}

#[test]
fn mount_lifecycle() {
    let path = temp_disk("mount.dsk");
    let session = Session::new("39");
    session.create_disk(&path, 16 * 1024, Fit::First).unwrap();
    session
        .create_partition(&path, PartType::Primary, Fit::Worst, 1024, "Part1")
        .unwrap();
    session
        .create_partition(&path, PartType::Extended, Fit::Worst, 4096, "Ext")
        .unwrap();
    session
        .create_partition(&path, PartType::Logical, Fit::Worst, 512, "Log1")
        .unwrap();

    assert!(matches!(session.mount(&path, "nope"), Err(Error::NotFound(_))));
    assert!(matches!(session.mount(&path, "Ext"), Err(Error::NotPrimary(_))));
    assert!(matches!(session.mount(&path, "Log1"), Err(Error::NotPrimary(_))));

    let id = session.mount(&path, "Part1").unwrap();
    assert_eq!(id, "391A");
    assert_eq!(session.mount(&path, "Part1").unwrap(), id);

    let (part, mounted_path) = session.resolve_mounted(&id).unwrap();
    assert_eq!(part.name(), "Part1");
    assert_eq!(part.status, Status::Mounted);
    assert_eq!(mounted_path, path.canonicalize().unwrap());
    assert_eq!(session.mounted().len(), 1);

    assert!(matches!(
        session.delete_partition(&path, "Part1"),
        Err(Error::Busy(_))
    ));

    session.unmount(&id).unwrap();
    assert!(matches!(session.resolve_mounted(&id), Err(Error::NotMounted(_))));
    session.delete_partition(&path, "Part1").unwrap();
}

#[test]
fn second_disk_gets_next_letter() {
    let first = temp_disk("letter-a.dsk");
    let second = temp_disk("letter-b.dsk");
    let session = Session::default();
    for path in [&first, &second] {
        session.create_disk(path, 4096, Fit::First).unwrap();
        session
            .create_partition(path, PartType::Primary, Fit::First, 1024, "p")
            .unwrap();
    }

    assert_eq!(session.mount(&first, "p").unwrap(), "391A");
    assert_eq!(session.mount(&second, "p").unwrap(), "391B");

    session.delete_disk(&second).unwrap();
    assert!(!second.exists());
    assert!(matches!(session.resolve_mounted("391B"), Err(Error::NotMounted(_))));
    assert!(matches!(session.delete_disk(&second), Err(Error::NotFound(_))));
}
