use std::env;
use std::fs;
use std::path::PathBuf;

use disk_shell::Shell;
use partition::Session;

fn temp_disk(name: &str) -> PathBuf {
    let path = env::temp_dir()
        .join(format!("disk-shell-tests-{}", std::process::id()))
        .join(name);
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn end_to_end() {
    let disk = temp_disk("e2e.dsk");
    let disk = disk.display();
    let shell = Shell::new(Session::default());

    let script = format!(
        r#"
# 建盘与分区
mkdisk -size=1024 -unit=K -path="{disk}"
fdisk -size=512 -path="{disk}" -name=Part1
mount -path="{disk}" -name=Part1
mkfs -id=391A
mkdir -id=391A -path=/a/b -p
mkfile -id=391A -path=/a/b/f.txt -cont="hello world"
cat -id=391A -file=/a/b/f.txt
ls -id=391A -path=/a
mkdir -id=391A -path=/x/y
mount -path="{disk}" -name=Nope
"#
    );
    let report = shell.run(&script);

    assert_eq!(report.results.len(), 8, "{report}");
    assert_eq!(report.results[6], "hello world");
    assert_eq!(report.results[7], "b/");
    assert_eq!(report.errors.len(), 2, "{report}");
    assert!(report.errors[0].starts_with("mkdir: "));
    assert!(report.errors[1].starts_with("mount: "));

    let size = fs::metadata(disk.to_string()).unwrap().len();
    assert_eq!(size, 1024 * 1024);
}

#[test]
fn generated_content_and_remount() {
    let disk = temp_disk("remount.dsk");
    let disk = disk.display();

    let first = Shell::new(Session::default());
    let report = first.run(&format!(
        "mkdisk -size=1 -path={disk}\n\
         fdisk -size=64 -path={disk} -name=Data\n\
         mount -path={disk} -name=Data\n\
         mkfs -id=391A\n\
         mkfile -id=391A -path=/nums.txt -size=25\n"
    ));
    assert!(report.errors.is_empty(), "{report}");

    // 新会话的挂载表为空，需要重新挂载
    let second = Shell::new(Session::default());
    let report = second.run(&format!(
        "cat -id=391A -file=/nums.txt\n\
         mount -path={disk} -name=Data\n\
         cat -id=391A -file=/nums.txt\n\
         mounted\n\
         unmount -id=391A\n\
         fdisk -delete=full -path={disk} -name=Data\n\
         rmdisk -path={disk}\n"
    ));
    assert_eq!(report.errors.len(), 1, "{report}");
    assert!(report.errors[0].starts_with("cat: not mounted"));
    assert_eq!(report.results[1], "0123456789012345678901234");
    assert!(report.results[2].starts_with("391A -> "));
    assert_eq!(report.results.len(), 6);
    assert!(!PathBuf::from(disk.to_string()).exists());
}
