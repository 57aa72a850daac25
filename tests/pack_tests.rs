//! Output side: directory preparation, batch encoding, verify records.

mod common;

use crossbeam_channel::unbounded;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{bodies, collect};
use tarbridge::fs::{FileKind, FileSystem, MemFs, OsFs, ReadOnlyFs};
use tarbridge::pipeline::{
    CompletionBarrier, OutputPath, TarballBuilder, create_output_channels, encode_batch, ensure,
    unpack,
};
use tarbridge::{BridgeError, Message, Verify};

/// Queue `messages`, close the queue, pack with `batch_size`. Returns (result, verifies).
fn pack_all(
    fs: &dyn FileSystem,
    out: &Path,
    batch_size: usize,
    messages: Vec<Message>,
) -> (tarbridge::Result<usize>, Vec<Verify>) {
    let (tx, rx) = unbounded();
    for m in messages {
        tx.send(m).unwrap();
    }
    drop(tx);
    let (verify_tx, verify_rx) = unbounded();
    let result = TarballBuilder::new(batch_size)
        .unwrap()
        .pack(&rx, fs, out, &verify_tx);
    drop(verify_tx);
    (result, verify_rx.iter().collect())
}

/// Decode one batch file back into messages.
fn read_batch(fs: &dyn FileSystem, file: &Path) -> Vec<Message> {
    let (tx, rx) = unbounded();
    unpack(file, fs.open(file).unwrap(), &tx, &CompletionBarrier::new()).unwrap();
    collect(&rx)
}

fn numbered(n: usize) -> Vec<Message> {
    (1..=n)
        .map(|i| Message::new(format!("body-{i}"), "numbers"))
        .collect()
}

// --- ensure ---

#[test]
fn test_ensure_creates_missing_directory_with_parents() {
    let fs = MemFs::new();
    ensure(&fs, Path::new("out/nested/deeper")).unwrap();
    assert_eq!(fs.metadata(Path::new("out")).unwrap(), FileKind::Dir);
    assert_eq!(
        fs.metadata(Path::new("out/nested/deeper")).unwrap(),
        FileKind::Dir
    );
}

#[test]
fn test_ensure_is_idempotent() {
    let fs = MemFs::new();
    ensure(&fs, Path::new("out")).unwrap();
    ensure(&fs, Path::new("out")).unwrap();
    assert!(fs.exists(Path::new("out")));
}

#[test]
fn test_ensure_on_read_only_fs_is_permission_error_and_creates_nothing() {
    let mem = MemFs::new();
    mem.create_dir_all(Path::new("data")).unwrap();
    let ro = ReadOnlyFs::new(mem.clone());

    let err = ensure(&ro, Path::new("data/creates_directory2")).unwrap_err();
    assert!(err.is_permission(), "unexpected error: {err}");
    assert!(!mem.exists(Path::new("data/creates_directory2")));
}

#[test]
fn test_ensure_existing_directory_on_read_only_fs_is_ok() {
    let mem = MemFs::new();
    mem.create_dir_all(Path::new("data")).unwrap();
    ensure(&ReadOnlyFs::new(mem), Path::new("data")).unwrap();
}

#[test]
fn test_ensure_path_that_is_a_file_fails() {
    let fs = MemFs::new();
    fs.add_file("out", "not a dir").unwrap();
    assert!(ensure(&fs, Path::new("out")).is_err());
}

#[test]
fn test_ensure_real_directory() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("a/b/c");
    ensure(&OsFs, &target).unwrap();
    assert!(target.is_dir());
    ensure(&OsFs, &target).unwrap();
}

#[test]
fn test_output_path_new_creates_directory() {
    let mem = MemFs::new();
    let out = OutputPath::new(Arc::new(mem.clone()), Path::new("data/creates_directory"), 100)
        .unwrap();
    assert_eq!(out.dir(), Path::new("data/creates_directory"));
    assert!(mem.exists(Path::new("data/creates_directory")));
}

#[test]
fn test_output_path_rejects_zero_batch_size() {
    let err = OutputPath::new(Arc::new(MemFs::new()), Path::new("out"), 0).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidConfig(_)));
}

// --- pack ---

#[test]
fn test_builder_rejects_zero_batch_size() {
    assert!(matches!(
        TarballBuilder::new(0),
        Err(BridgeError::InvalidConfig(_))
    ));
}

#[test]
fn test_pack_empty_stream_writes_nothing() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();

    let (result, verifies) = pack_all(&fs, Path::new("out"), 10, Vec::new());

    assert_eq!(result.unwrap(), 0);
    assert!(verifies.is_empty());
    assert!(fs.read_dir(Path::new("out")).unwrap().is_empty());
}

#[test]
fn test_pack_splits_into_ceil_k_over_b_batches() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();

    let (result, verifies) = pack_all(&fs, Path::new("out"), 2, numbered(5));

    assert_eq!(result.unwrap(), 3);
    assert_eq!(fs.read_dir(Path::new("out")).unwrap().len(), 3);
    assert_eq!(verifies.len(), 3);
    assert!(verifies.iter().all(|v| v.success && v.error.is_none()));
    let counts: Vec<usize> = verifies.iter().map(|v| v.batch.message_count).collect();
    assert_eq!(counts, [2, 2, 1]);
    let sequences: Vec<u64> = verifies.iter().map(|v| v.batch.sequence).collect();
    assert_eq!(sequences, [1, 2, 3]);

    let mut all = Vec::new();
    for v in &verifies {
        assert!(v.batch.file.starts_with("out"));
        all.extend(read_batch(&fs, &v.batch.file));
    }
    assert_eq!(
        bodies(&all),
        ["body-1", "body-2", "body-3", "body-4", "body-5"]
    );
}

#[test]
fn test_pack_exact_multiple_has_no_trailing_batch() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let (result, verifies) = pack_all(&fs, Path::new("out"), 3, numbered(6));
    assert_eq!(result.unwrap(), 2);
    assert_eq!(verifies.len(), 2);
}

#[test]
fn test_pack_then_unpack_round_trip() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let original = vec![
        Message::new("hello", "greetings.en").with_header("lang", "en"),
        Message::new(Vec::new(), "empty.body"),
        Message::new(vec![0u8, 159, 146, 150], "")
            .with_header("content-type", "application/octet-stream")
            .with_header("x-retry", "3"),
    ];

    let (result, verifies) = pack_all(&fs, Path::new("out"), 10, original.clone());

    assert_eq!(result.unwrap(), 1);
    assert_eq!(read_batch(&fs, &verifies[0].batch.file), original);
}

#[test]
fn test_pack_round_trip_keeps_awkward_header_values() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let original = vec![
        Message::new("b", "rk")
            .with_header("x.filter", "a=b=c")
            .with_header("spaced key", "tab\tand space")
            .with_header("empty", ""),
    ];

    let (result, verifies) = pack_all(&fs, Path::new("out"), 10, original.clone());

    assert_eq!(result.unwrap(), 1);
    assert_eq!(read_batch(&fs, &verifies[0].batch.file), original);
}

#[test]
fn test_pack_header_name_with_equals_fails_the_batch() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let messages = vec![Message::new("b", "rk").with_header("a=b", "v")];

    let (result, verifies) = pack_all(&fs, Path::new("out"), 10, messages);

    let err = result.unwrap_err();
    assert!(
        matches!(&err, BridgeError::Io { source, .. } if source.kind() == io::ErrorKind::InvalidInput),
        "unexpected error: {err}"
    );
    assert_eq!(verifies.len(), 1);
    assert!(!verifies[0].success);
    assert!(fs.read_dir(Path::new("out")).unwrap().is_empty());
}

#[test]
fn test_encode_batch_rejects_unstorable_attributes() {
    let cases = [
        Message::new("b", "rk").with_header("a=b", "v"),
        Message::new("b", "rk").with_header("line\nbreak", "v"),
        Message::new("b", "rk").with_header("nul\0byte", "v"),
        Message::new("b", "rk").with_header("k", "one\ntwo"),
        Message::new("b", "route\nsplit"),
    ];
    for message in cases {
        let err = encode_batch(std::slice::from_ref(&message)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{message:?}");
    }
}

#[test]
fn test_pack_entry_names_unique_within_batch() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let (_, verifies) = pack_all(&fs, Path::new("out"), 50, numbered(20));

    let bytes = fs.contents(&verifies[0].batch.file).unwrap();
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes.as_slice()));
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(names.len(), 20);
    assert_eq!(unique.len(), 20);
}

#[test]
fn test_pack_verify_carries_last_delivery_tag() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let messages: Vec<Message> = (1..=3)
        .map(|tag| Message::new("m", "k").with_delivery_tag(tag))
        .collect();

    let (_, verifies) = pack_all(&fs, Path::new("out"), 2, messages);

    assert_eq!(verifies[0].batch.last_delivery_tag, Some(2));
    assert!(verifies[0].batch.multiple);
    assert_eq!(verifies[1].batch.last_delivery_tag, Some(3));
}

#[test]
fn test_pack_without_delivery_tags_is_not_multiple() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let (_, verifies) = pack_all(&fs, Path::new("out"), 2, numbered(1));
    assert_eq!(verifies[0].batch.last_delivery_tag, None);
    assert!(!verifies[0].batch.multiple);
}

#[test]
fn test_pack_sequential_builders_never_overwrite() {
    let fs = MemFs::new();
    fs.create_dir_all(Path::new("out")).unwrap();
    let (first, v1) = pack_all(&fs, Path::new("out"), 5, numbered(1));
    let (second, v2) = pack_all(&fs, Path::new("out"), 5, numbered(1));

    assert_eq!(first.unwrap() + second.unwrap(), 2);
    assert_ne!(v1[0].batch.file, v2[0].batch.file);
    assert_eq!(fs.read_dir(Path::new("out")).unwrap().len(), 2);
}

#[test]
fn test_pack_read_only_fs_reports_failed_verify() {
    let mem = MemFs::new();
    mem.create_dir_all(Path::new("out")).unwrap();
    let ro = ReadOnlyFs::new(mem.clone());

    let (result, verifies) = pack_all(&ro, Path::new("out"), 2, numbered(3));

    let err = result.unwrap_err();
    assert!(err.is_permission(), "unexpected error: {err}");
    assert_eq!(verifies.len(), 1);
    assert!(!verifies[0].success);
    assert!(verifies[0].error.is_some());
    assert!(mem.read_dir(Path::new("out")).unwrap().is_empty());
}

/// Lets `allowed` writes through, then fails every write after that.
#[derive(Debug)]
struct FailingWrites {
    inner: MemFs,
    allowed: AtomicUsize,
}

impl FileSystem for FailingWrites {
    fn metadata(&self, path: &Path) -> io::Result<FileKind> {
        self.inner.metadata(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        self.inner.read_dir(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        self.inner.open(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let left = self.allowed.load(Ordering::SeqCst);
        if left == 0 {
            return Err(io::Error::other("disk full"));
        }
        self.allowed.store(left - 1, Ordering::SeqCst);
        self.inner.write(path, data)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }
}

#[test]
fn test_pack_failure_keeps_earlier_batches() {
    let mem = MemFs::new();
    mem.create_dir_all(Path::new("out")).unwrap();
    let fs = FailingWrites {
        inner: mem.clone(),
        allowed: AtomicUsize::new(1),
    };

    let (result, verifies) = pack_all(&fs, Path::new("out"), 1, numbered(3));

    assert!(matches!(result, Err(BridgeError::Io { .. })));
    assert_eq!(verifies.len(), 2);
    assert!(verifies[0].success);
    assert!(!verifies[1].success);
    let kept: Vec<PathBuf> = mem
        .read_dir(Path::new("out"))
        .unwrap()
        .into_iter()
        .map(|n| Path::new("out").join(n))
        .collect();
    assert_eq!(kept, vec![verifies[0].batch.file.clone()]);
    assert_eq!(bodies(&read_batch(&mem, &kept[0])), ["body-1"]);
}

#[test]
fn test_output_path_receive_writes_real_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("batches");
    let out = OutputPath::new(tarbridge::fs::os(), &target, 2).unwrap();

    let channels = create_output_channels(4);
    for m in numbered(3) {
        channels.tx.send(m).unwrap();
    }
    drop(channels.tx);

    assert_eq!(out.receive(&channels.rx, &channels.verify_tx).unwrap(), 2);
    drop(channels.verify_tx);
    let verifies: Vec<Verify> = channels.verify_rx.iter().collect();
    assert_eq!(verifies.len(), 2);
    for v in &verifies {
        assert!(v.batch.file.is_file());
        assert!(v.batch.file.extension().is_some_and(|e| e == "tgz"));
    }
}
