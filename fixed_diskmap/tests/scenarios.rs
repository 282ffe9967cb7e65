use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::sync::{Arc, Barrier};
use std::thread;

use fixed_diskmap::{FixedDiskMap, FormatError, TableError, TableOptions};
use tempfile::tempdir;

fn u64_key(i: u64) -> [u8; 8] {
    i.to_be_bytes()
}

/// xorshift permutation of 0..n so lookups don't follow insertion order
fn shuffled(n: u64) -> Vec<u64> {
    let mut order: Vec<u64> = (0..n).collect();
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for i in (1..order.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        order.swap(i, (state % (i as u64 + 1)) as usize);
    }
    order
}

#[test]
fn ten_thousand_keys_grow_to_16384_slots() {
    let dir = tempdir().unwrap();
    let map = FixedDiskMap::open(dir.path().join("big.phash"), 8, 8).unwrap();
    assert_eq!(map.capacity(), 1024);

    let mut capacities = vec![map.capacity()];
    for i in 0..10_000u64 {
        map.put(&u64_key(i), &u64_key(i)).unwrap();
        assert!(map.load_factor() <= 0.7, "load factor exceeded at {i}");
        if map.capacity() != *capacities.last().unwrap() {
            capacities.push(map.capacity());
        }
    }

    assert_eq!(capacities, vec![1024, 2048, 4096, 8192, 16384]);
    assert_eq!(map.len(), 10_000);
    assert_eq!(map.stats().resizes, 4);

    for i in 0..10_000u64 {
        assert_eq!(map.get(&u64_key(i)), Some(u64_key(i).to_vec()), "key {i}");
    }
    for i in shuffled(10_000) {
        assert_eq!(map.get(&u64_key(i)), Some(u64_key(i).to_vec()), "key {i}");
    }
    assert_eq!(map.get(&u64_key(10_000)), None);
}

#[test]
fn zero_length_values() {
    let dir = tempdir().unwrap();
    let map = FixedDiskMap::open(dir.path().join("set.phash"), 8, 0).unwrap();

    map.put(&u64_key(42), &[]).unwrap();
    assert_eq!(map.get(&u64_key(42)), Some(Vec::new()));
    assert_eq!(map.get(&u64_key(43)), None);
    assert_eq!(map.stats().slot_size, 9);
}

#[test]
fn short_key_is_rejected() {
    let dir = tempdir().unwrap();
    let map = FixedDiskMap::open(dir.path().join("v.phash"), 8, 8).unwrap();

    let err = map.put(&[0u8; 7], &u64_key(1)).unwrap_err();
    assert!(matches!(
        err,
        TableError::Validation {
            field: "key",
            expected: 8,
            actual: 7
        }
    ));
    assert_eq!(map.get(&[0u8; 7]), None);
    assert!(map.is_empty());
}

#[test]
fn bad_magic_is_a_format_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("magic.phash");

    let map = FixedDiskMap::open(&path, 8, 8).unwrap();
    map.put(&u64_key(1), &u64_key(1)).unwrap();
    map.close().unwrap();

    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(b"XXXX").unwrap();
    drop(file);

    let err = FixedDiskMap::open(&path, 8, 8).err().unwrap();
    assert!(matches!(err, TableError::Format(FormatError::BadMagic(_))));
}

#[test]
fn reopen_with_different_sizes_is_a_format_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sizes.phash");
    FixedDiskMap::open(&path, 8, 8).unwrap().close().unwrap();

    let err = FixedDiskMap::open(&path, 4, 8).err().unwrap();
    assert!(matches!(
        err,
        TableError::Format(FormatError::SizeMismatch { .. })
    ));
}

#[test]
fn one_writer_many_readers() {
    let dir = tempdir().unwrap();
    let options = TableOptions::default().with_initial_slots(16);
    let map = Arc::new(FixedDiskMap::open_with(dir.path().join("rw.phash"), 8, 8, &options).unwrap());

    // readers own the low key range, the writer the high one
    for i in 0..500u64 {
        map.put(&u64_key(i), &u64_key(i * 2)).unwrap();
    }

    let start = Arc::new(Barrier::new(5));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for round in 0..20 {
                    for i in 0..500u64 {
                        assert_eq!(
                            map.get(&u64_key(i)),
                            Some(u64_key(i * 2).to_vec()),
                            "round {round} key {i}"
                        );
                    }
                }
            })
        })
        .collect();

    let writer = {
        let map = Arc::clone(&map);
        let start = Arc::clone(&start);
        thread::spawn(move || {
            start.wait();
            for i in 10_000..12_000u64 {
                map.put(&u64_key(i), &u64_key(i + 1)).unwrap();
                // visible as soon as put returns
                assert_eq!(map.get(&u64_key(i)), Some(u64_key(i + 1).to_vec()));
            }
        })
    };

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(map.len(), 2_500);
    assert!(map.capacity() >= 4096);
    for i in 10_000..12_000u64 {
        assert_eq!(map.get(&u64_key(i)), Some(u64_key(i + 1).to_vec()));
    }

    let map = Arc::try_unwrap(map).ok().unwrap();
    map.close().unwrap();
}

#[test]
fn reopen_keeps_ten_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.phash");

    {
        let map = FixedDiskMap::open(&path, 8, 8).unwrap();
        for i in 0..10u64 {
            map.put(&u64_key(i), &u64_key(i * 100)).unwrap();
        }
        map.close().unwrap();
    }

    let map = FixedDiskMap::open(&path, 8, 8).unwrap();
    assert_eq!(map.len(), 10);
    for i in 0..10u64 {
        assert_eq!(map.get(&u64_key(i)), Some(u64_key(i * 100).to_vec()));
    }
    assert_eq!(map.get(&u64_key(10)), None);
}

#[test]
fn reopen_after_resizes_sees_grown_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("grown.phash");
    let options = TableOptions::default().with_initial_slots(8);

    let map = FixedDiskMap::open_with(&path, 8, 8, &options).unwrap();
    for i in 0..100u64 {
        map.put(&u64_key(i), &u64_key(!i)).unwrap();
    }
    let stats = map.stats();
    map.close().unwrap();

    // initial_slots is ignored for an existing file
    let map = FixedDiskMap::open_with(&path, 8, 8, &TableOptions::default()).unwrap();
    assert_eq!(map.capacity(), stats.num_slots as usize);
    assert_eq!(map.len(), 100);
    for i in 0..100u64 {
        assert_eq!(map.get(&u64_key(i)), Some(u64_key(!i).to_vec()));
    }
    assert!(!dir.path().join("grown.phash.tmp").exists());
}
