use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fixed_diskmap::FixedDiskMap;
use tempfile::tempdir;

const SIZES: &[(u32, u32)] = &[(8, 0), (8, 8), (16, 64), (32, 256)];
const ENTRIES: u64 = 100_000;

/// Key of `key_size` bytes whose leading bytes spell out `i`.
fn make_key(i: u64, key_size: u32) -> Vec<u8> {
    let mut key = vec![0u8; key_size as usize];
    let bytes = i.to_be_bytes();
    let n = bytes.len().min(key.len());
    key[..n].copy_from_slice(&bytes[bytes.len() - n..]);
    key
}

fn benchmark_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    group.sample_size(10);

    for &(key_size, value_size) in SIZES {
        let keys: Vec<_> = (0..ENTRIES).map(|i| make_key(i, key_size)).collect();
        let value = vec![0xABu8; value_size as usize];

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("k{key_size}_v{value_size}")),
            &keys,
            |b, keys| {
                b.iter_with_setup(
                    || {
                        let dir = tempdir().unwrap();
                        let map = FixedDiskMap::open(dir.path().join("bench.phash"), key_size, value_size)
                            .unwrap();
                        (dir, map)
                    },
                    |(dir, map)| {
                        for key in keys {
                            map.put(key, &value).unwrap();
                        }
                        map.close().unwrap();
                        drop(dir);
                    },
                );
            },
        );
    }
    group.finish();
}

fn benchmark_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for &(key_size, value_size) in SIZES {
        let dir = tempdir().unwrap();
        let map = FixedDiskMap::open(dir.path().join("bench.phash"), key_size, value_size).unwrap();
        let value = vec![0xCDu8; value_size as usize];
        let keys: Vec<_> = (0..ENTRIES).map(|i| make_key(i, key_size)).collect();
        for key in &keys {
            map.put(key, &value).unwrap();
        }

        group.bench_function(format!("k{key_size}_v{value_size}"), |b| {
            let mut i = 0usize;
            b.iter(|| {
                let hit = map.get(black_box(&keys[i % keys.len()]));
                i = i.wrapping_add(7919);
                black_box(hit)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_put, benchmark_get);
criterion_main!(benches);
