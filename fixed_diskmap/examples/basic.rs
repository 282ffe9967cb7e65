use fixed_diskmap::FixedDiskMap;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::temp_dir().join("fixed_diskmap_example.phash");
    let _ = std::fs::remove_file(&path);

    // 8-byte keys and values
    let map = FixedDiskMap::open(&path, 8, 8)?;
    println!("Opened {}", path.display());

    for i in 0..10u64 {
        map.put(&i.to_be_bytes(), &(i * 100).to_be_bytes())?;
    }
    println!("Inserted 10 key-value pairs");

    for i in (0..15u64).step_by(2) {
        match map.get(&i.to_be_bytes()) {
            Some(value) => {
                let value = u64::from_be_bytes(value.as_slice().try_into()?);
                println!("Key {i} => Value {value}");
            }
            None => println!("Key {i} not found"),
        }
    }

    map.put(&2u64.to_be_bytes(), &999u64.to_be_bytes())?;
    if let Some(value) = map.get(&2u64.to_be_bytes()) {
        println!("Updated key 2 => Value {}", u64::from_be_bytes(value.as_slice().try_into()?));
    }

    println!("{:?}", map.stats());
    map.close()?;
    std::fs::remove_file(&path)?;
    Ok(())
}
