use std::time::Duration;
use tempfile::TempDir;
use zpress_cache::CacheManager;
use zpress_config::CacheConfig;

fn cache_in(dir: &TempDir, retention: Duration) -> CacheManager {
    CacheManager::new(CacheConfig {
        dir: dir.path().to_path_buf(),
        max_size: 1024 * 1024,
        retention,
        sweep_interval: Duration::from_millis(20),
        low_watermark: 0.8,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_sweep_evicts_expired_entries() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir, Duration::from_millis(50));

    let path = temp_dir.path().join("artifact");
    std::fs::write(&path, b"payload").unwrap();
    cache.put("artifact", &path, 7);
    assert!(cache.start_sweeper());

    let mut evicted = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if !cache.contains("artifact") {
            evicted = true;
            break;
        }
    }

    assert!(evicted, "entry should expire without any further access");
    assert!(!path.exists());
    assert_eq!(cache.current_size(), 0);
    assert!(cache.statistics().sweeps >= 1);
    cache.stop_sweeper();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_sweep_keeps_fresh_entries() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir, Duration::from_secs(3600));

    let path = temp_dir.path().join("artifact");
    std::fs::write(&path, b"payload").unwrap();
    cache.put("artifact", &path, 7);
    assert!(cache.start_sweeper());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(cache.get("artifact"), Some(path.clone()));
    assert!(path.exists());
    cache.stop_sweeper();
}
