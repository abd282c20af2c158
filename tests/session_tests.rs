// End-to-end session tests against the simulated backend:
// start a scan, let it run briefly, stop it, and check what landed on disk.

use std::time::Duration;

use anyhow::Result;
use aquabat_daq::{monitor, DaqSource, ScanSession, SessionConfig};
use tempfile::TempDir;

#[tokio::test]
async fn session_writes_files_and_summary() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let config = SessionConfig {
        channels: 2,
        sample_rate: 1000,
        file_duration_secs: 1,
        data_directory: temp_dir.path().to_path_buf(),
        source: DaqSource::Simulated,
        ..SessionConfig::default()
    };
    let session_id = config.session_id.clone();

    let session = ScanSession::new(config);
    session.start().await?;
    assert!(session.stats().is_scanning);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let stats = session.stop().await?;

    assert!(!stats.is_scanning);
    assert!(stats.rows_written > 0, "should have acquired rows");
    assert!(stats.files_written >= 1, "should have rotated at least one file");
    assert!(stats.duration_secs >= 1.0);

    // Data files parse back with the right channel count
    let data_files: Vec<_> = std::fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "txt"))
        .collect();
    assert_eq!(data_files.len(), stats.files_written);

    let columns = monitor::read_all(&data_files[0], 2)?;
    assert_eq!(columns.len(), 2);
    assert!(!columns[0].is_empty());
    assert_eq!(columns[0].len(), columns[1].len());

    // Summary JSON sits next to the data files
    let summary_path = temp_dir.path().join(format!("session-{}.json", session_id));
    assert!(summary_path.exists(), "session summary should be written");

    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;
    assert_eq!(summary["config"]["channels"], 2);
    assert_eq!(summary["stats"]["files_written"], stats.files_written);
    assert_eq!(
        summary["files"].as_array().unwrap().len(),
        stats.files_written
    );

    Ok(())
}

#[tokio::test]
async fn double_start_is_harmless() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let config = SessionConfig {
        data_directory: temp_dir.path().to_path_buf(),
        source: DaqSource::Simulated,
        ..SessionConfig::default()
    };

    let session = ScanSession::new(config);
    session.start().await?;
    session.start().await?; // warns, does not fail

    tokio::time::sleep(Duration::from_millis(200)).await;
    session.stop().await?;

    Ok(())
}

#[tokio::test]
async fn stop_without_start_returns_stats() -> Result<()> {
    let session = ScanSession::new(SessionConfig {
        source: DaqSource::Simulated,
        ..SessionConfig::default()
    });

    let stats = session.stop().await?;
    assert!(!stats.is_scanning);
    assert_eq!(stats.files_written, 0);
    assert_eq!(stats.rows_written, 0);

    Ok(())
}
