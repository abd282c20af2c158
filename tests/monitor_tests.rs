// Tests for the monitor's read path: newest-complete-file selection and
// channel column parsing.

use anyhow::Result;
use aquabat_daq::monitor::{read_all, read_channel, summarize_file};
use aquabat_daq::newest_complete_file;
use std::fs;
use tempfile::TempDir;

#[test]
fn newest_complete_file_skips_the_file_being_written() -> Result<()> {
    let temp_dir = TempDir::new()?;

    fs::write(temp_dir.path().join("1700000001.0.txt"), "0.0,0.0\n")?;
    fs::write(temp_dir.path().join("1700000002.0.txt"), "0.0,0.0\n")?;
    fs::write(temp_dir.path().join("1700000003.0.txt"), "0.0,0.0\n")?;

    // The newest file may still be mid-write; the second-newest is safe
    let newest = newest_complete_file(temp_dir.path())?.unwrap();
    assert_eq!(newest.file_name().unwrap(), "1700000002.0.txt");

    Ok(())
}

#[test]
fn newest_complete_file_single_and_empty() -> Result<()> {
    let temp_dir = TempDir::new()?;

    assert!(newest_complete_file(temp_dir.path())?.is_none());

    fs::write(temp_dir.path().join("1700000001.0.txt"), "0.0\n")?;
    let newest = newest_complete_file(temp_dir.path())?.unwrap();
    assert_eq!(newest.file_name().unwrap(), "1700000001.0.txt");

    Ok(())
}

#[test]
fn newest_complete_file_ignores_other_files() -> Result<()> {
    let temp_dir = TempDir::new()?;

    fs::write(temp_dir.path().join("session-abc.json"), "{}")?;
    fs::write(temp_dir.path().join("notes.txt"), "not data")?;
    fs::write(temp_dir.path().join("1700000005.0.txt"), "0.0\n")?;
    fs::write(temp_dir.path().join("1700000009.0.txt"), "0.0\n")?;

    let newest = newest_complete_file(temp_dir.path())?.unwrap();
    assert_eq!(newest.file_name().unwrap(), "1700000005.0.txt");

    Ok(())
}

#[test]
fn read_columns_from_data_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("1700000001.0.txt");
    fs::write(&path, "0.1,1.5\n-0.2,2.5\n0.3,3.5\n")?;

    let columns = read_all(&path, 2)?;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0], vec![0.1, -0.2, 0.3]);
    assert_eq!(columns[1], vec![1.5, 2.5, 3.5]);

    let ch1 = read_channel(&path, 1)?;
    assert_eq!(ch1, vec![1.5, 2.5, 3.5]);

    Ok(())
}

#[test]
fn read_rejects_missing_columns() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("1700000001.0.txt");
    fs::write(&path, "0.1,1.5\n")?;

    assert!(read_all(&path, 3).is_err());

    Ok(())
}

#[test]
fn read_rejects_non_numeric_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("1700000001.0.txt");
    fs::write(&path, "0.1,oops\n")?;

    assert!(read_all(&path, 2).is_err());

    Ok(())
}

#[test]
fn summarize_computes_per_channel_stats() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("1700000001.0.txt");
    fs::write(&path, "1.0,-2.0\n1.0,2.0\n1.0,-2.0\n1.0,2.0\n")?;

    let summaries = summarize_file(&path, 2)?;
    assert_eq!(summaries.len(), 2);

    assert_eq!(summaries[0].samples, 4);
    assert_eq!(summaries[0].min, 1.0);
    assert_eq!(summaries[0].max, 1.0);
    assert!((summaries[0].mean - 1.0).abs() < 1e-12);
    assert!((summaries[0].rms - 1.0).abs() < 1e-12);

    assert_eq!(summaries[1].min, -2.0);
    assert_eq!(summaries[1].max, 2.0);
    assert!(summaries[1].mean.abs() < 1e-12);
    assert!((summaries[1].rms - 2.0).abs() < 1e-12);

    Ok(())
}
