// Rust FFI interface to the MCC Universal Library (libuldaq)
//
// Requires libuldaq to be installed system-wide (the vendor's
// ./configure && make && make install). Only compiled with the
// `hardware` cargo feature.
//
// This module provides a safe wrapper over the small slice of the C API
// needed for a continuous analog-input scan: inventory, connect, AI info
// queries, AInScan, scan status polling, and teardown.

use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_int, c_longlong, c_uint};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{DaqBackend, DaqBackendConfig, ScanFrame};

// MARK: - FFI declarations

const ERR_NO_ERROR: c_int = 0;

// InterfaceType bitmask
const IFC_ANY: c_uint = 1 | 2 | 4; // USB | BLUETOOTH | ETHERNET

// AiInputMode
const AI_DIFFERENTIAL: c_int = 1;
const AI_SINGLE_ENDED: c_int = 2;

// ScanOption / AInScanFlag
const SO_CONTINUOUS: c_int = 1 << 3;
const AINSCAN_FF_DEFAULT: c_int = 0;

// ScanStatus
const SS_RUNNING: c_int = 1;

// AiInfoItem, values from the enum in uldaq.h
const AI_INFO_NUM_CHANS_BY_MODE: c_int = 3;
const AI_INFO_HAS_PACER: c_int = 7;
const AI_INFO_NUM_DIFF_RANGES: c_int = 8;
const AI_INFO_NUM_SE_RANGES: c_int = 9;
const AI_INFO_DIFF_RANGE: c_int = 10;
const AI_INFO_SE_RANGE: c_int = 11;

#[repr(C)]
#[derive(Clone, Copy)]
struct DaqDeviceDescriptor {
    product_name: [c_char; 64],
    product_id: c_uint,
    dev_interface: c_uint,
    dev_string: [c_char; 64],
    unique_id: [c_char; 64],
    reserved: [c_char; 512],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct TransferStatus {
    current_scan_count: c_longlong,
    current_total_count: c_longlong,
    current_index: c_longlong,
}

type DaqDeviceHandle = c_longlong;

#[link(name = "uldaq")]
extern "C" {
    fn ulGetDaqDeviceInventory(
        interface_types: c_uint,
        daq_dev_descriptors: *mut DaqDeviceDescriptor,
        num_descriptors: *mut c_uint,
    ) -> c_int;

    fn ulCreateDaqDevice(daq_dev_descriptor: DaqDeviceDescriptor) -> DaqDeviceHandle;

    fn ulConnectDaqDevice(daq_device_handle: DaqDeviceHandle) -> c_int;

    fn ulDisconnectDaqDevice(daq_device_handle: DaqDeviceHandle) -> c_int;

    fn ulReleaseDaqDevice(daq_device_handle: DaqDeviceHandle) -> c_int;

    fn ulIsDaqDeviceConnected(
        daq_device_handle: DaqDeviceHandle,
        connected: *mut c_int,
    ) -> c_int;

    fn ulAIGetInfo(
        daq_device_handle: DaqDeviceHandle,
        info_item: c_int,
        index: c_uint,
        info_value: *mut c_longlong,
    ) -> c_int;

    fn ulAInScan(
        daq_device_handle: DaqDeviceHandle,
        low_chan: c_int,
        high_chan: c_int,
        input_mode: c_int,
        range: c_int,
        samples_per_channel: c_int,
        rate: *mut c_double,
        options: c_int,
        flags: c_int,
        data: *mut c_double,
    ) -> c_int;

    fn ulAInScanStatus(
        daq_device_handle: DaqDeviceHandle,
        status: *mut c_int,
        xfer_status: *mut TransferStatus,
    ) -> c_int;

    fn ulAInScanStop(daq_device_handle: DaqDeviceHandle) -> c_int;

    fn ulGetErrMsg(error_code: c_int, err_msg: *mut c_char) -> c_int;
}

// MARK: - Error handling

fn error_message(code: c_int) -> String {
    let mut buf = [0 as c_char; 512];
    let rc = unsafe { ulGetErrMsg(code, buf.as_mut_ptr()) };
    if rc != ERR_NO_ERROR {
        return format!("uldaq error {}", code);
    }
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn check(rc: c_int, what: &str) -> Result<()> {
    if rc == ERR_NO_ERROR {
        Ok(())
    } else {
        bail!("{} failed: {}", what, error_message(rc))
    }
}

fn cstr_field(field: &[c_char]) -> String {
    unsafe { CStr::from_ptr(field.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

// MARK: - Device inventory

/// One entry from the DAQ device inventory.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub product_name: String,
    pub unique_id: String,
    pub dev_string: String,
}

fn inventory() -> Result<Vec<DaqDeviceDescriptor>> {
    const MAX_DEVICES: usize = 16;
    let mut descriptors = [DaqDeviceDescriptor {
        product_name: [0; 64],
        product_id: 0,
        dev_interface: 0,
        dev_string: [0; 64],
        unique_id: [0; 64],
        reserved: [0; 512],
    }; MAX_DEVICES];
    let mut count = MAX_DEVICES as c_uint;

    let rc = unsafe { ulGetDaqDeviceInventory(IFC_ANY, descriptors.as_mut_ptr(), &mut count) };
    check(rc, "ulGetDaqDeviceInventory")?;

    Ok(descriptors[..count as usize].to_vec())
}

/// List available DAQ devices over any interface.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    Ok(inventory()?
        .iter()
        .map(|d| DeviceInfo {
            product_name: cstr_field(&d.product_name),
            unique_id: cstr_field(&d.unique_id),
            dev_string: cstr_field(&d.dev_string),
        })
        .collect())
}

// MARK: - Safe device wrapper

/// An open connection to one DAQ device's analog-input subsystem.
struct UldaqDevice {
    handle: DaqDeviceHandle,
    info: DeviceInfo,
    input_mode: c_int,
    range: c_int,
    channels: u16,
}

// SAFETY: the handle is an opaque token; libuldaq serializes access internally.
unsafe impl Send for UldaqDevice {}

impl UldaqDevice {
    /// Open the device at `descriptor_index`, verify hardware-paced analog
    /// input, and resolve input mode, channel count, and range.
    fn open(descriptor_index: usize, range_index: usize, channels: u16) -> Result<Self> {
        let devices = inventory()?;
        if devices.is_empty() {
            bail!("No DAQ devices found");
        }

        info!("Found {} DAQ device(s):", devices.len());
        for (i, d) in devices.iter().enumerate() {
            info!("  [{}] {} ({})", i, cstr_field(&d.product_name), cstr_field(&d.unique_id));
        }

        let descriptor = *devices
            .get(descriptor_index)
            .with_context(|| format!("Invalid descriptor index {}", descriptor_index))?;

        let handle = unsafe { ulCreateDaqDevice(descriptor) };
        if handle == 0 {
            bail!("Failed to create DAQ device");
        }

        let info = DeviceInfo {
            product_name: cstr_field(&descriptor.product_name),
            unique_id: cstr_field(&descriptor.unique_id),
            dev_string: cstr_field(&descriptor.dev_string),
        };

        let mut device = Self {
            handle,
            info,
            input_mode: AI_SINGLE_ENDED,
            range: 0,
            channels,
        };

        if device.ai_info(AI_INFO_HAS_PACER, 0)? == 0 {
            device.release();
            bail!(
                "DAQ device {} does not support hardware paced analog input",
                device.info.product_name
            );
        }

        info!("Connecting to {} - please wait...", device.info.dev_string);
        check(unsafe { ulConnectDaqDevice(handle) }, "ulConnectDaqDevice").map_err(|e| {
            device.release();
            e
        })?;

        device.resolve_input_mode()?;
        device.resolve_range(range_index)?;

        Ok(device)
    }

    fn ai_info(&self, item: c_int, index: c_uint) -> Result<i64> {
        let mut value: c_longlong = 0;
        check(
            unsafe { ulAIGetInfo(self.handle, item, index, &mut value) },
            "ulAIGetInfo",
        )?;
        Ok(value)
    }

    /// Default to single-ended input, falling back to differential when the
    /// mode reports no channels. Clamps the channel count to what the
    /// resolved mode offers.
    fn resolve_input_mode(&mut self) -> Result<()> {
        let se_chans = self.ai_info(AI_INFO_NUM_CHANS_BY_MODE, AI_SINGLE_ENDED as c_uint)?;
        self.input_mode = if se_chans > 0 { AI_SINGLE_ENDED } else { AI_DIFFERENTIAL };

        let available = self.ai_info(AI_INFO_NUM_CHANS_BY_MODE, self.input_mode as c_uint)?;
        if i64::from(self.channels) > available {
            warn!(
                "Requested {} channels but the device offers {}; clamping",
                self.channels, available
            );
            self.channels = available as u16;
        }
        Ok(())
    }

    /// Clamp the requested range index into the supported range list and
    /// resolve it to a Range value.
    fn resolve_range(&mut self, range_index: usize) -> Result<()> {
        let (num_item, range_item) = if self.input_mode == AI_SINGLE_ENDED {
            (AI_INFO_NUM_SE_RANGES, AI_INFO_SE_RANGE)
        } else {
            (AI_INFO_NUM_DIFF_RANGES, AI_INFO_DIFF_RANGE)
        };

        let num_ranges = self.ai_info(num_item, 0)?;
        if num_ranges <= 0 {
            bail!("Device reports no analog input ranges");
        }
        let index = (range_index as i64).min(num_ranges - 1);
        self.range = self.ai_info(range_item, index as c_uint)? as c_int;
        Ok(())
    }

    /// Start a continuous scan of channels 0..channels-1. The driver may
    /// adjust the rate; the actual rate is returned.
    fn start_scan(&self, samples_per_channel: usize, rate: u32, data: &mut [f64]) -> Result<f64> {
        let mut actual_rate = f64::from(rate);
        check(
            unsafe {
                ulAInScan(
                    self.handle,
                    0,
                    c_int::from(self.channels) - 1,
                    self.input_mode,
                    self.range,
                    samples_per_channel as c_int,
                    &mut actual_rate,
                    SO_CONTINUOUS,
                    AINSCAN_FF_DEFAULT,
                    data.as_mut_ptr(),
                )
            },
            "ulAInScan",
        )?;
        Ok(actual_rate)
    }

    fn scan_status(&self) -> Result<(bool, TransferStatus)> {
        let mut status: c_int = 0;
        let mut xfer = TransferStatus::default();
        check(
            unsafe { ulAInScanStatus(self.handle, &mut status, &mut xfer) },
            "ulAInScanStatus",
        )?;
        Ok((status == SS_RUNNING, xfer))
    }

    fn stop_scan(&self) {
        let rc = unsafe { ulAInScanStop(self.handle) };
        if rc != ERR_NO_ERROR {
            warn!("ulAInScanStop: {}", error_message(rc));
        }
    }

    fn release(&mut self) {
        if self.handle == 0 {
            return;
        }
        unsafe {
            let mut connected: c_int = 0;
            if ulIsDaqDeviceConnected(self.handle, &mut connected) == ERR_NO_ERROR
                && connected != 0
            {
                ulDisconnectDaqDevice(self.handle);
            }
            ulReleaseDaqDevice(self.handle);
        }
        self.handle = 0;
    }
}

impl Drop for UldaqDevice {
    fn drop(&mut self) {
        self.release();
    }
}

// MARK: - Backend implementation

/// MCC DAQ hardware backend.
///
/// Owns a blocking poll thread that mirrors the vendor's continuous-scan
/// example: start the scan, poll transfer status, and forward the scan at
/// the current buffer index as one frame per poll.
pub struct UldaqBackend {
    config: DaqBackendConfig,
    descriptor_index: usize,
    range_index: usize,
    running: Arc<AtomicBool>,
    poll_thread: Option<std::thread::JoinHandle<()>>,
}

impl UldaqBackend {
    pub fn new(
        config: DaqBackendConfig,
        descriptor_index: usize,
        range_index: usize,
    ) -> Result<Self> {
        Ok(Self {
            config,
            descriptor_index,
            range_index,
            running: Arc::new(AtomicBool::new(false)),
            poll_thread: None,
        })
    }
}

#[async_trait::async_trait]
impl DaqBackend for UldaqBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<ScanFrame>> {
        if self.is_scanning() {
            bail!("Already scanning");
        }

        let mut device = UldaqDevice::open(
            self.descriptor_index,
            self.range_index,
            self.config.channels,
        )?;
        let channels = device.channels;

        // Buffer sized like the vendor example: one file's worth of scans
        // per channel.
        let samples_per_channel =
            (self.config.sample_rate as u64 * self.config.buffer_duration_secs.max(1)) as usize;
        let mut data = vec![0.0f64; samples_per_channel * channels as usize];

        let actual_rate = device.start_scan(samples_per_channel, self.config.sample_rate, &mut data)?;
        info!(
            "{} scanning {} channel(s) at {:.6} Hz",
            device.info.product_name, channels, actual_rate
        );

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let sample_rate = actual_rate.round() as u32;

        let poll_thread = std::thread::spawn(move || {
            let started = Instant::now();
            // `data` must outlive the scan; the driver writes into it from
            // the background transfer.
            let data = data;

            while running.load(Ordering::SeqCst) {
                let (scan_running, xfer) = match device.scan_status() {
                    Ok(status) => status,
                    Err(e) => {
                        error!("Scan status poll failed: {}", e);
                        break;
                    }
                };
                if !scan_running {
                    warn!("Scan stopped by the device");
                    break;
                }

                // One reading per channel at the current index, exactly the
                // slice the vendor example displays each poll.
                let index = xfer.current_index.max(0) as usize;
                if index + channels as usize <= data.len() {
                    let frame = ScanFrame {
                        samples: data[index..index + channels as usize].to_vec(),
                        channels,
                        sample_rate,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                        total_count: xfer.current_total_count.max(0) as u64,
                    };
                    if let Err(e) = frame_tx.try_send(frame) {
                        warn!("Dropping scan frame: {}", e);
                    }
                }

                std::thread::sleep(poll_interval);
            }

            device.stop_scan();
            // Drop disconnects and releases.
        });

        self.poll_thread = Some(poll_thread);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.is_scanning() {
            return Ok(());
        }

        info!("Stopping hardware scan");
        self.running.store(false, Ordering::SeqCst);

        if let Some(thread) = self.poll_thread.take() {
            let join = tokio::task::spawn_blocking(move || thread.join());
            if join.await.context("join task panicked")?.is_err() {
                error!("Poll thread panicked");
            }
        }

        Ok(())
    }

    fn is_scanning(&self) -> bool {
        self.poll_thread.is_some()
    }

    fn name(&self) -> &str {
        "uldaq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The FFI surface encodes uldaq.h enums as plain integers; these pin
    // the values to the vendor header so a drift here shows up in CI
    // instead of as a misconfigured scan.

    #[test]
    fn ai_info_items_match_vendor_header() {
        assert_eq!(AI_INFO_NUM_CHANS_BY_MODE, 3);
        assert_eq!(AI_INFO_HAS_PACER, 7);
        assert_eq!(AI_INFO_NUM_DIFF_RANGES, 8);
        assert_eq!(AI_INFO_NUM_SE_RANGES, 9);
        assert_eq!(AI_INFO_DIFF_RANGE, 10);
        assert_eq!(AI_INFO_SE_RANGE, 11);
    }

    #[test]
    fn modes_and_options_match_vendor_header() {
        assert_eq!(AI_DIFFERENTIAL, 1);
        assert_eq!(AI_SINGLE_ENDED, 2);
        assert_eq!(SO_CONTINUOUS, 1 << 3);
        assert_eq!(AINSCAN_FF_DEFAULT, 0);
        assert_eq!(SS_RUNNING, 1);
        assert_eq!(IFC_ANY, 7);
    }
}
