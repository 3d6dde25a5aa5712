//! Classic Bluetooth (SPP) transport over RFCOMM
//!
//! Classic printers must be paired at the OS level first; discovery only lists
//! paired devices (`bluetoothctl devices Paired`). A connection binds the
//! printer to `/dev/rfcommN` if it is not bound yet, opens the tty in raw mode
//! and keeps the file handle until disconnect.
//!
//! ```bash
//! $ bluetoothctl pair DC:0D:30:AA:BB:CC
//! $ sudo rfcomm bind 0 DC:0D:30:AA:BB:CC 1   # done on connect if missing
//! ```
//!
//! Only one Classic link is kept open at a time.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use shared::models::{PrinterDevice, TransportKind};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};

use super::{DiscoveredDevice, Transport};
use crate::error::{PrintError, PrintResult};

/// Write chunk size for the tty
const CHUNK_SIZE: usize = 4096;

const CHUNK_DELAY: Duration = Duration::from_millis(2);

/// Settle time after `bluetoothctl connect` and `rfcomm bind`
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// SPP service channel on the printer side
const SPP_CHANNEL: &str = "1";

/// Classic Bluetooth transport (Linux, BlueZ)
pub struct ClassicTransport {
    /// Local `/dev/rfcommN` index used when binding a new printer
    rfcomm_index: u8,
    links: Mutex<HashMap<String, File>>,
}

impl ClassicTransport {
    pub fn new(rfcomm_index: u8) -> Self {
        Self {
            rfcomm_index,
            links: Mutex::new(HashMap::new()),
        }
    }

    /// `/dev/rfcommN` for `mac`, binding it when no device exists yet
    ///
    /// The configured index is released first when it still points at another
    /// printer, so switching between Classic printers can rebind it.
    async fn rfcomm_device(&self, mac: &str) -> PrintResult<String> {
        let listing = rfcomm_listing().await;
        match plan_binding(&listing, mac, self.rfcomm_index) {
            RfcommPlan::Reuse(name) => {
                let path = format!("/dev/{}", name);
                if Path::new(&path).exists() {
                    debug!(path = %path, "Reusing existing RFCOMM binding");
                    return Ok(path);
                }
            }
            RfcommPlan::Rebind { previous } => {
                info!(index = self.rfcomm_index, previous = %previous, "Releasing RFCOMM binding held by another printer");
                release_rfcomm(self.rfcomm_index).await?;
            }
            RfcommPlan::Bind => {}
        }
        bind_rfcomm(mac, self.rfcomm_index).await
    }
}

#[async_trait]
impl Transport for ClassicTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Classic
    }

    fn is_exclusive(&self) -> bool {
        true
    }

    async fn check_ready(&self) -> PrintResult<()> {
        let output = run("bluetoothctl", &["show"]).await.map_err(tool_error)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if is_permission_message(&stderr) || is_permission_message(&stdout) {
            return Err(PrintError::PermissionDenied(stderr.trim().to_string()));
        }
        match parse_powered(&stdout) {
            Some(true) => Ok(()),
            Some(false) => Err(PrintError::RadioOff),
            None => Err(PrintError::Unavailable("no Bluetooth adapter found".to_string())),
        }
    }

    #[instrument(skip(self, found))]
    async fn scan(&self, found: mpsc::Sender<DiscoveredDevice>) -> PrintResult<()> {
        let mut output = run("bluetoothctl", &["devices", "Paired"])
            .await
            .map_err(tool_error)?;
        if !output.status.success() {
            // BlueZ before 5.65
            output = run("bluetoothctl", &["paired-devices"])
                .await
                .map_err(tool_error)?;
        }

        let devices = parse_paired_devices(&String::from_utf8_lossy(&output.stdout));
        info!(count = devices.len(), "Listed paired Classic devices");
        for device in devices {
            if found.send(device).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn stop_scan(&self) -> PrintResult<()> {
        Ok(())
    }

    #[instrument(skip(self, device), fields(device_id = %device.id))]
    async fn connect(&self, device: &PrinterDevice) -> PrintResult<()> {
        if !is_valid_mac(&device.id) {
            return Err(PrintError::connection(&device.id, "not a Bluetooth address"));
        }

        let path = self.rfcomm_device(&device.id).await?;
        let file = open_raw(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => {
                PrintError::PermissionDenied(format!("{}: {}", path, e))
            }
            _ => PrintError::connection(&device.id, format!("open {}: {}", path, e)),
        })?;

        info!(path = %path, "Classic link open");
        self.links.lock().await.insert(device.id.clone(), file);
        Ok(())
    }

    async fn disconnect(&self, device_id: &str) -> PrintResult<()> {
        let Some(mut file) = self.links.lock().await.remove(device_id) else {
            return Ok(());
        };
        if let Err(e) = file.flush().await {
            warn!(device_id, error = %e, "Flush on close failed");
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(data_len = data.len()))]
    async fn transmit(&self, device_id: &str, data: &[u8]) -> PrintResult<()> {
        let mut links = self.links.lock().await;
        let file = links
            .get_mut(device_id)
            .ok_or_else(|| PrintError::NotConnected(device_id.to_string()))?;

        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk)
                .await
                .map_err(|e| PrintError::transmit(device_id, e))?;
            if data.len() > CHUNK_SIZE {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }
        file.flush()
            .await
            .map_err(|e| PrintError::transmit(device_id, e))?;

        debug!("Data sent");
        Ok(())
    }
}

async fn run(program: &str, args: &[&str]) -> io::Result<Output> {
    Command::new(program).args(args).output().await
}

fn tool_error(e: io::Error) -> PrintError {
    match e.kind() {
        io::ErrorKind::NotFound => {
            PrintError::Unavailable("BlueZ tools (bluetoothctl) not installed".to_string())
        }
        io::ErrorKind::PermissionDenied => PrintError::PermissionDenied(e.to_string()),
        _ => PrintError::Unavailable(e.to_string()),
    }
}

fn is_permission_message(s: &str) -> bool {
    s.contains("Permission denied")
        || s.contains("Operation not permitted")
        || s.contains("Access denied")
}

/// `Powered:` line of `bluetoothctl show`; `None` when there is no controller
fn parse_powered(show: &str) -> Option<bool> {
    show.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Powered:"))
        .map(|v| v.trim() == "yes")
}

/// Parse `Device XX:XX:XX:XX:XX:XX Name` lines
fn parse_paired_devices(stdout: &str) -> Vec<DiscoveredDevice> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = &line[line.find("Device ")? + "Device ".len()..];
            let (mac, name) = match rest.split_once(' ') {
                Some((mac, name)) => (mac, Some(name.trim())),
                None => (rest.trim(), None),
            };
            if !is_valid_mac(mac) {
                return None;
            }
            // bluetoothctl echoes the address when the device has no name
            let name = name.filter(|n| !n.is_empty() && *n != mac.replace(':', "-"));
            Some(DiscoveredDevice::new(mac.to_uppercase(), name))
        })
        .collect()
}

/// Validate a Bluetooth MAC address (XX:XX:XX:XX:XX:XX)
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Device name bound to `mac` in `/proc/net/rfcomm` or `rfcomm -a` output
///
/// Lines look like `rfcomm0: DC:0D:30:AA:BB:CC channel 1 clean`.
fn rfcomm_name_for(listing: &str, mac: &str) -> Option<String> {
    let mac = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac))
        .find_map(|line| line.split(':').next())
        .map(|name| name.trim().to_string())
}

/// Address bound to `/dev/rfcomm{index}`, if any
fn bound_mac(listing: &str, index: u8) -> Option<String> {
    let name = format!("rfcomm{}", index);
    listing.lines().find_map(|line| {
        let (device, rest) = line.split_once(':')?;
        if device.trim() != name {
            return None;
        }
        rest.split_whitespace()
            .find(|token| is_valid_mac(token))
            .map(str::to_uppercase)
    })
}

#[derive(Debug, PartialEq, Eq)]
enum RfcommPlan {
    /// `mac` already has a device with this name
    Reuse(String),
    /// The index is free
    Bind,
    /// The index is bound to `previous` and must be released first
    Rebind { previous: String },
}

fn plan_binding(listing: &str, mac: &str, index: u8) -> RfcommPlan {
    if let Some(name) = rfcomm_name_for(listing, mac) {
        return RfcommPlan::Reuse(name);
    }
    match bound_mac(listing, index) {
        Some(previous) => RfcommPlan::Rebind { previous },
        None => RfcommPlan::Bind,
    }
}

/// Current RFCOMM bindings, empty when neither source is readable
async fn rfcomm_listing() -> String {
    match tokio::fs::read_to_string("/proc/net/rfcomm").await {
        Ok(contents) => contents,
        Err(_) => match run("rfcomm", &["-a"]).await {
            Ok(output) => String::from_utf8_lossy(&output.stdout).into_owned(),
            Err(_) => String::new(),
        },
    }
}

#[instrument]
async fn release_rfcomm(index: u8) -> PrintResult<()> {
    let index = index.to_string();
    let output = run("rfcomm", &["release", &index])
        .await
        .map_err(tool_error)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_permission_message(&stderr) {
            return Err(PrintError::PermissionDenied(format!(
                "rfcomm release needs root: {}",
                stderr.trim()
            )));
        }
        warn!(stderr = %stderr.trim(), "rfcomm release failed");
    }
    Ok(())
}

/// Connect, verify and bind `mac` to `/dev/rfcomm{index}`
#[instrument]
async fn bind_rfcomm(mac: &str, index: u8) -> PrintResult<String> {
    let mac = mac.to_uppercase();
    let path = format!("/dev/rfcomm{}", index);

    // May report "already connected"; l2ping is the real check
    let output = run("bluetoothctl", &["connect", &mac])
        .await
        .map_err(tool_error)?;
    debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "bluetoothctl connect");
    tokio::time::sleep(SETTLE_DELAY).await;

    let output = run("l2ping", &["-c", "1", &mac])
        .await
        .map_err(|e| PrintError::connection(&mac, format!("l2ping: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_permission_message(&stderr) {
            return Err(PrintError::PermissionDenied(stderr.trim().to_string()));
        }
        return Err(PrintError::connection(&mac, format!("not reachable: {}", stderr.trim())));
    }

    let index = index.to_string();
    let output = run("rfcomm", &["bind", &index, &mac, SPP_CHANNEL])
        .await
        .map_err(|e| PrintError::connection(&mac, format!("rfcomm bind: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_permission_message(&stderr) {
            return Err(PrintError::PermissionDenied(format!(
                "rfcomm bind needs root: {}",
                stderr.trim()
            )));
        }
        return Err(PrintError::connection(&mac, format!("rfcomm bind: {}", stderr.trim())));
    }

    tokio::time::sleep(SETTLE_DELAY).await;
    if !Path::new(&path).exists() {
        return Err(PrintError::connection(&mac, format!("{} was not created", path)));
    }

    info!(path = %path, "RFCOMM bound");
    Ok(path)
}

/// Open the tty for writing in raw mode
async fn open_raw(path: &str) -> io::Result<File> {
    let path = path.to_string();
    let file = tokio::task::spawn_blocking(move || {
        let file = OpenOptions::new().write(true).open(&path)?;
        configure_tty_raw(file.as_raw_fd())?;
        Ok::<_, io::Error>(file)
    })
    .await
    .map_err(io::Error::other)??;
    Ok(File::from_std(file))
}

/// Disable all tty processing so ESC/POS bytes pass unmodified
///
/// XON/XOFF must be off: 0x11 and 0x13 occur in command arguments.
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    // SAFETY: fd is an open descriptor owned by the caller, termios is written by tcgetattr
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: tcgetattr succeeded and initialised the struct
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    // SAFETY: termios is a valid, initialised struct for this fd
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
