//! Touch-video devices.
//!
//! Some touchscreens expose a companion `/dev/v4l-touch*` node streaming capacitance heatmap
//! frames. The hub only manages the descriptor lifecycle and a bounded frame queue; decoding the
//! frames is its consumer's business. A video device starts out unattached and is paired with
//! the touchscreen whose evdev node it points back to through sysfs.

use std::{
    collections::VecDeque,
    fmt, fs,
    fs::File,
    io::{self, Read},
    os::{
        fd::{AsRawFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    path::{Path, PathBuf},
};

use crate::event::now_nanos;

/// Frames queued beyond this are dropped, oldest first.
const MAX_QUEUED_FRAMES: usize = 20;

/// Upper bound on a single frame read.
const MAX_FRAME_BYTES: usize = 4096;

/// One undecoded frame from a touch-video device.
#[derive(Clone, PartialEq, Eq)]
pub struct TouchVideoFrame {
    /// Timestamp on the monotonic clock, in nanoseconds, taken when the frame was read.
    pub when: i64,
    /// Raw frame bytes as delivered by the kernel.
    pub data: Vec<u8>,
}

impl fmt::Debug for TouchVideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TouchVideoFrame")
            .field("when", &self.when)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A `/dev/v4l-touch*` node, either unattached or owned by the touchscreen it belongs to.
pub struct TouchVideoDevice {
    file: File,
    path: PathBuf,
    frames: VecDeque<TouchVideoFrame>,
    dropped_frames: u64,
}

impl TouchVideoDevice {
    /// Opens the video node at `path` in non-blocking mode.
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)?;
        log::debug!("opened touch video device '{}'", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            frames: VecDeque::new(),
            dropped_frames: 0,
        })
    }

    /// The filesystem path this device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Resolves the evdev node this video device pairs with.
    ///
    /// The kernel exposes the association in sysfs: the video node's device directory contains
    /// the paired `input*/event*` entry. Returns `None` when sysfs has no answer, in which case
    /// the device stays unattached.
    pub(crate) fn associated_input_path(&self) -> Option<PathBuf> {
        let node = self.path.file_name()?;
        let input_dir = Path::new("/sys/class/video4linux")
            .join(node)
            .join("device/input");
        for input in fs::read_dir(input_dir).ok()?.flatten() {
            let entries = match fs::read_dir(input.path()) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                if name.as_encoded_bytes().starts_with(b"event") {
                    return Some(Path::new("/dev/input").join(name));
                }
            }
        }
        None
    }

    /// Reads all currently available frames into the queue.
    ///
    /// Returns the number of frames read. The queue is bounded; when it overflows, the oldest
    /// frames are dropped.
    pub(crate) fn read_and_queue_frames(&mut self) -> io::Result<usize> {
        let mut read_count = 0;
        loop {
            let mut data = vec![0; MAX_FRAME_BYTES];
            match self.file.read(&mut data) {
                Ok(0) => break,
                Ok(n) => {
                    data.truncate(n);
                    self.frames.push_back(TouchVideoFrame {
                        when: now_nanos(),
                        data,
                    });
                    read_count += 1;
                    while self.frames.len() > MAX_QUEUED_FRAMES {
                        self.frames.pop_front();
                        self.dropped_frames += 1;
                        log::debug!(
                            "'{}': frame queue overflow, dropped oldest ({} total)",
                            self.path.display(),
                            self.dropped_frames
                        );
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(read_count)
    }

    /// Removes and returns every queued frame, oldest first.
    pub(crate) fn take_frames(&mut self) -> Vec<TouchVideoFrame> {
        self.frames.drain(..).collect()
    }
}

impl fmt::Debug for TouchVideoDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TouchVideoDevice")
            .field("path", &self.path)
            .field("fd", &self.file.as_raw_fd())
            .field("queued_frames", &self.frames.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // A fifo stands in for the video node: it supports non-blocking opens and reads.
    fn fifo_pair(dir: &Path) -> (TouchVideoDevice, File) {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let path = dir.join("v4l-touch0");
        let cpath = CString::new(path.as_os_str().as_bytes()).unwrap();
        let res = unsafe { libc::mkfifo(cpath.as_ptr(), 0o600) };
        assert_eq!(res, 0, "{}", io::Error::last_os_error());

        let device = TouchVideoDevice::open(&path).unwrap();
        let writer = File::options()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .unwrap();
        (device, writer)
    }

    #[test]
    fn queues_and_drains_frames() {
        let dir = tempfile::tempdir().unwrap();
        let (mut device, mut writer) = fifo_pair(dir.path());

        assert_eq!(device.read_and_queue_frames().unwrap(), 0);

        writer.write_all(&[1, 2, 3]).unwrap();
        assert!(device.read_and_queue_frames().unwrap() >= 1);
        let frames = device.take_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, vec![1, 2, 3]);
        assert!(frames[0].when > 0);

        // Draining empties the queue.
        assert!(device.take_frames().is_empty());
    }

    #[test]
    fn queue_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut device, mut writer) = fifo_pair(dir.path());

        for round in 0..(MAX_QUEUED_FRAMES + 5) {
            writer.write_all(&[round as u8]).unwrap();
            device.read_and_queue_frames().unwrap();
        }
        let frames = device.take_frames();
        assert_eq!(frames.len(), MAX_QUEUED_FRAMES);
        // The oldest frames were the ones dropped.
        assert_eq!(frames[0].data, vec![5u8]);
    }
}
