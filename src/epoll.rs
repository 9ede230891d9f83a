//! The readiness pump: one epoll instance multiplexing device descriptors, the directory
//! watches, and the self-pipe wake mechanism.
//!
//! The pump owns three process-lifetime resources: the epoll fd, an inotify fd with a watch on
//! the input directory (and one on the video directory when it exists), and a pipe whose read
//! end is registered with epoll so that [`EpollPump::wake`] can interrupt a blocking wait from
//! any thread.

use std::{
    ffi::{CString, OsString, c_int},
    io, mem,
    os::{
        fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
        unix::ffi::{OsStrExt, OsStringExt},
    },
    path::Path,
};

/// Maximum number of signalled fds handled per wait.
pub(crate) const EPOLL_MAX_EVENTS: usize = 16;

/// Epoll data token for the wake pipe's read end.
const WAKE_TOKEN: u64 = u64::MAX;
/// Epoll data token for the inotify fd.
const INOTIFY_TOKEN: u64 = u64::MAX - 1;

fn cvt(ret: c_int) -> io::Result<c_int /* never -1 */> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// What a readiness event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    /// The self-pipe has pending wake bytes.
    Wake,
    /// The inotify fd has pending directory events.
    Notify,
    /// A registered descriptor is ready.
    Fd(RawFd),
}

/// One readiness event returned by [`EpollPump::wait`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct PumpEvent {
    pub readiness: Readiness,
    pub readable: bool,
    pub hangup: bool,
}

/// Which watched directory an inotify event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchDir {
    Input,
    Video,
}

/// A decoded inotify name event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WatchEvent {
    pub dir: WatchDir,
    pub created: bool,
    pub name: OsString,
}

pub(crate) struct EpollPump {
    epoll: OwnedFd,
    inotify: OwnedFd,
    input_wd: c_int,
    video_wd: c_int, // -1 when the video directory is not watched
    wake_read: OwnedFd,
    wake_write: OwnedFd,
}

impl EpollPump {
    /// Creates the epoll and inotify instances and the wake pipe.
    ///
    /// Failing to watch the input directory is fatal; the video directory watch is best-effort
    /// since the directory may not exist on hosts without touch-video devices.
    pub fn new(input_dir: &Path, video_dir: &Path) -> io::Result<Self> {
        unsafe {
            let epoll = OwnedFd::from_raw_fd(cvt(libc::epoll_create1(libc::EPOLL_CLOEXEC))?);
            let inotify = OwnedFd::from_raw_fd(cvt(libc::inotify_init1(
                libc::IN_CLOEXEC | libc::IN_NONBLOCK,
            ))?);

            let input_wd = add_watch(&inotify, input_dir).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("cannot watch input directory '{}': {e}", input_dir.display()),
                )
            })?;
            let video_wd = match add_watch(&inotify, video_dir) {
                Ok(wd) => wd,
                Err(e) => {
                    log::warn!(
                        "cannot watch video directory '{}': {e}; touch video devices will not \
                         be discovered",
                        video_dir.display()
                    );
                    -1
                }
            };

            let mut pipe_fds = [0 as c_int; 2];
            cvt(libc::pipe2(
                pipe_fds.as_mut_ptr(),
                libc::O_CLOEXEC | libc::O_NONBLOCK,
            ))?;
            let wake_read = OwnedFd::from_raw_fd(pipe_fds[0]);
            let wake_write = OwnedFd::from_raw_fd(pipe_fds[1]);

            let pump = Self {
                epoll,
                inotify,
                input_wd,
                video_wd,
                wake_read,
                wake_write,
            };
            pump.epoll_add(pump.inotify.as_raw_fd(), INOTIFY_TOKEN)?;
            pump.epoll_add(pump.wake_read.as_raw_fd(), WAKE_TOKEN)?;
            Ok(pump)
        }
    }

    fn epoll_add(&self, fd: RawFd, token: u64) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: token,
        };
        cvt(unsafe {
            libc::epoll_ctl(self.epoll.as_raw_fd(), libc::EPOLL_CTL_ADD, fd, &mut event)
        })?;
        Ok(())
    }

    /// Registers a device or video descriptor for readiness events.
    pub fn register_fd(&self, fd: RawFd) -> io::Result<()> {
        self.epoll_add(fd, fd as u64)
    }

    /// Removes a previously registered descriptor.
    pub fn unregister_fd(&self, fd: RawFd) -> io::Result<()> {
        cvt(unsafe {
            libc::epoll_ctl(
                self.epoll.as_raw_fd(),
                libc::EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        })?;
        Ok(())
    }

    /// Waits for readiness, filling `out` with up to [`EPOLL_MAX_EVENTS`] events.
    ///
    /// A `timeout_ms` of −1 blocks indefinitely. `EINTR` is retried with the same timeout; the
    /// caller owns any deadline accounting.
    pub fn wait(&self, timeout_ms: i32, out: &mut [PumpEvent; EPOLL_MAX_EVENTS]) -> io::Result<usize> {
        let mut items: [libc::epoll_event; EPOLL_MAX_EVENTS] = unsafe { mem::zeroed() };
        let count = loop {
            let ret = unsafe {
                libc::epoll_wait(
                    self.epoll.as_raw_fd(),
                    items.as_mut_ptr(),
                    EPOLL_MAX_EVENTS as c_int,
                    timeout_ms,
                )
            };
            match cvt(ret) {
                Ok(n) => break n as usize,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        for (slot, item) in out.iter_mut().zip(&items[..count]) {
            let readiness = match item.u64 {
                WAKE_TOKEN => Readiness::Wake,
                INOTIFY_TOKEN => Readiness::Notify,
                token => Readiness::Fd(token as RawFd),
            };
            *slot = PumpEvent {
                readiness,
                readable: item.events & libc::EPOLLIN as u32 != 0,
                hangup: item.events & (libc::EPOLLHUP | libc::EPOLLERR) as u32 != 0,
            };
        }
        Ok(count)
    }

    /// Wakes a blocked [`EpollPump::wait`] call. Safe to call from any thread, idempotent
    /// across multiple pending wakes.
    pub fn wake(&self) {
        loop {
            let byte = 1u8;
            let ret = unsafe { libc::write(self.wake_write.as_raw_fd(), (&raw const byte).cast(), 1) };
            if ret >= 0 {
                return;
            }
            let e = io::Error::last_os_error();
            match e.kind() {
                io::ErrorKind::Interrupted => continue,
                // A full pipe already holds an undelivered wake.
                io::ErrorKind::WouldBlock => return,
                _ => {
                    log::error!("cannot write to wake pipe: {e}");
                    return;
                }
            }
        }
    }

    /// Drains every pending wake byte from the self-pipe.
    pub fn drain_wake(&self) {
        let mut buf = [0u8; 16];
        loop {
            let ret = unsafe {
                libc::read(
                    self.wake_read.as_raw_fd(),
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                )
            };
            if ret > 0 {
                continue;
            }
            if ret == 0 {
                return;
            }
            let e = io::Error::last_os_error();
            match e.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => return,
                _ => {
                    log::error!("cannot read from wake pipe: {e}");
                    return;
                }
            }
        }
    }

    /// Reads and decodes all pending inotify events.
    pub fn read_watch_events(&self) -> io::Result<Vec<WatchEvent>> {
        let mut events = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let ret = unsafe {
                libc::read(self.inotify.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len())
            };
            let len = if ret < 0 {
                let e = io::Error::last_os_error();
                match e.kind() {
                    io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::WouldBlock => break,
                    _ => return Err(e),
                }
            } else if ret == 0 {
                break;
            } else {
                ret as usize
            };

            let mut offset = 0;
            while offset + mem::size_of::<libc::inotify_event>() <= len {
                let event: libc::inotify_event =
                    unsafe { buf.as_ptr().add(offset).cast::<libc::inotify_event>().read_unaligned() };
                let name_start = offset + mem::size_of::<libc::inotify_event>();
                let name_end = name_start + event.len as usize;
                if name_end > len {
                    log::error!("truncated inotify event; dropping rest of batch");
                    break;
                }
                offset = name_end;

                let dir = if event.wd == self.input_wd {
                    WatchDir::Input
                } else if event.wd == self.video_wd {
                    WatchDir::Video
                } else {
                    continue;
                };
                let created = event.mask & (libc::IN_CREATE | libc::IN_MOVED_TO) != 0;
                let removed = event.mask & (libc::IN_DELETE | libc::IN_MOVED_FROM) != 0;
                if !created && !removed {
                    continue;
                }
                let name_bytes: Vec<u8> = buf[name_start..name_end]
                    .iter()
                    .copied()
                    .take_while(|&b| b != 0)
                    .collect();
                if name_bytes.is_empty() {
                    continue;
                }
                events.push(WatchEvent {
                    dir,
                    created,
                    name: OsString::from_vec(name_bytes),
                });
            }
        }
        Ok(events)
    }
}

impl std::fmt::Debug for EpollPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpollPump")
            .field("epoll", &self.epoll.as_raw_fd())
            .field("inotify", &self.inotify.as_raw_fd())
            .field("input_wd", &self.input_wd)
            .field("video_wd", &self.video_wd)
            .finish_non_exhaustive()
    }
}

fn add_watch(inotify: &OwnedFd, dir: &Path) -> io::Result<c_int> {
    let cpath = CString::new(dir.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;
    cvt(unsafe {
        libc::inotify_add_watch(
            inotify.as_raw_fd(),
            cpath.as_ptr(),
            (libc::IN_CREATE | libc::IN_DELETE | libc::IN_MOVED_TO | libc::IN_MOVED_FROM) as u32,
        )
    })
}

impl Default for PumpEvent {
    fn default() -> Self {
        Self {
            readiness: Readiness::Wake,
            readable: false,
            hangup: false,
        }
    }
}
