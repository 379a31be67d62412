use std::collections::HashMap;
use std::ffi::c_int;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Blocks on a set of fds while a lease is held.
pub struct EventLoop {
    epoll: OwnedFd,
    next_id: u64,
    data_map: HashMap<u64, Event>,
    event_buf: [libc::epoll_event; 8],
    event_cnt: usize,
    event_head: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Wayland,
    Quit,
}

impl EventLoop {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            epoll: epoll_create1(libc::EPOLL_CLOEXEC)?,
            next_id: 0,
            data_map: HashMap::new(),
            event_buf: unsafe { std::mem::zeroed() },
            event_cnt: 0,
            event_head: 0,
        })
    }

    pub fn add_fd(&mut self, fd: RawFd, event: Event) -> io::Result<()> {
        let mut epoll_event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: self.next_id,
        };

        if unsafe {
            libc::epoll_ctl(
                self.epoll.as_raw_fd(),
                libc::EPOLL_CTL_ADD,
                fd,
                &mut epoll_event,
            )
        } == -1
        {
            return Err(io::Error::last_os_error());
        }

        self.data_map.insert(self.next_id, event);
        self.next_id += 1;

        Ok(())
    }

    pub fn poll(&mut self) -> io::Result<Event> {
        loop {
            if self.event_head < self.event_cnt {
                let id = self.event_buf[self.event_head].u64;
                self.event_head += 1;
                if let Some(event) = self.data_map.get(&id) {
                    return Ok(*event);
                }
                continue;
            }

            let wait_result = unsafe {
                libc::epoll_wait(
                    self.epoll.as_raw_fd(),
                    self.event_buf.as_mut_ptr(),
                    self.event_buf.len() as i32,
                    -1,
                )
            };
            if wait_result == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            self.event_cnt = wait_result as usize;
            self.event_head = 0;
        }
    }
}

fn epoll_create1(flags: c_int) -> io::Result<OwnedFd> {
    match unsafe { libc::epoll_create1(flags) } {
        -1 => Err(io::Error::last_os_error()),
        fd => Ok(unsafe { OwnedFd::from_raw_fd(fd) }),
    }
}

/// A close-on-exec pipe, `(read end, write end)`.
pub fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0, 0];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reports_readable_fd() {
        let (quit_read, quit_write) = pipe().unwrap();
        let (other_read, _other_write) = pipe().unwrap();
        let mut event_loop = EventLoop::new().unwrap();
        event_loop
            .add_fd(other_read.as_raw_fd(), Event::Wayland)
            .unwrap();
        event_loop
            .add_fd(quit_read.as_raw_fd(), Event::Quit)
            .unwrap();

        std::fs::File::from(quit_write).write_all(b"x").unwrap();
        assert_eq!(event_loop.poll().unwrap(), Event::Quit);
    }
}
