//! Syscall number → name lookup
//!
//! `sys_enter` reports the raw ABI number. Only the calls commonly seen in
//! server workloads are named; everything else renders as `syscall_<id>`.

/// Name of a syscall number for the running architecture
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn syscall_name(id: u32) -> Option<&'static str> {
    let name = match id {
        0 => "read",
        1 => "write",
        2 => "open",
        3 => "close",
        4 => "stat",
        5 => "fstat",
        7 => "poll",
        8 => "lseek",
        9 => "mmap",
        10 => "mprotect",
        11 => "munmap",
        12 => "brk",
        13 => "rt_sigaction",
        14 => "rt_sigprocmask",
        16 => "ioctl",
        17 => "pread64",
        18 => "pwrite64",
        19 => "readv",
        20 => "writev",
        21 => "access",
        22 => "pipe",
        24 => "sched_yield",
        28 => "madvise",
        35 => "nanosleep",
        39 => "getpid",
        41 => "socket",
        42 => "connect",
        43 => "accept",
        44 => "sendto",
        45 => "recvfrom",
        46 => "sendmsg",
        47 => "recvmsg",
        49 => "bind",
        50 => "listen",
        56 => "clone",
        59 => "execve",
        60 => "exit",
        61 => "wait4",
        62 => "kill",
        72 => "fcntl",
        202 => "futex",
        217 => "getdents64",
        228 => "clock_gettime",
        230 => "clock_nanosleep",
        231 => "exit_group",
        232 => "epoll_wait",
        233 => "epoll_ctl",
        257 => "openat",
        262 => "newfstatat",
        281 => "epoll_pwait",
        288 => "accept4",
        290 => "eventfd2",
        291 => "epoll_create1",
        293 => "pipe2",
        318 => "getrandom",
        332 => "statx",
        _ => return None,
    };
    Some(name)
}

/// Name of a syscall number for the running architecture
#[cfg(target_arch = "aarch64")]
#[must_use]
pub fn syscall_name(id: u32) -> Option<&'static str> {
    let name = match id {
        29 => "ioctl",
        56 => "openat",
        57 => "close",
        63 => "read",
        64 => "write",
        66 => "writev",
        98 => "futex",
        113 => "clock_gettime",
        214 => "brk",
        215 => "munmap",
        222 => "mmap",
        226 => "mprotect",
        _ => return None,
    };
    Some(name)
}

/// Name of a syscall number for the running architecture
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[must_use]
pub fn syscall_name(_id: u32) -> Option<&'static str> {
    None
}
