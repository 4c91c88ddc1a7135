//! Register blocks and DMA buffers backed by physical memory mapped through `/dev/mem`.
//!
//! The mapping is shared through an [`Arc`]; every handle carved out of it keeps it alive, so
//! a handle can never outlive the pages it points into.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::{DmaMemory, RegisterBlock};

/// A `MAP_SHARED` mapping of a physical address range.
#[derive(Debug)]
pub struct PhysMapping {
    ptr: NonNull<u8>,
    map_len: usize,
    /// Offset of the requested physical address inside the (page aligned) mapping.
    offset: usize,
    phys_addr: u64,
    len: usize,
}

// SAFETY: the mapping is plain device memory; all access goes through volatile reads/writes of
// naturally aligned words and the handles that do so require `&mut` for writes.
unsafe impl Send for PhysMapping {}
unsafe impl Sync for PhysMapping {}

impl PhysMapping {
    /// Maps `len` bytes starting at `phys_addr` from `path` (normally `/dev/mem`), uncached.
    pub fn map(path: impl AsRef<Path>, phys_addr: u64, len: usize) -> io::Result<Arc<Self>> {
        if len == 0 || len % 4 != 0 || phys_addr % 4 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bad physical range 0x{phys_addr:x}+0x{len:x}: must be non-empty and word aligned"),
            ));
        }

        // SAFETY: sysconf has no preconditions.
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page = u64::try_from(page)
            .ok()
            .filter(|p| p.is_power_of_two())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "unable to query page size"))?;

        let base = phys_addr & !(page - 1);
        let offset = (phys_addr - base) as usize;
        let map_len = offset
            .checked_add(len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "mapping too large"))?;
        let file_offset = libc::off_t::try_from(base)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "address out of range"))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)?;

        // SAFETY: arguments describe a fresh shared mapping of an open file descriptor; the
        // result is checked against MAP_FAILED before use.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                file_offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;

        tracing::debug!(phys_addr, len, "mapped physical range");

        Ok(Arc::new(Self {
            ptr,
            map_len,
            offset,
            phys_addr,
            len,
        }))
    }

    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn word_ptr(&self, byte_offset: usize) -> *mut u32 {
        debug_assert!(byte_offset % 4 == 0);
        debug_assert!(byte_offset + 4 <= self.len);
        // SAFETY: callers bounds-check `byte_offset` against `len` before dereferencing.
        unsafe { self.ptr.as_ptr().add(self.offset + byte_offset).cast::<u32>() }
    }
}

impl Drop for PhysMapping {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`map_len` are exactly what mmap returned.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.map_len);
        }
    }
}

/// A register block inside a [`PhysMapping`].
#[derive(Debug, Clone)]
pub struct MmioRegisters {
    mapping: Arc<PhysMapping>,
    byte_offset: usize,
    count: usize,
}

impl MmioRegisters {
    /// Carves out `count` registers starting at register index `first` of the mapping.
    pub fn new(mapping: Arc<PhysMapping>, first: usize, count: usize) -> io::Result<Self> {
        let byte_offset = first * 4;
        if byte_offset + count * 4 > mapping.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "registers {first}..{} exceed mapping of {} bytes",
                    first + count,
                    mapping.len()
                ),
            ));
        }
        Ok(Self {
            mapping,
            byte_offset,
            count,
        })
    }
}

impl RegisterBlock for MmioRegisters {
    fn read_reg(&self, index: usize) -> u32 {
        assert!(index < self.count, "register {index} out of range");
        // SAFETY: index is within the block, which lies within the mapping.
        unsafe { self.mapping.word_ptr(self.byte_offset + index * 4).read_volatile() }
    }

    fn write_reg(&mut self, index: usize, value: u32) {
        assert!(index < self.count, "register {index} out of range");
        // SAFETY: as above.
        unsafe {
            self.mapping
                .word_ptr(self.byte_offset + index * 4)
                .write_volatile(value)
        }
    }
}

/// A DMA-coherent buffer reserved outside the kernel's allocator (e.g. a `reserved-memory`
/// carve-out) and mapped through a [`PhysMapping`].
#[derive(Debug, Clone)]
pub struct MmioMemory {
    mapping: Arc<PhysMapping>,
}

impl MmioMemory {
    pub fn new(mapping: Arc<PhysMapping>) -> Self {
        Self { mapping }
    }
}

impl DmaMemory for MmioMemory {
    fn phys_addr(&self) -> u64 {
        self.mapping.phys_addr()
    }

    fn len_words(&self) -> usize {
        self.mapping.len() / 4
    }

    fn read_word(&self, index: usize) -> u32 {
        assert!(index < self.len_words(), "word {index} out of range");
        // SAFETY: index is within the mapping.
        unsafe { self.mapping.word_ptr(index * 4).read_volatile() }
    }

    fn write_word(&mut self, index: usize, value: u32) {
        assert!(index < self.len_words(), "word {index} out of range");
        // SAFETY: index is within the mapping.
        unsafe { self.mapping.word_ptr(index * 4).write_volatile(value) }
    }
}
