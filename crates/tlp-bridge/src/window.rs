use std::io::{self, Read, Seek, SeekFrom, Write};

use axi_dma::{Clock, DmaMemory, RegisterBlock};

use crate::Bridge;

/// A file-like cursor over the endpoint's memory space.
///
/// Reads and writes go through [`Bridge::read_bytes`]/[`Bridge::write_bytes`], so any position
/// and length is accepted. Each call transfers the whole buffer or fails. The memory space has
/// no end, so [`SeekFrom::End`] is rejected.
#[derive(Debug)]
pub struct MemoryWindow<'a, R, M, C> {
    bridge: &'a Bridge<R, M, C>,
    position: u64,
}

impl<'a, R, M, C> MemoryWindow<'a, R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    pub fn new(bridge: &'a Bridge<R, M, C>) -> Self {
        Self {
            bridge,
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn advance(&mut self, len: usize) {
        self.position = self.position.wrapping_add(len as u64);
    }
}

impl<R, M, C> Read for MemoryWindow<'_, R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.bridge.read_bytes(self.position, buf)?;
        self.advance(buf.len());
        Ok(buf.len())
    }
}

impl<R, M, C> Write for MemoryWindow<'_, R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bridge.write_bytes(self.position, buf)?;
        self.advance(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R, M, C> Seek for MemoryWindow<'_, R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "endpoint memory has no end to seek from",
                ))
            }
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek outside the address space")
        })?;
        Ok(self.position)
    }
}
