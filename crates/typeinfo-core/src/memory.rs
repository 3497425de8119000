//! Raw memory access for the value renderer.
//!
//! Every read the renderer performs is one explicit, bounded call to
//! [`MemorySource::read`] with a length taken from a descriptor. A source
//! reports failure instead of faulting, so foreign or corrupted data only
//! ever degrades the rendered text.

/// Byte-addressed memory the renderer reads values from.
pub trait MemorySource {
    /// Copies `buf.len()` bytes starting at `addr` into `buf`.
    ///
    /// Returns `false`, leaving `buf` unspecified, if any byte of the range
    /// is not readable.
    fn read(&self, addr: u64, buf: &mut [u8]) -> bool;
}

impl<M: MemorySource + ?Sized> MemorySource for &M {
    fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
        (**self).read(addr, buf)
    }
}

/// Snapshot of memory regions placed at fixed addresses.
///
/// Values are decoded in native byte order, so an image is meant to be
/// captured and rendered on hosts sharing the same ABI.
///
/// # Examples
///
/// ```
/// use typeinfo_core::memory::{ByteImage, MemorySource};
///
/// let image = ByteImage::new(0x1000, vec![1, 2, 3, 4]);
/// let mut buf = [0u8; 2];
/// assert!(image.read(0x1002, &mut buf));
/// assert_eq!(buf, [3, 4]);
/// assert!(!image.read(0x1003, &mut buf));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ByteImage {
    regions: Vec<Region>,
}

#[derive(Debug, Clone)]
struct Region {
    base: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn slice(&self, addr: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        self.bytes.get(start..end)
    }
}

impl ByteImage {
    /// Creates an image with a single region of `bytes` mapped at `base`.
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self::default().with_region(base, bytes)
    }

    /// Maps an additional region, e.g. the target of a pointer.
    pub fn with_region(mut self, base: u64, bytes: Vec<u8>) -> Self {
        self.map(base, bytes);
        self
    }

    /// Maps an additional region in place.
    pub fn map(&mut self, base: u64, bytes: Vec<u8>) {
        self.regions.push(Region { base, bytes });
    }
}

impl MemorySource for ByteImage {
    fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
        let found = self
            .regions
            .iter()
            .find_map(|region| region.slice(addr, buf.len()));
        match found {
            Some(bytes) => {
                buf.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }
}

/// Memory of the current process.
///
/// Reads dereference the given addresses directly. Only null is rejected;
/// any other invalid address is undefined behavior, which is why
/// construction is `unsafe`.
#[derive(Debug, Clone, Copy)]
pub struct LiveMemory {
    _private: (),
}

impl LiveMemory {
    /// Creates a reader over the current process.
    ///
    /// # Safety
    ///
    /// Every address later rendered through this source, including pointer
    /// values found in the rendered data, must be valid for reads of the
    /// size its descriptor declares.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl MemorySource for LiveMemory {
    fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
        let Ok(addr) = usize::try_from(addr) else {
            return false;
        };
        if addr == 0 {
            return false;
        }
        // SAFETY: the constructor's contract makes the caller vouch for
        // every address reaching this source.
        unsafe {
            std::ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), buf.len());
        }
        true
    }
}

/// Reads an unsigned integer of `size` bytes in native byte order.
///
/// Returns `None` if `size` is not 1, 2, 4, or 8, or the read fails.
pub fn read_unsigned(source: &impl MemorySource, addr: u64, size: u64) -> Option<u64> {
    let mut buf = [0u8; 8];
    let width = usize::try_from(size).ok().filter(|w| matches!(w, 1 | 2 | 4 | 8))?;
    if !source.read(addr, &mut buf[..width]) {
        return None;
    }
    Some(match width {
        1 => u64::from(buf[0]),
        2 => u64::from(u16::from_ne_bytes([buf[0], buf[1]])),
        4 => u64::from(u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])),
        _ => u64::from_ne_bytes(buf),
    })
}

/// Reads a signed integer of `size` bytes in native byte order,
/// sign-extending to 64 bits.
pub fn read_signed(source: &impl MemorySource, addr: u64, size: u64) -> Option<i64> {
    let raw = read_unsigned(source, addr, size)?;
    Some(match size {
        1 => i64::from(raw as u8 as i8),
        2 => i64::from(raw as u16 as i16),
        4 => i64::from(raw as u32 as i32),
        _ => raw as i64,
    })
}
