//! Bounds-checked access to a received frame
//!
//! The eBPF verifier only accepts packet reads it can prove lie inside
//! `[data, data_end)`. All reads go through [`Frame::ptr_at`], which performs
//! that check before handing out a pointer, so the same code is accepted by
//! the verifier and is memory safe on the host.

use core::marker::PhantomData;
use core::mem;

/// Marker for types that may be overlaid on packet bytes.
///
/// # Safety
///
/// Implementors must have alignment 1 and accept every bit pattern.
pub unsafe trait Overlay: Copy {}

// SAFETY: alignment 1, any bit pattern.
unsafe impl Overlay for u8 {}
unsafe impl<const N: usize> Overlay for [u8; N] {}

/// One received frame, `[data, data_end)`
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    data: usize,
    data_end: usize,
    _bytes: PhantomData<&'a [u8]>,
}

impl<'a> Frame<'a> {
    /// Frame over a byte slice
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        let data = bytes.as_ptr() as usize;
        Self {
            data,
            data_end: data + bytes.len(),
            _bytes: PhantomData,
        }
    }

    /// Frame over raw packet bounds, as handed out by the XDP context
    ///
    /// # Safety
    ///
    /// `[data, data_end)` must be readable for `'a`.
    #[inline(always)]
    pub unsafe fn from_raw(data: usize, data_end: usize) -> Self {
        Self {
            data,
            data_end,
            _bytes: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data_end.saturating_sub(self.data)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer to a `T` at `offset`, if `size_of::<T>()` bytes fit in the frame
    #[inline(always)]
    pub fn ptr_at<T>(&self, offset: usize) -> Option<*const T> {
        let ptr = self.data + offset;
        // black_box keeps `ptr + len` intact; LLVM otherwise folds the
        // comparison into a form the verifier cannot track.
        let access_end = core::hint::black_box(ptr + mem::size_of::<T>());

        if ptr < self.data || access_end > self.data_end {
            return None;
        }

        Some(ptr as *const T)
    }

    /// Whether `len` bytes starting at `offset` lie inside the frame
    #[inline(always)]
    pub fn contains(&self, offset: usize, len: usize) -> bool {
        let ptr = self.data + offset;
        let access_end = core::hint::black_box(ptr + len);
        ptr >= self.data && access_end <= self.data_end
    }

    /// Typed view of the bytes at `offset`
    #[inline(always)]
    pub fn overlay<T: Overlay>(&self, offset: usize) -> Option<&'a T> {
        let ptr = self.ptr_at::<T>(offset)?;
        // SAFETY: bounds checked above; `Overlay` guarantees alignment 1
        // and that any byte pattern is a valid `T`.
        Some(unsafe { &*ptr })
    }

    #[inline(always)]
    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.overlay::<u8>(offset).copied()
    }

    /// Big-endian 32-bit word at `offset`
    #[inline(always)]
    pub fn u32_be_at(&self, offset: usize) -> Option<u32> {
        self.overlay::<[u8; 4]>(offset).map(|b| u32::from_be_bytes(*b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptr_at_bounds() {
        let bytes = [0u8; 8];
        let frame = Frame::from_slice(&bytes);

        assert_eq!(frame.len(), 8);
        assert!(frame.ptr_at::<[u8; 8]>(0).is_some());
        assert!(frame.ptr_at::<[u8; 4]>(4).is_some());
        assert!(frame.ptr_at::<[u8; 4]>(5).is_none());
        assert!(frame.ptr_at::<u8>(8).is_none());
    }

    #[test]
    fn test_contains_matches_ptr_at() {
        let bytes = [0u8; 10];
        let frame = Frame::from_slice(&bytes);

        assert!(frame.contains(2, 8));
        assert!(!frame.contains(3, 8));
        assert!(frame.contains(10, 0));
    }

    #[test]
    fn test_reads() {
        let bytes = [0xde, 0xad, 0xbe, 0xef, 0x01];
        let frame = Frame::from_slice(&bytes);

        assert_eq!(frame.u8_at(4), Some(0x01));
        assert_eq!(frame.u8_at(5), None);
        assert_eq!(frame.u32_be_at(0), Some(0xdead_beef));
        assert_eq!(frame.u32_be_at(2), None);
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::from_slice(&[]);

        assert!(frame.is_empty());
        assert_eq!(frame.u8_at(0), None);
    }
}
