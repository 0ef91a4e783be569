use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{allocation_error, layout_error, ErrorCode, Result};

/// Returns `true` when `ptr` is a multiple of `alignment` bytes.
///
/// `alignment` must be non-zero; any power of two used by the SIMD backends
/// (16, 32, 64) works.
#[inline(always)]
pub fn is_aligned<T>(ptr: *const T, alignment: usize) -> bool {
    debug_assert!(alignment > 0, "alignment can't be zero");
    (ptr as usize) % alignment == 0
}

/// Returns `true` when every pointer in `ptrs` is aligned to `alignment`.
#[inline(always)]
pub fn all_aligned(ptrs: &[*const u8], alignment: usize) -> bool {
    ptrs.iter().all(|&ptr| is_aligned(ptr, alignment))
}

/// Element types for which the all-zero bit pattern is a valid value.
///
/// # Safety
///
/// Implementors must be valid when every byte is zero.
pub unsafe trait Zeroable: Copy {}

unsafe impl Zeroable for f32 {}
unsafe impl Zeroable for f64 {}
unsafe impl Zeroable for i32 {}
unsafe impl Zeroable for i64 {}
unsafe impl Zeroable for u8 {}
// `ErrorCode::Success` is discriminant 0.
unsafe impl Zeroable for ErrorCode {}

/// A heap buffer whose first element sits on a caller-chosen byte boundary.
///
/// This is the aligned allocate/free pair: allocation happens in
/// [`AlignedBuffer::zeroed`] and the memory is returned to the allocator with
/// the same layout on drop.
///
/// ```rust
/// use fastcalc::utils::{is_aligned, AlignedBuffer};
///
/// let buf = AlignedBuffer::<f64>::zeroed(100, 64).unwrap();
/// assert_eq!(buf.len(), 100);
/// assert!(is_aligned(buf.as_ptr(), 64));
/// ```
pub struct AlignedBuffer<T: Zeroable> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
}

// SAFETY: the buffer uniquely owns its allocation, like `Vec<T>`.
unsafe impl<T: Zeroable + Send> Send for AlignedBuffer<T> {}
unsafe impl<T: Zeroable + Sync> Sync for AlignedBuffer<T> {}

impl<T: Zeroable> AlignedBuffer<T> {
    /// Allocates `len` zeroed elements aligned to `align` bytes.
    ///
    /// # Errors
    ///
    /// - [`crate::FastcalcError::Layout`] if `align` is not a power of two,
    ///   is smaller than the natural alignment of `T`, or the size overflows.
    /// - [`crate::FastcalcError::Allocation`] if the allocator returns null.
    pub fn zeroed(len: usize, align: usize) -> Result<Self> {
        if !align.is_power_of_two() || align < mem::align_of::<T>() {
            return Err(layout_error(
                len,
                align,
                "alignment must be a power of two no smaller than the element alignment",
            ));
        }

        let size_bytes = len
            .checked_mul(mem::size_of::<T>())
            .ok_or_else(|| layout_error(len, align, "total size overflows usize"))?;

        let layout = Layout::from_size_align(size_bytes, align)
            .map_err(|e| layout_error(size_bytes, align, e.to_string()))?;

        if layout.size() == 0 {
            // No allocation; a dangling pointer is still required to be aligned.
            let dangling = align as *mut T;
            return Ok(AlignedBuffer {
                // SAFETY: `align` is a non-zero power of two.
                ptr: unsafe { NonNull::new_unchecked(dangling) },
                len,
                layout,
            });
        }

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) } as *mut T;
        let ptr = NonNull::new(raw)
            .ok_or_else(|| allocation_error(size_bytes, align, "allocator returned null"))?;

        Ok(AlignedBuffer { ptr, len, layout })
    }

    /// Allocates an aligned copy of `data`.
    pub fn from_slice(data: &[T], align: usize) -> Result<Self> {
        let mut buf = Self::zeroed(data.len(), align)?;
        buf.copy_from_slice(data);
        Ok(buf)
    }

    /// Byte alignment the buffer was allocated with.
    #[inline(always)]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Copies the contents into an ordinary `Vec<T>`.
    pub fn to_vec(&self) -> Vec<T> {
        self.deref().to_vec()
    }
}

impl<T: Zeroable> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: allocated in `zeroed` with exactly this layout.
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
        }
    }
}

impl<T: Zeroable> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: `len` zero-initialised elements live at `ptr`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Zeroable> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees uniqueness.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Zeroable + std::fmt::Debug> std::fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("alignment", &self.alignment())
            .field("data", &self.deref())
            .finish()
    }
}
