//! Tagged pixel storage.

use super::scalar::{Scalar, ScalarKind};
use crate::error::{CoreError, Result};

/// A contiguous pixel buffer whose element type is chosen at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarBuffer {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

fn try_zeroed<T: Scalar>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| CoreError::Allocation {
        bytes: len * std::mem::size_of::<T>(),
    })?;
    v.resize(len, T::default());
    Ok(v)
}

impl ScalarBuffer {
    /// Allocate a zero-filled buffer of `len` elements.
    ///
    /// Allocation failure is reported instead of aborting, so a host pipeline
    /// can surface it as an error.
    pub fn try_new(kind: ScalarKind, len: usize) -> Result<Self> {
        Ok(match kind {
            ScalarKind::Int8 => ScalarBuffer::Int8(try_zeroed(len)?),
            ScalarKind::UInt8 => ScalarBuffer::UInt8(try_zeroed(len)?),
            ScalarKind::Int16 => ScalarBuffer::Int16(try_zeroed(len)?),
            ScalarKind::UInt16 => ScalarBuffer::UInt16(try_zeroed(len)?),
            ScalarKind::Int32 => ScalarBuffer::Int32(try_zeroed(len)?),
            ScalarKind::UInt32 => ScalarBuffer::UInt32(try_zeroed(len)?),
            ScalarKind::Float32 => ScalarBuffer::Float32(try_zeroed(len)?),
            ScalarKind::Float64 => ScalarBuffer::Float64(try_zeroed(len)?),
        })
    }

    /// The numeric kind of the elements.
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarBuffer::Int8(_) => ScalarKind::Int8,
            ScalarBuffer::UInt8(_) => ScalarKind::UInt8,
            ScalarBuffer::Int16(_) => ScalarKind::Int16,
            ScalarBuffer::UInt16(_) => ScalarKind::UInt16,
            ScalarBuffer::Int32(_) => ScalarKind::Int32,
            ScalarBuffer::UInt32(_) => ScalarKind::UInt32,
            ScalarBuffer::Float32(_) => ScalarKind::Float32,
            ScalarBuffer::Float64(_) => ScalarKind::Float64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ScalarBuffer::Int8(v) => v.len(),
            ScalarBuffer::UInt8(v) => v.len(),
            ScalarBuffer::Int16(v) => v.len(),
            ScalarBuffer::UInt16(v) => v.len(),
            ScalarBuffer::Int32(v) => v.len(),
            ScalarBuffer::UInt32(v) => v.len(),
            ScalarBuffer::Float32(v) => v.len(),
            ScalarBuffer::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the elements as `T`, or `None` when the kind does not match.
    pub fn as_slice<T: Scalar>(&self) -> Option<&[T]> {
        if self.kind() != T::KIND {
            return None;
        }
        let bytes = self.as_bytes();
        // Kind equality guarantees the buffer was allocated as Vec<T>, so the
        // pointer is aligned for T and the length divides evenly.
        unsafe {
            Some(std::slice::from_raw_parts(
                bytes.as_ptr() as *const T,
                self.len(),
            ))
        }
    }

    /// Mutable view of the elements as `T`, or `None` on a kind mismatch.
    pub fn as_mut_slice<T: Scalar>(&mut self) -> Option<&mut [T]> {
        if self.kind() != T::KIND {
            return None;
        }
        let len = self.len();
        let bytes = self.as_bytes_mut();
        unsafe {
            Some(std::slice::from_raw_parts_mut(
                bytes.as_mut_ptr() as *mut T,
                len,
            ))
        }
    }

    /// The raw bytes of the buffer in native byte order.
    pub fn as_bytes(&self) -> &[u8] {
        macro_rules! bytes {
            ($v:expr, $t:ty) => {
                unsafe {
                    std::slice::from_raw_parts(
                        $v.as_ptr() as *const u8,
                        $v.len() * std::mem::size_of::<$t>(),
                    )
                }
            };
        }
        match self {
            ScalarBuffer::Int8(v) => bytes!(v, i8),
            ScalarBuffer::UInt8(v) => v.as_slice(),
            ScalarBuffer::Int16(v) => bytes!(v, i16),
            ScalarBuffer::UInt16(v) => bytes!(v, u16),
            ScalarBuffer::Int32(v) => bytes!(v, i32),
            ScalarBuffer::UInt32(v) => bytes!(v, u32),
            ScalarBuffer::Float32(v) => bytes!(v, f32),
            ScalarBuffer::Float64(v) => bytes!(v, f64),
        }
    }

    /// The raw bytes of the buffer, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        macro_rules! bytes_mut {
            ($v:expr, $t:ty) => {
                unsafe {
                    std::slice::from_raw_parts_mut(
                        $v.as_mut_ptr() as *mut u8,
                        $v.len() * std::mem::size_of::<$t>(),
                    )
                }
            };
        }
        match self {
            ScalarBuffer::Int8(v) => bytes_mut!(v, i8),
            ScalarBuffer::UInt8(v) => v.as_mut_slice(),
            ScalarBuffer::Int16(v) => bytes_mut!(v, i16),
            ScalarBuffer::UInt16(v) => bytes_mut!(v, u16),
            ScalarBuffer::Int32(v) => bytes_mut!(v, i32),
            ScalarBuffer::UInt32(v) => bytes_mut!(v, u32),
            ScalarBuffer::Float32(v) => bytes_mut!(v, f32),
            ScalarBuffer::Float64(v) => bytes_mut!(v, f64),
        }
    }
}

impl<T: Scalar> From<Vec<T>> for ScalarBuffer {
    fn from(v: Vec<T>) -> Self {
        // Round-trips through the typed variant matching T::KIND.
        match T::KIND {
            ScalarKind::Int8 => ScalarBuffer::Int8(cast_vec(v)),
            ScalarKind::UInt8 => ScalarBuffer::UInt8(cast_vec(v)),
            ScalarKind::Int16 => ScalarBuffer::Int16(cast_vec(v)),
            ScalarKind::UInt16 => ScalarBuffer::UInt16(cast_vec(v)),
            ScalarKind::Int32 => ScalarBuffer::Int32(cast_vec(v)),
            ScalarKind::UInt32 => ScalarBuffer::UInt32(cast_vec(v)),
            ScalarKind::Float32 => ScalarBuffer::Float32(cast_vec(v)),
            ScalarKind::Float64 => ScalarBuffer::Float64(cast_vec(v)),
        }
    }
}

fn cast_vec<T: Scalar, U: Scalar>(v: Vec<T>) -> Vec<U> {
    debug_assert_eq!(T::KIND, U::KIND);
    let mut v = std::mem::ManuallyDrop::new(v);
    // T and U are the same type whenever the kinds match; the sealed trait
    // admits exactly one type per kind.
    unsafe { Vec::from_raw_parts(v.as_mut_ptr() as *mut U, v.len(), v.capacity()) }
}
