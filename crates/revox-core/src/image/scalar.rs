//! Runtime scalar kinds and the sealed per-type trait behind them.

use crate::spatial::round;

/// The numeric kind of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ScalarKind {
    /// Size of one scalar in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            ScalarKind::Int8 | ScalarKind::UInt8 => 1,
            ScalarKind::Int16 | ScalarKind::UInt16 => 2,
            ScalarKind::Int32 | ScalarKind::UInt32 | ScalarKind::Float32 => 4,
            ScalarKind::Float64 => 8,
        }
    }

    /// Smallest representable value, as a double.
    pub fn min_value(self) -> f64 {
        match self {
            ScalarKind::Int8 => -128.0,
            ScalarKind::UInt8 => 0.0,
            ScalarKind::Int16 => -32768.0,
            ScalarKind::UInt16 => 0.0,
            ScalarKind::Int32 => -2147483648.0,
            ScalarKind::UInt32 => 0.0,
            ScalarKind::Float32 => f64::from(f32::MIN),
            ScalarKind::Float64 => f64::MIN,
        }
    }

    /// Largest representable value, as a double.
    pub fn max_value(self) -> f64 {
        match self {
            ScalarKind::Int8 => 127.0,
            ScalarKind::UInt8 => 255.0,
            ScalarKind::Int16 => 32767.0,
            ScalarKind::UInt16 => 65535.0,
            ScalarKind::Int32 => 2147483647.0,
            ScalarKind::UInt32 => 4294967295.0,
            ScalarKind::Float32 => f64::from(f32::MAX),
            ScalarKind::Float64 => f64::MAX,
        }
    }

    /// True for the two floating-point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i8 {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// The eight scalar types a pixel buffer can hold.
///
/// Integer conversions round half up with the shared snap tolerance; the
/// clamped variant saturates to the kind's range first. Float conversions
/// are plain casts.
pub trait Scalar:
    Copy + Send + Sync + PartialEq + Default + std::fmt::Debug + sealed::Sealed + 'static
{
    const KIND: ScalarKind;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
    fn from_f64_clamped(v: f64) -> Self;
}

macro_rules! impl_int_scalar {
    ($t:ty, $kind:expr) => {
        impl Scalar for $t {
            const KIND: ScalarKind = $kind;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                round::round(v) as $t
            }

            #[inline]
            fn from_f64_clamped(v: f64) -> Self {
                let v = v.max(Self::KIND.min_value()).min(Self::KIND.max_value());
                round::round(v) as $t
            }
        }
    };
}

impl_int_scalar!(i8, ScalarKind::Int8);
impl_int_scalar!(u8, ScalarKind::UInt8);
impl_int_scalar!(i16, ScalarKind::Int16);
impl_int_scalar!(u16, ScalarKind::UInt16);
impl_int_scalar!(i32, ScalarKind::Int32);
impl_int_scalar!(u32, ScalarKind::UInt32);

impl Scalar for f32 {
    const KIND: ScalarKind = ScalarKind::Float32;

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn from_f64_clamped(v: f64) -> Self {
        v as f32
    }
}

impl Scalar for f64 {
    const KIND: ScalarKind = ScalarKind::Float64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn from_f64_clamped(v: f64) -> Self {
        v
    }
}

/// Expand a generic body once per scalar kind.
///
/// `$t` is bound to the concrete scalar type inside `$body`, turning a
/// runtime [`ScalarKind`] into a monomorphized call.
#[macro_export]
macro_rules! dispatch_scalar {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::image::ScalarKind::Int8 => {
                type $t = i8;
                $body
            }
            $crate::image::ScalarKind::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::image::ScalarKind::Int16 => {
                type $t = i16;
                $body
            }
            $crate::image::ScalarKind::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::image::ScalarKind::Int32 => {
                type $t = i32;
                $body
            }
            $crate::image::ScalarKind::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::image::ScalarKind::Float32 => {
                type $t = f32;
                $body
            }
            $crate::image::ScalarKind::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sizes() {
        assert_eq!(ScalarKind::Int8.size_in_bytes(), 1);
        assert_eq!(ScalarKind::UInt16.size_in_bytes(), 2);
        assert_eq!(ScalarKind::Float64.size_in_bytes(), 8);
    }

    #[test]
    fn test_int_rounding() {
        assert_eq!(u8::from_f64(133.3333), 133);
        assert_eq!(u8::from_f64(133.5), 134);
        assert_eq!(i16::from_f64(-2.5), -2);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(u8::from_f64_clamped(300.0), 255);
        assert_eq!(u8::from_f64_clamped(-5.0), 0);
        assert_eq!(i8::from_f64_clamped(1000.0), 127);
        assert_eq!(u32::from_f64_clamped(-1.0), 0);
    }

    #[test]
    fn test_dispatch() {
        fn size_of_kind(kind: ScalarKind) -> usize {
            dispatch_scalar!(kind, T => std::mem::size_of::<T>())
        }
        assert_eq!(size_of_kind(ScalarKind::Int16), 2);
        assert_eq!(size_of_kind(ScalarKind::Float64), 8);
    }
}
