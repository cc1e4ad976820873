//! Raster element trait for generic voxel values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster voxel.
///
/// Binary interpretation throughout the crate treats any non-zero value as
/// foreground, so every element type must know its own zero.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Bits per sample when written to an image file
    fn bit_depth() -> u8;

    /// Whether this value is foreground under the binary interpretation
    fn is_set(&self) -> bool {
        !self.is_zero()
    }

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element {
    ($t:ty, $float:expr) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_float() -> bool {
                $float
            }

            fn bit_depth() -> u8 {
                (std::mem::size_of::<$t>() * 8) as u8
            }
        }
    };
}

impl_raster_element!(u8, false);
impl_raster_element!(u16, false);
impl_raster_element!(u32, false);
impl_raster_element!(i16, false);
impl_raster_element!(i32, false);
impl_raster_element!(f32, true);
impl_raster_element!(f64, true);
