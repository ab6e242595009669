use nalgebra::ComplexField;
use std::fmt;

/// Scalar type of CI amplitudes: `f64` or `Complex64`
pub trait Amplitude: ComplexField<RealField = f64> + Copy + Send + Sync + fmt::Display {
    /// Embeds a real number
    fn lift(x: f64) -> Self {
        Self::from_real(x)
    }

    /// `conj(self) * other`
    fn conj_mul(self, other: Self) -> Self {
        self.conjugate() * other
    }
}

impl<T> Amplitude for T where T: ComplexField<RealField = f64> + Copy + Send + Sync + fmt::Display {}
