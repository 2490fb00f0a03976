//! Spectrum Data Model
//!
//! A [`SpectrumModel`] is an immutable, ordered list of frequency bands; a
//! [`SpectrumValue`] is one real value per band of a model. Models are
//! shared by reference (`Rc`) and values may only be combined when they are
//! built on the *same* model instance — identity, not band contents, is what
//! is compared, so the check is one pointer comparison per operation.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Sub, SubAssign};
use std::rc::Rc;

/// One frequency band of a spectrum model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower edge in Hz
    pub low_hz: f64,
    /// Center frequency in Hz
    pub center_hz: f64,
    /// Upper edge in Hz
    pub high_hz: f64,
}

impl Band {
    /// Band width in Hz
    pub fn width_hz(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

/// Immutable, ordered set of frequency bands.
///
/// Built once, then shared read-only among every value and signal that uses
/// it.
#[derive(Debug)]
pub struct SpectrumModel {
    bands: Vec<Band>,
}

impl SpectrumModel {
    /// Build a model from an ordered band list
    pub fn new(bands: Vec<Band>) -> Rc<Self> {
        Rc::new(Self { bands })
    }

    /// Number of bands
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// The bands, in model order
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }
}

/// A vector of real values, one per band of a [`SpectrumModel`].
///
/// Elementwise arithmetic panics if the two operands were built on
/// different model instances; that mismatch means the caller is combining
/// quantities from unrelated spectra and the run cannot continue safely.
#[derive(Debug, Clone)]
pub struct SpectrumValue {
    model: Rc<SpectrumModel>,
    values: Vec<f64>,
}

impl SpectrumValue {
    /// All-zero value over `model`
    pub fn zeros(model: &Rc<SpectrumModel>) -> Self {
        Self::constant(model, 0.0)
    }

    /// Same value in every band
    pub fn constant(model: &Rc<SpectrumModel>, value: f64) -> Self {
        Self {
            model: Rc::clone(model),
            values: vec![value; model.num_bands()],
        }
    }

    /// Value from an explicit per-band vector; `values.len()` must equal the
    /// model's band count
    pub fn from_values(model: &Rc<SpectrumModel>, values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            model.num_bands(),
            "value length {} does not match band count {}",
            values.len(),
            model.num_bands()
        );
        Self {
            model: Rc::clone(model),
            values,
        }
    }

    /// The model this value is defined over
    pub fn model(&self) -> &Rc<SpectrumModel> {
        &self.model
    }

    /// Per-band values in model order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the model has no bands
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when both values share one model instance
    pub fn same_model(&self, other: &SpectrumValue) -> bool {
        Rc::ptr_eq(&self.model, &other.model)
    }

    /// Sum over all bands
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    fn assert_same_model(&self, other: &SpectrumValue) {
        assert!(
            self.same_model(other),
            "spectrum model mismatch: values built on different models may not be combined"
        );
    }
}

impl Index<usize> for SpectrumValue {
    type Output = f64;

    fn index(&self, band: usize) -> &f64 {
        &self.values[band]
    }
}

impl IndexMut<usize> for SpectrumValue {
    fn index_mut(&mut self, band: usize) -> &mut f64 {
        &mut self.values[band]
    }
}

impl Add for &SpectrumValue {
    type Output = SpectrumValue;

    fn add(self, rhs: &SpectrumValue) -> SpectrumValue {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl AddAssign<&SpectrumValue> for SpectrumValue {
    fn add_assign(&mut self, rhs: &SpectrumValue) {
        self.assert_same_model(rhs);
        for (v, r) in self.values.iter_mut().zip(&rhs.values) {
            *v += r;
        }
    }
}

impl Sub for &SpectrumValue {
    type Output = SpectrumValue;

    fn sub(self, rhs: &SpectrumValue) -> SpectrumValue {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl SubAssign<&SpectrumValue> for SpectrumValue {
    fn sub_assign(&mut self, rhs: &SpectrumValue) {
        self.assert_same_model(rhs);
        for (v, r) in self.values.iter_mut().zip(&rhs.values) {
            *v -= r;
        }
    }
}

/// Elementwise division, band by band
impl Div for &SpectrumValue {
    type Output = SpectrumValue;

    fn div(self, rhs: &SpectrumValue) -> SpectrumValue {
        self.assert_same_model(rhs);
        let values = self
            .values
            .iter()
            .zip(&rhs.values)
            .map(|(a, b)| a / b)
            .collect();
        SpectrumValue {
            model: Rc::clone(&self.model),
            values,
        }
    }
}

impl Mul<f64> for &SpectrumValue {
    type Output = SpectrumValue;

    fn mul(self, rhs: f64) -> SpectrumValue {
        SpectrumValue {
            model: Rc::clone(&self.model),
            values: self.values.iter().map(|v| v * rhs).collect(),
        }
    }
}

impl Div<f64> for &SpectrumValue {
    type Output = SpectrumValue;

    fn div(self, rhs: f64) -> SpectrumValue {
        SpectrumValue {
            model: Rc::clone(&self.model),
            values: self.values.iter().map(|v| v / rhs).collect(),
        }
    }
}

impl fmt::Display for SpectrumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:e}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_band_model() -> Rc<SpectrumModel> {
        SpectrumModel::new(vec![
            Band { low_hz: 2.400e9, center_hz: 2.410e9, high_hz: 2.420e9 },
            Band { low_hz: 2.420e9, center_hz: 2.431e9, high_hz: 2.442e9 },
        ])
    }

    #[test]
    fn test_band_width() {
        let model = two_band_model();
        assert_eq!(model.num_bands(), 2);
        assert!((model.bands()[0].width_hz() - 20e6).abs() < 1.0);
    }

    #[test]
    fn test_elementwise_arithmetic() {
        let model = two_band_model();
        let a = SpectrumValue::from_values(&model, vec![4.0, 9.0]);
        let b = SpectrumValue::from_values(&model, vec![2.0, 3.0]);

        let sum = &a + &b;
        assert_eq!(sum.values(), &[6.0, 12.0]);

        let diff = &sum - &b;
        assert_eq!(diff.values(), &[4.0, 9.0]);

        let ratio = &a / &b;
        assert_eq!(ratio.values(), &[2.0, 3.0]);

        let scaled = &a * 0.5;
        assert_eq!(scaled.values(), &[2.0, 4.5]);

        let divided = &a / 2.0;
        assert_eq!(divided.values(), &[2.0, 4.5]);
    }

    #[test]
    fn test_model_identity_not_equality() {
        let a_model = two_band_model();
        let b_model = two_band_model();
        let a = SpectrumValue::constant(&a_model, 1.0);
        let b = SpectrumValue::constant(&b_model, 1.0);

        // Equal band contents, distinct instances
        assert!(!a.same_model(&b));
        assert!(a.same_model(&a.clone()));
    }

    #[test]
    #[should_panic(expected = "spectrum model mismatch")]
    fn test_mismatched_models_panic() {
        let a = SpectrumValue::constant(&two_band_model(), 1.0);
        let b = SpectrumValue::constant(&two_band_model(), 1.0);
        let _ = &a + &b;
    }

    #[test]
    #[should_panic(expected = "does not match band count")]
    fn test_length_mismatch_panics() {
        let model = two_band_model();
        let _ = SpectrumValue::from_values(&model, vec![1.0]);
    }
}
