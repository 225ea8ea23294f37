//! Device-resident scalar volume.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};

use super::geometry::FieldGeometry;
use crate::error::{FieldError, Result};
use crate::kernels;
use crate::spatial::{Point, Spacing};

/// A scalar volume whose samples live on a backend device.
///
/// The buffer is optional: `clone_empty` produces a correctly shaped holder
/// with no samples, which every read operation rejects with
/// [`FieldError::Unallocated`] until a buffer is attached.
///
/// Tensor operations never mutate shared storage, so `clone` yields a field
/// whose later in-place updates leave the original untouched.
#[derive(Debug, Clone)]
pub struct VolumetricField<B: Backend> {
    geometry: FieldGeometry,
    data: Option<Tensor<B, 3>>,
    device: B::Device,
}

impl<B: Backend> VolumetricField<B> {
    /// Wrap an existing tensor. The shape is taken from the tensor.
    pub fn from_tensor(data: Tensor<B, 3>, spacing: Spacing<3>, origin: Point<3>) -> Result<Self> {
        let geometry = FieldGeometry::new(data.dims(), spacing, origin)?;
        let device = data.device();
        Ok(Self {
            geometry,
            data: Some(data),
            device,
        })
    }

    /// Upload host samples laid out slowest axis first.
    pub fn from_samples(samples: Vec<f32>, geometry: FieldGeometry, device: &B::Device) -> Result<Self> {
        if samples.len() != geometry.len() {
            return Err(FieldError::invalid_source(format!(
                "{} samples for shape {:?}",
                samples.len(),
                geometry.shape()
            )));
        }
        let data = Tensor::from_data(TensorData::new(samples, geometry.shape()), device);
        Ok(Self {
            geometry,
            data: Some(data),
            device: device.clone(),
        })
    }

    /// Pair a tensor already known to match `geometry`.
    pub(crate) fn derived_from(geometry: FieldGeometry, data: Tensor<B, 3>, device: &B::Device) -> Self {
        Self {
            geometry,
            data: Some(data),
            device: device.clone(),
        }
    }

    pub fn zeros(geometry: FieldGeometry, device: &B::Device) -> Self {
        Self::filled(geometry, 0.0, device)
    }

    pub fn filled(geometry: FieldGeometry, value: f32, device: &B::Device) -> Self {
        let data = Tensor::<B, 3>::ones(geometry.shape(), device).mul_scalar(value);
        Self {
            geometry,
            data: Some(data),
            device: device.clone(),
        }
    }

    /// Same geometry and device, no buffer.
    pub fn clone_empty(&self) -> Self {
        Self {
            geometry: self.geometry,
            data: None,
            device: self.device.clone(),
        }
    }

    /// Attach a buffer, consuming the holder.
    pub fn with_data(mut self, data: Tensor<B, 3>) -> Result<Self> {
        self.set_data(data)?;
        Ok(self)
    }

    /// Replace the buffer. The tensor must match the field's shape.
    pub fn set_data(&mut self, data: Tensor<B, 3>) -> Result<()> {
        let actual = data.dims();
        if actual != self.geometry.shape() {
            return Err(FieldError::shape_mismatch(self.geometry.shape(), actual));
        }
        self.data = Some(data);
        Ok(())
    }

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    pub fn shape(&self) -> [usize; 3] {
        self.geometry.shape()
    }

    pub fn spacing(&self) -> &Spacing<3> {
        self.geometry.spacing()
    }

    pub fn origin(&self) -> &Point<3> {
        self.geometry.origin()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Borrow the sample buffer.
    pub fn data(&self) -> Result<&Tensor<B, 3>> {
        self.data
            .as_ref()
            .ok_or_else(|| FieldError::unallocated("read of an empty field"))
    }

    pub fn into_data(self) -> Result<Tensor<B, 3>> {
        self.data
            .ok_or_else(|| FieldError::unallocated("read of an empty field"))
    }

    fn data_for(&self, op: &str) -> Result<&Tensor<B, 3>> {
        self.data.as_ref().ok_or_else(|| FieldError::unallocated(op))
    }

    /// Copy all samples to the host, slowest axis first.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.data_for("to_vec")?.clone().into_data().iter::<f32>().collect())
    }

    /// Read a single sample.
    pub fn value_at(&self, index: [usize; 3]) -> Result<f32> {
        let block = self.read_block(index, [1, 1, 1])?;
        Ok(block[0])
    }

    /// Copy a box of samples to the host.
    pub fn read_block(&self, start: [usize; 3], size: [usize; 3]) -> Result<Vec<f32>> {
        let ranges = self.block_ranges(start, size)?;
        let block = self.data_for("read_block")?.clone().slice(ranges);
        Ok(block.into_data().iter::<f32>().collect())
    }

    /// Add host values to a box of samples in place.
    pub fn add_block(&mut self, start: [usize; 3], size: [usize; 3], values: Vec<f32>) -> Result<()> {
        let ranges = self.block_ranges(start, size)?;
        if values.len() != size.iter().product::<usize>() {
            return Err(FieldError::shape_mismatch(size, [values.len(), 1, 1]));
        }
        let data = self.data_for("add_block")?.clone();
        let delta = Tensor::<B, 3>::from_data(TensorData::new(values, size), &self.device);
        let updated = data.clone().slice(ranges.clone()) + delta;
        self.data = Some(data.slice_assign(ranges, updated));
        Ok(())
    }

    fn block_ranges(&self, start: [usize; 3], size: [usize; 3]) -> Result<[std::ops::Range<usize>; 3]> {
        let shape = self.shape();
        let fits = (0..3).all(|k| size[k] > 0 && start[k] + size[k] <= shape[k]);
        if !fits {
            return Err(FieldError::invalid_geometry(format!(
                "block at {:?} of size {:?} exceeds shape {:?}",
                start, size, shape
            )));
        }
        Ok([0, 1, 2].map(|k| start[k]..start[k] + size[k]))
    }

    /// Smallest sample value.
    pub fn min(&self) -> Result<f32> {
        Ok(self.data_for("min")?.clone().min().into_scalar().elem::<f32>())
    }

    /// Largest sample value.
    pub fn max(&self) -> Result<f32> {
        Ok(self.data_for("max")?.clone().max().into_scalar().elem::<f32>())
    }

    /// Sum of all samples.
    pub fn sum(&self) -> Result<f64> {
        Ok(self.data_for("sum")?.clone().sum().into_scalar().elem::<f64>())
    }

    /// Rescale samples to [0, 1] in place. A constant field is left as is.
    pub fn normalize(&mut self) -> Result<()> {
        let min = self.min()?;
        let max = self.max()?;
        let range = max - min;
        if range <= 0.0 {
            tracing::debug!(value = min, "normalize skipped on constant field");
            return Ok(());
        }
        let data = self.data_for("normalize")?.clone();
        self.data = Some(data.sub_scalar(min).div_scalar(range));
        Ok(())
    }

    /// Multiply every sample by `value` in place.
    pub fn scale(&mut self, value: f64) -> Result<()> {
        let data = self.data_for("scale")?.clone();
        self.data = Some(data.mul_scalar(value));
        Ok(())
    }

    /// Set every sample to `value`, allocating the buffer if needed.
    pub fn fill(&mut self, value: f32) {
        self.data = Some(Tensor::<B, 3>::ones(self.shape(), &self.device).mul_scalar(value));
    }

    fn operands(&self, other: &Self, op: &str) -> Result<(Tensor<B, 3>, Tensor<B, 3>)> {
        self.geometry.ensure_same_shape(&other.geometry)?;
        Ok((self.data_for(op)?.clone(), other.data_for(op)?.clone()))
    }

    fn binary<F>(&self, other: &Self, op: &str, f: F) -> Result<Self>
    where
        F: FnOnce(Tensor<B, 3>, Tensor<B, 3>) -> Tensor<B, 3>,
    {
        let (a, b) = self.operands(other, op)?;
        Ok(Self {
            geometry: self.geometry,
            data: Some(f(a, b)),
            device: self.device.clone(),
        })
    }

    fn binary_inplace<F>(&mut self, other: &Self, op: &str, f: F) -> Result<()>
    where
        F: FnOnce(Tensor<B, 3>, Tensor<B, 3>) -> Tensor<B, 3>,
    {
        let (a, b) = self.operands(other, op)?;
        self.data = Some(f(a, b));
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.binary(other, "add", |a, b| a + b)
    }

    pub fn subtract(&self, other: &Self) -> Result<Self> {
        self.binary(other, "subtract", |a, b| a - b)
    }

    pub fn multiply(&self, other: &Self) -> Result<Self> {
        self.binary(other, "multiply", |a, b| a * b)
    }

    pub fn add_inplace(&mut self, other: &Self) -> Result<()> {
        self.binary_inplace(other, "add_inplace", |a, b| a + b)
    }

    pub fn subtract_inplace(&mut self, other: &Self) -> Result<()> {
        self.binary_inplace(other, "subtract_inplace", |a, b| a - b)
    }

    pub fn multiply_inplace(&mut self, other: &Self) -> Result<()> {
        self.binary_inplace(other, "multiply_inplace", |a, b| a * b)
    }

    /// Same geometry, new buffer.
    fn derived(&self, data: Tensor<B, 3>) -> Self {
        Self {
            geometry: self.geometry,
            data: Some(data),
            device: self.device.clone(),
        }
    }

    /// Partial derivatives along axes 0, 1 and 2 in physical units.
    pub fn gradient(&self) -> Result<[Self; 3]> {
        let data = self.data_for("gradient")?;
        Ok(kernels::gradient(data, self.spacing()).map(|g| self.derived(g)))
    }

    /// Pointwise L2 norm of the gradient.
    pub fn gradient_magnitude(&self) -> Result<Self> {
        let [g0, g1, g2] = kernels::gradient(self.data_for("gradient_magnitude")?, self.spacing());
        let squared = g0.clone() * g0 + g1.clone() * g1 + g2.clone() * g2;
        Ok(self.derived(squared.sqrt()))
    }

    /// Gaussian smoothing with a physical-unit sigma; the receiver is unchanged.
    pub fn gaussian(&self, sigma: f64) -> Result<Self> {
        let data = self.data_for("gaussian")?.clone();
        Ok(self.derived(kernels::smooth(data, sigma, self.spacing())))
    }

    /// Trilinear resample to `target` voxels, preserving physical extent.
    pub fn resample(&self, target: [usize; 3]) -> Result<Self> {
        let geometry = self.geometry.resized(target)?;
        let data = kernels::resize(self.data_for("resample")?, target);
        Ok(Self {
            geometry,
            data: Some(data),
            device: self.device.clone(),
        })
    }
}
