use burn_ndarray::NdArray;
use fluidreg_core::field::{FieldGeometry, HostVolume, VolumetricField};
use fluidreg_core::spatial::{Point, Spacing};

type Backend = NdArray<f32>;

fn blob(shape: [usize; 3], center: [f32; 3], radius: f32) -> VolumetricField<Backend> {
    let device = Default::default();
    let mut samples = Vec::with_capacity(shape.iter().product());
    for i in 0..shape[0] {
        for j in 0..shape[1] {
            for k in 0..shape[2] {
                let d2 = (i as f32 - center[0]).powi(2)
                    + (j as f32 - center[1]).powi(2)
                    + (k as f32 - center[2]).powi(2);
                samples.push(20.0 + 80.0 * (-d2 / (2.0 * radius * radius)).exp());
            }
        }
    }
    let geometry = FieldGeometry::new(shape, Spacing::new([1.0, 1.0, 1.0]), Point::new([5.0, 0.0, -5.0])).unwrap();
    VolumetricField::from_samples(samples, geometry, &device).unwrap()
}

#[test]
fn test_normalize_maps_to_unit_range() {
    let mut field = blob([8, 8, 8], [4.0, 4.0, 4.0], 2.0);
    field.normalize().unwrap();
    let min = field.min().unwrap();
    let max = field.max().unwrap();
    assert!(min.abs() < 1e-6, "Expected min 0, got {}", min);
    assert!((max - 1.0).abs() < 1e-6, "Expected max 1, got {}", max);
}

#[test]
fn test_normalize_constant_field_is_noop() {
    let device = Default::default();
    let geometry = FieldGeometry::with_shape([3, 3, 3]).unwrap();
    let mut field = VolumetricField::<Backend>::filled(geometry, 4.0, &device);
    field.normalize().unwrap();
    for v in field.to_vec().unwrap() {
        assert_eq!(v, 4.0);
    }
}

#[test]
fn test_clone_is_independent() {
    let original = blob([6, 6, 6], [3.0, 3.0, 3.0], 1.5);
    let before = original.to_vec().unwrap();

    let mut copy = original.clone();
    assert_eq!(copy.geometry(), original.geometry());
    assert_eq!(copy.to_vec().unwrap(), before);

    copy.scale(-3.0).unwrap();
    copy.add_inplace(&original).unwrap();
    copy.add_block([0, 0, 0], [1, 1, 1], vec![100.0]).unwrap();

    assert_eq!(original.to_vec().unwrap(), before, "Mutating the clone changed the original");
}

#[test]
fn test_clone_empty_keeps_metadata_only() {
    let original = blob([4, 5, 6], [2.0, 2.0, 2.0], 1.0);
    let empty = original.clone_empty();
    assert_eq!(empty.shape(), [4, 5, 6]);
    assert_eq!(empty.spacing(), original.spacing());
    assert_eq!(empty.origin(), original.origin());
    assert!(!empty.is_allocated());
    assert!(empty.to_vec().is_err());
    assert!(empty.gradient().is_err());
}

#[test]
fn test_gaussian_leaves_receiver_and_smooths() {
    let field = blob([12, 12, 12], [6.0, 6.0, 6.0], 1.0);
    let before = field.to_vec().unwrap();
    let smoothed = field.gaussian(2.0).unwrap();

    assert_eq!(field.to_vec().unwrap(), before);
    assert!(smoothed.max().unwrap() < field.max().unwrap(), "Smoothing should lower the peak");
    assert!(smoothed.min().unwrap() >= field.min().unwrap() - 0.05);
}

#[test]
fn test_gradient_points_towards_blob_center() {
    let field = blob([9, 9, 9], [4.0, 4.0, 4.0], 2.0);
    let [g0, g1, g2] = field.gradient().unwrap();

    // Below the centre along axis 0 the intensity rises
    assert!(g0.value_at([2, 4, 4]).unwrap() > 0.0);
    assert!(g0.value_at([6, 4, 4]).unwrap() < 0.0);
    assert!(g1.value_at([2, 4, 4]).unwrap().abs() < 1e-4);
    assert!(g2.value_at([2, 4, 4]).unwrap().abs() < 1e-4);
    assert!(g0.value_at([4, 4, 4]).unwrap().abs() < 1e-4);
}

#[test]
fn test_ingest_emit_roundtrip_keeps_layout() {
    let device = Default::default();
    let samples: Vec<f32> = (0..60).map(|i| i as f32).collect();
    let source = HostVolume::new([5, 4, 3], samples.clone()).with_spacing_origin([0.5, 1.0, 1.5], [0.0; 3]);

    let field = VolumetricField::<Backend>::ingest(&source, &device).unwrap();
    assert_eq!(field.shape(), [3, 4, 5]);

    let mut target = source.clone();
    target.scalars.clear();
    field.emit(&mut target).unwrap();
    assert_eq!(target.scalars, samples);
}
