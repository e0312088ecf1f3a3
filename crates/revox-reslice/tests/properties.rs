//! Universal invariants of the reslice engine.

use revox_core::image::{Image, ImageInfo, Scalar, ScalarKind};
use revox_core::interpolation::InterpolationMode;
use revox_core::spatial::{Extent, Matrix4d};
use revox_core::stencil::ImageStencil;
use revox_reslice::{ImageReslice, SlabMode, StencilRun};

fn ramp_image<T: Scalar>(
    nx: i32,
    ny: i32,
    nz: i32,
    components: usize,
    value: impl Fn(i32, i32, i32, usize) -> T,
) -> Image {
    let info = ImageInfo::new(Extent::from_dimensions(nx, ny, nz));
    let mut data = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for c in 0..components {
                    data.push(value(i, j, k, c));
                }
            }
        }
    }
    Image::from_vec(info, components, data).unwrap()
}

/// A proper 90-degree rotation about z as reslice axes.
fn quarter_turn_axes() -> Matrix4d {
    let mut axes = Matrix4d::identity();
    axes[(0, 0)] = 0.0;
    axes[(1, 0)] = -1.0;
    axes[(0, 1)] = 1.0;
    axes[(1, 1)] = 0.0;
    axes
}

#[test]
fn test_permutation_roundtrip_nearest_is_exact() {
    let input = ramp_image(4, 4, 4, 1, |i, j, k, _| (100 * k + 10 * j + i) as u16);
    let axes = quarter_turn_axes();

    let mut forward = ImageReslice::new();
    forward.set_reslice_axes(axes);
    let intermediate = forward.execute(&input, None).unwrap();

    let mut back = ImageReslice::new();
    back.set_reslice_axes(axes.try_inverse().unwrap());
    let restored = back.execute(&intermediate.image, None).unwrap();

    assert_eq!(restored.image.info(), input.info());
    assert_eq!(restored.image.data(), input.data());
}

#[test]
fn test_permutation_roundtrip_cubic_interior() {
    let input = ramp_image(6, 6, 6, 1, |i, j, k, _| (100 * k + 10 * j + i) as f32);
    let axes = quarter_turn_axes();

    let mut forward = ImageReslice::new();
    forward.set_reslice_axes(axes);
    forward.set_interpolation_mode(InterpolationMode::Cubic);
    forward.set_optimization(false);
    let intermediate = forward.execute(&input, None).unwrap();

    let mut back = ImageReslice::new();
    back.set_reslice_axes(axes.try_inverse().unwrap());
    back.set_interpolation_mode(InterpolationMode::Cubic);
    back.set_optimization(false);
    let restored = back.execute(&intermediate.image, None).unwrap();

    for k in 1..5 {
        for j in 1..5 {
            for i in 1..5 {
                let a = restored.image.value_at(i, j, k, 0).unwrap();
                let b = input.value_at(i, j, k, 0).unwrap();
                assert!(
                    (a - b).abs() <= f64::from(f32::EPSILON) * b.abs().max(1.0),
                    "mismatch at ({i}, {j}, {k}): {a} vs {b}"
                );
            }
        }
    }
}

#[test]
fn test_background_fidelity_componentwise() {
    let input = ramp_image(3, 3, 3, 2, |i, j, k, c| (i + j + k + c as i32) as u8);
    let mut filter = ImageReslice::new();
    filter.set_transform_input_sampling(false);
    let mut axes = Matrix4d::identity();
    axes[(1, 3)] = 50.0;
    filter.set_reslice_axes(axes);
    // 300 clamps into u8 range on conversion
    filter.set_background_color([300.0, -7.0, 0.0, 0.0]);

    let result = filter.execute(&input, None).unwrap();
    for k in 0..3 {
        for j in 0..3 {
            for i in 0..3 {
                assert_eq!(result.image.value_at(i, j, k, 0), Some(255.0));
                assert_eq!(result.image.value_at(i, j, k, 1), Some(0.0));
            }
        }
    }
}

fn checkerboard_stencil(extent: Extent) -> ImageStencil {
    let mut stencil = ImageStencil::new(extent);
    for z in extent.min(2)..=extent.max(2) {
        for y in extent.min(1)..=extent.max(1) {
            if (y + z) % 2 == 0 {
                stencil.insert_run(extent.min(0) + 1, extent.max(0), y, z);
            } else {
                stencil.insert_run(extent.min(0), extent.min(0), y, z);
            }
        }
    }
    stencil
}

#[test]
fn test_stencil_mask_equivalence() {
    let input = ramp_image(5, 4, 3, 1, |i, j, k, _| (100 * k + 10 * j + i) as i16);
    let mut filter = ImageReslice::new();
    filter.set_background_color([-1.0, 0.0, 0.0, 0.0]);

    let unmasked = filter.execute(&input, None).unwrap();
    let stencil = checkerboard_stencil(*input.extent());
    let masked = filter.execute(&input, Some(&stencil)).unwrap();

    for k in 0..3 {
        for j in 0..4 {
            for i in 0..5 {
                let expected = if stencil.contains(i, j, k) {
                    unmasked.image.value_at(i, j, k, 0)
                } else {
                    Some(-1.0)
                };
                assert_eq!(
                    masked.image.value_at(i, j, k, 0),
                    expected,
                    "stencil gating at ({i}, {j}, {k})"
                );
            }
        }
    }
}

#[test]
fn test_stencil_mask_equivalence_general_path() {
    let input = ramp_image(5, 4, 3, 1, |i, j, k, _| (100 * k + 10 * j + i) as i16);
    let mut filter = ImageReslice::new();
    filter.set_background_color([-1.0, 0.0, 0.0, 0.0]);
    filter.set_optimization(false);

    let unmasked = filter.execute(&input, None).unwrap();
    let stencil = checkerboard_stencil(*input.extent());
    let masked = filter.execute(&input, Some(&stencil)).unwrap();

    for k in 0..3 {
        for j in 0..4 {
            for i in 0..5 {
                let expected = if stencil.contains(i, j, k) {
                    unmasked.image.value_at(i, j, k, 0)
                } else {
                    Some(-1.0)
                };
                assert_eq!(masked.image.value_at(i, j, k, 0), expected);
            }
        }
    }
}

#[test]
fn test_generated_stencil_marks_in_bounds_voxels() {
    let input = ramp_image(4, 3, 2, 1, |i, j, k, _| (100 * k + 10 * j + i) as u8);
    let mut filter = ImageReslice::new();
    filter.set_transform_input_sampling(false);
    let mut axes = Matrix4d::identity();
    axes[(0, 3)] = 2.0;
    filter.set_reslice_axes(axes);
    filter.set_generate_stencil_output(true);

    let result = filter.execute(&input, None).unwrap();
    let mask = result.stencil.expect("stencil output requested");

    for k in 0..2 {
        for j in 0..3 {
            // x + 2 stays within the input for x in {0, 1} only
            assert!(mask.contains(0, j, k));
            assert!(mask.contains(1, j, k));
            assert!(!mask.contains(2, j, k));
            assert!(!mask.contains(3, j, k));
        }
    }

    // the written voxels carry data, the rest the background
    assert_eq!(result.image.value_at(1, 0, 0, 0), Some(3.0));
    assert_eq!(result.image.value_at(2, 0, 0, 0), Some(0.0));
}

/// Path equivalence: the permute fast path and the general path produce
/// identical bytes whenever the fast path is eligible.
#[test]
fn test_path_equivalence() {
    struct Case {
        name: &'static str,
        mode: InterpolationMode,
        axes: Matrix4d,
        input: Image,
        output_kind: Option<ScalarKind>,
        shift: f64,
        scale: f64,
    }

    let mut fractional_shift = Matrix4d::identity();
    fractional_shift[(0, 3)] = 0.25;

    let mut scaled_swap = Matrix4d::identity();
    scaled_swap[(0, 0)] = 0.5;
    scaled_swap[(1, 1)] = 0.0;
    scaled_swap[(2, 2)] = 0.0;
    scaled_swap[(1, 2)] = 1.0;
    scaled_swap[(2, 1)] = 1.0;

    let mut flipped = Matrix4d::identity();
    flipped[(0, 0)] = -1.0;
    flipped[(0, 3)] = 3.0;

    let cases = [
        Case {
            name: "linear fractional shift",
            mode: InterpolationMode::Linear,
            axes: fractional_shift,
            input: ramp_image(6, 5, 4, 1, |i, j, k, _| (i * 7 + j * 3 + k) as f32 * 0.5),
            output_kind: None,
            shift: 0.0,
            scale: 1.0,
        },
        Case {
            name: "cubic scaled axis swap",
            mode: InterpolationMode::Cubic,
            axes: scaled_swap,
            input: ramp_image(6, 5, 4, 1, |i, j, k, _| (100 * k + 10 * j + i) as u16),
            output_kind: None,
            shift: 0.0,
            scale: 1.0,
        },
        Case {
            name: "linear flipped integer axis",
            mode: InterpolationMode::Linear,
            axes: flipped,
            input: ramp_image(4, 4, 4, 2, |i, j, k, c| (16 * k + 4 * j + i + c as i32) as u8),
            output_kind: None,
            shift: 0.0,
            scale: 1.0,
        },
        Case {
            name: "nearest with conversion and rescale",
            mode: InterpolationMode::Nearest,
            axes: fractional_shift,
            input: ramp_image(5, 5, 5, 1, |i, j, k, _| (i * 50 + j * 10 + k) as u16),
            output_kind: Some(ScalarKind::UInt8),
            shift: 2.0,
            scale: 0.25,
        },
    ];

    for case in cases {
        let make = |optimization: bool| {
            let mut filter = ImageReslice::new();
            filter.set_transform_input_sampling(false);
            filter.set_reslice_axes(case.axes);
            filter.set_interpolation_mode(case.mode);
            filter.set_output_scalar_kind(case.output_kind);
            filter.set_scalar_shift(case.shift);
            filter.set_scalar_scale(case.scale);
            filter.set_background_color([3.0, 0.0, 0.0, 0.0]);
            filter.set_optimization(optimization);
            filter.execute(&case.input, None).unwrap()
        };
        let fast = make(true);
        let slow = make(false);
        assert_eq!(
            fast.image.data(),
            slow.image.data(),
            "path equivalence: {}",
            case.name
        );
    }
}

#[test]
fn test_slab_mean_equals_sum_divided() {
    let input = ramp_image(3, 3, 5, 1, |_, _, k, _| (20 * k) as u8);

    let run = |mode: SlabMode| {
        let mut filter = ImageReslice::new();
        filter.set_slab_number_of_slices(3).unwrap();
        filter.set_slab_mode(mode);
        filter.execute(&input, None).unwrap()
    };
    let mean = run(SlabMode::Mean);
    let sum = run(SlabMode::Sum);

    // full slabs only; the z = 0 slab is clipped to two samples
    for k in 1..5 {
        for j in 0..3 {
            for i in 0..3 {
                let s = sum.image.value_at(i, j, k, 0).unwrap();
                let m = mean.image.value_at(i, j, k, 0).unwrap();
                assert_eq!(m, (s / 3.0).round(), "slab mean vs sum at ({i}, {j}, {k})");
            }
        }
    }
}

#[test]
fn test_thread_decomposition_independence() {
    let input = ramp_image(8, 7, 6, 1, |i, j, k, _| (i * 43 + j * 17 + k * 5) as u16);
    let mut filter = ImageReslice::new();
    filter.set_transform_input_sampling(false);
    let mut axes = Matrix4d::identity();
    axes[(0, 3)] = 0.5;
    axes[(1, 3)] = -1.25;
    filter.set_reslice_axes(axes);
    filter.set_interpolation_mode(InterpolationMode::Linear);
    filter.set_background_color([9.0, 0.0, 0.0, 0.0]);

    let reference = filter.execute(&input, None).unwrap();

    let pass = filter.begin_pass(&input, None).unwrap();
    let whole = pass.output_info().extent;

    let decompositions: Vec<Vec<Extent>> = vec![
        // single tile
        vec![whole],
        // z slabs
        (whole.min(2)..=whole.max(2))
            .map(|z| {
                let mut tile = whole;
                tile.set_min(2, z);
                tile.set_max(2, z);
                tile
            })
            .collect(),
        // uneven y beams
        vec![
            Extent([whole.min(0), whole.max(0), 0, 1, whole.min(2), whole.max(2)]),
            Extent([whole.min(0), whole.max(0), 2, 6, whole.min(2), whole.max(2)]),
        ],
        // x blocks (no stencil output, so x splits are allowed)
        vec![
            Extent([0, 2, whole.min(1), whole.max(1), whole.min(2), whole.max(2)]),
            Extent([3, 7, whole.min(1), whole.max(1), whole.min(2), whole.max(2)]),
        ],
    ];

    for (d, tiles) in decompositions.into_iter().enumerate() {
        let mut output = Image::try_new(
            pass.output_info().clone(),
            pass.output_scalar_kind(),
            pass.num_components(),
        )
        .unwrap();
        let mut runs = Vec::new();
        for tile in &tiles {
            pass.execute_tile(tile, &mut output, &mut runs).unwrap();
        }
        assert_eq!(
            output.data(),
            reference.image.data(),
            "decomposition {d} differs from reference"
        );
    }
}

#[test]
fn test_generated_stencil_thread_independence() {
    let input = ramp_image(6, 6, 6, 1, |i, j, k, _| (i + j + k) as u8);
    let mut filter = ImageReslice::new();
    filter.set_transform_input_sampling(false);
    let mut axes = Matrix4d::identity();
    axes[(0, 3)] = 3.0;
    filter.set_reslice_axes(axes);
    filter.set_generate_stencil_output(true);

    let reference = filter.execute(&input, None).unwrap();
    let reference_mask = reference.stencil.unwrap();

    let pass = filter.begin_pass(&input, None).unwrap();
    let whole = pass.output_info().extent;

    // a y/z decomposition that never splits x
    let tiles = [
        Extent([whole.min(0), whole.max(0), 0, 2, 0, 3]),
        Extent([whole.min(0), whole.max(0), 3, 5, 0, 3]),
        Extent([whole.min(0), whole.max(0), 0, 5, 4, 5]),
    ];

    let mut output = Image::try_new(
        pass.output_info().clone(),
        pass.output_scalar_kind(),
        pass.num_components(),
    )
    .unwrap();
    let mut runs: Vec<StencilRun> = Vec::new();
    for tile in &tiles {
        pass.execute_tile(tile, &mut output, &mut runs).unwrap();
    }
    runs.sort_by_key(|r| (r.z, r.y, r.x_lo));
    let mut mask = ImageStencil::new(whole);
    for r in runs {
        mask.insert_run(r.x_lo, r.x_hi, r.y, r.z);
    }

    assert_eq!(output.data(), reference.image.data());
    assert_eq!(mask, reference_mask);
}
