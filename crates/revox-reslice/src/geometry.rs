//! Output-geometry derivation and the input update-extent pre-pass.

use revox_core::image::ImageInfo;
use revox_core::interpolation::Interpolator;
use revox_core::spatial::{floor_frac, round, Direction3, Extent, Matrix3d, Matrix4d, Vector4d};

use crate::filter::ImageReslice;
use crate::index_matrix::{build_index_matrix, IndexTransform};

impl ImageReslice {
    /// Compute the output grid geometry from the input geometry and the
    /// user parameters.
    ///
    /// When `transform_input_sampling` is on, spacing and extent follow the
    /// input axes closest to each output axis, weighted by the squared
    /// direction cosines of the combined rotation; the output origin places
    /// the input's world-space center at the output extent's center. Axes at
    /// or above the output dimensionality collapse to a single slice.
    pub fn derive_output_info(&self, input: &ImageInfo) -> ImageInfo {
        let source = self.information_input.as_ref().unwrap_or(input);
        let in_ext = source.extent;
        let in_sp = source.spacing;
        let in_dir = source.direction;
        let in_org = source.origin;

        let out_dir = if self.pass_direction_to_output {
            in_dir
        } else {
            self.output_direction
        };

        // world-space center of the input volume
        let mut center = [0.0; 3];
        for i in 0..3 {
            center[i] = 0.5 * f64::from(in_ext.min(i) + in_ext.max(i)) * in_sp[i];
        }
        center = in_dir.apply(center);
        for i in 0..3 {
            center[i] += in_org[i];
        }

        let mut out_sp = in_sp;
        let mut out_ext = in_ext;
        if self.transform_input_sampling {
            let mut rotation = *out_dir.inner();
            if let Some(axes) = &self.reslice_axes {
                let mut axes_rot = Matrix3d::zeros();
                for i in 0..3 {
                    for j in 0..3 {
                        axes_rot[(i, j)] = axes[(i, j)];
                    }
                }
                rotation = axes_rot * rotation;

                // shift and counter-rotate the center for the axes placement
                for i in 0..3 {
                    center[i] -= axes[(i, 3)];
                }
                let inv = axes_rot.try_inverse().unwrap_or_else(Matrix3d::identity);
                let c = inv * nalgebra::Vector3::new(center[0], center[1], center[2]);
                center = [c[0], c[1], c[2]];
            }
            let in_inv = in_dir.try_inverse().unwrap_or_else(Direction3::identity);
            rotation = in_inv.inner() * rotation;

            for i in 0..3 {
                let mut s = 0.0; // output spacing
                let mut d = 0.0; // linear dimension
                let mut e = 0.0; // extent start
                let mut r = 0.0;
                for j in 0..3 {
                    let tmp = rotation[(j, i)] * rotation[(j, i)];
                    s += tmp * in_sp[j].abs();
                    d += tmp * f64::from(in_ext.max(j) - in_ext.min(j)) * in_sp[j].abs();
                    e += tmp * f64::from(in_ext.min(j));
                    r += tmp;
                }
                s /= r;
                d /= r * r.sqrt();
                e /= r;

                if !self.compute_output_spacing {
                    s = self.output_spacing[i];
                }
                out_sp[i] = s;

                let lo = round(e) as i32;
                out_ext.set_min(i, lo);
                out_ext.set_max(i, round(f64::from(lo) + (d / s).abs()) as i32);
            }
        }

        let mut max_bounds = [0.0; 6];
        if self.auto_crop_output {
            max_bounds = self.auto_crop_bounds_inner(input, &out_dir);
            for i in 0..3 {
                let d = max_bounds[2 * i + 1] - max_bounds[2 * i];
                let s = if self.compute_output_spacing {
                    out_sp[i]
                } else {
                    self.output_spacing[i]
                };
                out_ext.set_max(i, round(f64::from(out_ext.min(i)) + (d / s).abs()) as i32);
            }
        }

        let dim = self.output_dimensionality as usize;
        let mut p_center = [0.0; 3];
        for i in 0..3 {
            if !self.compute_output_spacing {
                out_sp[i] = self.output_spacing[i];
            }
            if i >= dim {
                out_ext.set_min(i, 0);
                out_ext.set_max(i, 0);
            } else if !self.compute_output_extent {
                out_ext.set_min(i, self.output_extent.min(i));
                out_ext.set_max(i, self.output_extent.max(i));
            }
            p_center[i] = 0.5 * f64::from(out_ext.min(i) + out_ext.max(i)) * out_sp[i];
        }
        p_center = out_dir.apply(p_center);

        let mut out_org = [0.0; 3];
        for i in 0..3 {
            if i >= dim {
                out_org[i] = 0.0;
            } else if !self.compute_output_origin {
                out_org[i] = self.output_origin[i];
            } else if self.auto_crop_output {
                // pin the mapped bounds flush to the lower extent corner
                let x = max_bounds[0] - f64::from(out_ext.min(0)) * out_sp[0];
                let y = max_bounds[2] - f64::from(out_ext.min(1)) * out_sp[1];
                let z = max_bounds[4] - f64::from(out_ext.min(2)) * out_sp[2];
                out_org[i] = x * out_dir[(i, 0)] + y * out_dir[(i, 1)] + z * out_dir[(i, 2)];
            } else {
                out_org[i] = center[i] - p_center[i];
            }
        }

        ImageInfo {
            extent: out_ext,
            spacing: out_sp,
            origin: out_org,
            direction: out_dir,
        }
    }

    /// Bounding box, in output-oriented world coordinates, of the input
    /// volume mapped through the inverse reslice transform and axes.
    pub fn auto_cropped_bounds(&self, input: &ImageInfo) -> [f64; 6] {
        let out_dir = if self.pass_direction_to_output {
            self.information_input.as_ref().unwrap_or(input).direction
        } else {
            self.output_direction
        };
        self.auto_crop_bounds_inner(input, &out_dir)
    }

    fn auto_crop_bounds_inner(&self, input: &ImageInfo, out_dir: &Direction3) -> [f64; 6] {
        let matrix = match &self.reslice_axes {
            Some(axes) => axes.try_inverse().unwrap_or_else(Matrix4d::identity),
            None => Matrix4d::identity(),
        };
        let dir_inv = out_dir.try_inverse().unwrap_or_else(Direction3::identity);

        let mut bounds = [0.0; 6];
        for i in 0..3 {
            bounds[2 * i] = f64::MAX;
            bounds[2 * i + 1] = -f64::MAX;
        }

        for corner in input.extent.corners() {
            let mut p = [
                f64::from(corner[0]) * input.spacing[0],
                f64::from(corner[1]) * input.spacing[1],
                f64::from(corner[2]) * input.spacing[2],
            ];
            p = input.direction.apply(p);
            for i in 0..3 {
                p[i] += input.origin[i];
            }

            if let Some(transform) = &self.reslice_transform {
                p = transform.inverse(p);
            }
            let q = matrix * Vector4d::new(p[0], p[1], p[2], 1.0);
            let f = 1.0 / q[3];
            let p = dir_inv.apply([q[0] * f, q[1] * f, q[2] * f]);

            for j in 0..3 {
                if p[j] > bounds[2 * j + 1] {
                    bounds[2 * j + 1] = p[j];
                }
                if p[j] < bounds[2 * j] {
                    bounds[2 * j] = p[j];
                }
            }
        }
        bounds
    }

    /// The input sub-extent needed to produce `request` voxels of output,
    /// and whether any sample hits the input at all.
    ///
    /// The flag is false only when the union of all sampled positions misses
    /// the input entirely; the returned extent is then degenerate but never
    /// inverted. A nonlinear reslice transform requests the full input.
    pub fn derive_input_update_extent(
        &self,
        input: &ImageInfo,
        request: &Extent,
    ) -> (Extent, bool) {
        let out_info = self.derive_output_info(input);
        let it = build_index_matrix(
            self.reslice_axes.as_ref(),
            self.reslice_transform.as_deref(),
            input,
            &out_info,
        );
        let (interpolator, _) = self.configured_interpolator(&it, &out_info.extent);
        self.input_update_extent_inner(input, &it, interpolator.as_ref(), request)
    }

    pub(crate) fn input_update_extent_inner(
        &self,
        input: &ImageInfo,
        it: &IndexTransform,
        interpolator: &dyn Interpolator,
        request: &Extent,
    ) -> (Extent, bool) {
        // the per-voxel mapping is not affine; analysis cannot bound it
        if it.nonlinear {
            return (input.extent, true);
        }

        let wrap = self.wrap || self.mirror;
        let m = &it.matrix;
        let x_axis = [m[(0, 0)], m[(1, 0)], m[(2, 0)], m[(3, 0)]];
        let y_axis = [m[(0, 1)], m[(1, 1)], m[(2, 1)], m[(3, 1)]];
        let z_axis = [m[(0, 2)], m[(1, 2)], m[(2, 2)], m[(3, 2)]];
        let origin = [m[(0, 3)], m[(1, 3)], m[(2, 3)], m[(3, 3)]];

        let mut out_req = *request;
        if self.slab_number_of_slices > 1 {
            let pad = (self.slab_number_of_slices + 1) / 2;
            out_req.set_min(2, out_req.min(2) - pad);
            out_req.set_max(2, out_req.max(2) + pad);
        }

        let support = interpolator.compute_support_size(Some(m));

        let mut lo = [i64::MAX; 3];
        let mut hi = [i64::MIN; 3];

        // the corner walk must match the execution paths exactly
        for corner in out_req.corners() {
            let mut p = [0.0; 4];
            for c in 0..4 {
                let p0 = origin[c] + f64::from(corner[2]) * z_axis[c];
                let p1 = p0 + f64::from(corner[1]) * y_axis[c];
                p[c] = p1 + f64::from(corner[0]) * x_axis[c];
            }
            if p[3] != 1.0 {
                let f = 1.0 / p[3];
                p[0] *= f;
                p[1] *= f;
                p[2] *= f;
            }

            for j in 0..3 {
                let kernel_size = support[j];
                let extra = i64::from((kernel_size + 1) / 2 - 1);

                if kernel_size % 2 == 0 {
                    let (mut k, f) = floor_frac(p[j]);
                    if k - extra < lo[j] {
                        lo[j] = k - extra;
                    }
                    k += i64::from(f != 0.0);
                    if k + extra > hi[j] {
                        hi[j] = k + extra;
                    }
                } else {
                    let k = round(p[j]);
                    if k < lo[j] {
                        lo[j] = k - extra;
                    }
                    if k > hi[j] {
                        hi[j] = k + extra;
                    }
                }
            }
        }

        // clip to the whole extent; a clean miss keeps a degenerate
        // (never inverted) interval
        let whole = &input.extent;
        let mut hit = true;
        let mut ext = [0i32; 6];
        for k in 0..3 {
            let wlo = i64::from(whole.min(k));
            let whi = i64::from(whole.max(k));
            let mut l = lo[k];
            let mut h = hi[k];
            if l < wlo {
                l = wlo;
                if wrap {
                    h = whi;
                } else if h < wlo {
                    h = wlo;
                    hit = false;
                }
            }
            if h > whi {
                h = whi;
                if wrap {
                    l = wlo;
                } else if l > whi {
                    l = whi;
                    if l < wlo {
                        l = wlo;
                    }
                    hit = false;
                }
            }
            ext[2 * k] = l as i32;
            ext[2 * k + 1] = h as i32;
        }

        (Extent(ext), hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use revox_core::spatial::Extent;

    fn basic_input() -> ImageInfo {
        let mut info = ImageInfo::new(Extent::from_dimensions(10, 12, 14));
        info.spacing = [1.0, 2.0, 3.0];
        info.origin = [5.0, 6.0, 7.0];
        info
    }

    #[test]
    fn test_identity_geometry_passthrough() {
        let filter = ImageReslice::new();
        let input = basic_input();
        let out = filter.derive_output_info(&input);
        assert_eq!(out.extent, input.extent);
        assert_eq!(out.spacing, input.spacing);
        assert_eq!(out.origin, input.origin);
    }

    #[test]
    fn test_axis_swap_spacing_projection() {
        let mut filter = ImageReslice::new();
        // swap x and y
        filter.set_reslice_axes_direction_cosines(
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0],
        );
        let input = basic_input();
        let out = filter.derive_output_info(&input);
        // output x follows input y, and vice versa
        assert_relative_eq!(out.spacing[0], 2.0);
        assert_relative_eq!(out.spacing[1], 1.0);
        assert_relative_eq!(out.spacing[2], 3.0);
        assert_eq!(out.extent.size(0), 12);
        assert_eq!(out.extent.size(1), 10);
        assert_eq!(out.extent.size(2), 14);
    }

    #[test]
    fn test_dimensionality_collapse() {
        let mut filter = ImageReslice::new();
        filter.set_output_dimensionality(2).unwrap();
        let input = basic_input();
        let out = filter.derive_output_info(&input);
        assert_eq!(out.extent.min(2), 0);
        assert_eq!(out.extent.max(2), 0);
        assert_eq!(out.origin[2], 0.0);
    }

    #[test]
    fn test_user_overrides() {
        let mut filter = ImageReslice::new();
        filter.set_output_spacing([0.5, 0.5, 0.5]);
        filter.set_output_extent(Extent([0, 19, 0, 23, 0, 27]));
        filter.set_output_origin([1.0, 2.0, 3.0]);
        let input = basic_input();
        let out = filter.derive_output_info(&input);
        assert_eq!(out.spacing, [0.5, 0.5, 0.5]);
        assert_eq!(out.extent, Extent([0, 19, 0, 23, 0, 27]));
        assert_eq!(out.origin, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_update_extent_identity_nearest() {
        let filter = ImageReslice::new();
        let input = ImageInfo::new(Extent::from_dimensions(8, 8, 8));
        let request = Extent([2, 5, 1, 6, 0, 7]);
        let (ext, hit) = filter.derive_input_update_extent(&input, &request);
        assert!(hit);
        assert_eq!(ext, request);
    }

    #[test]
    fn test_update_extent_linear_pads_one() {
        let mut filter = ImageReslice::new();
        filter.set_interpolation_mode(revox_core::interpolation::InterpolationMode::Linear);
        // keep the input geometry so the axes shift is not re-centered away
        filter.set_transform_input_sampling(false);
        // half-voxel shift forces a genuine linear kernel
        let mut m = Matrix4d::identity();
        m[(0, 3)] = 0.5;
        filter.set_reslice_axes(m);
        let input = ImageInfo::new(Extent::from_dimensions(8, 8, 8));
        let request = Extent([2, 4, 2, 4, 2, 4]);
        let (ext, hit) = filter.derive_input_update_extent(&input, &request);
        assert!(hit);
        // x positions 2.5..4.5 need voxels 2..=5
        assert_eq!(ext.min(0), 2);
        assert_eq!(ext.max(0), 5);
        // y and z are integer-aligned, kernel collapses
        assert_eq!(ext.min(1), 2);
        assert_eq!(ext.max(1), 4);
    }

    #[test]
    fn test_update_extent_full_miss() {
        let mut filter = ImageReslice::new();
        filter.set_transform_input_sampling(false);
        let mut m = Matrix4d::identity();
        m[(0, 3)] = 100.0;
        filter.set_reslice_axes(m);
        let input = ImageInfo::new(Extent::from_dimensions(4, 4, 4));
        let request = Extent([0, 3, 0, 3, 0, 3]);
        let (ext, hit) = filter.derive_input_update_extent(&input, &request);
        assert!(!hit);
        assert!(!ext.is_empty());
        assert_eq!(ext.min(0), ext.max(0));
    }

    #[test]
    fn test_update_extent_wrap_expands() {
        let mut filter = ImageReslice::new();
        filter.set_wrap(true);
        filter.set_transform_input_sampling(false);
        let mut m = Matrix4d::identity();
        m[(0, 3)] = 2.0;
        filter.set_reslice_axes(m);
        let input = ImageInfo::new(Extent::from_dimensions(4, 4, 4));
        let request = Extent([0, 3, 0, 3, 0, 3]);
        let (ext, hit) = filter.derive_input_update_extent(&input, &request);
        assert!(hit);
        // the clipped axis expands to the whole extent under wrap
        assert_eq!(ext.min(0), 0);
        assert_eq!(ext.max(0), 3);
    }
}
