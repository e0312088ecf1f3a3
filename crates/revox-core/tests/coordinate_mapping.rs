use proptest::prelude::*;
use revox_core::image::ImageInfo;
use revox_core::spatial::{Direction3, Extent, Matrix4d};
use revox_core::transform::{MatrixTransform, PointTransform};

fn make_rotation(angle_x: f64, angle_y: f64, angle_z: f64) -> Direction3 {
    let cx = angle_x.cos();
    let sx = angle_x.sin();
    let cy = angle_y.cos();
    let sy = angle_y.sin();
    let cz = angle_z.cos();
    let sz = angle_z.sin();

    let rz = Direction3::from_rows([cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]);
    let ry = Direction3::from_rows([cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]);
    let rx = Direction3::from_rows([1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]);

    rx * ry * rz
}

proptest! {
    #[test]
    fn test_index_world_roundtrip(
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
        ix in -50.0f64..50.0, iy in -50.0f64..50.0, iz in -50.0f64..50.0
    ) {
        let mut info = ImageInfo::new(Extent::from_dimensions(2, 2, 2));
        info.origin = [ox, oy, oz];
        info.spacing = [sx, sy, sz];
        info.direction = make_rotation(ax, ay, az);

        let world = info.index_to_world([ix, iy, iz]);
        let recovered = info.world_to_index(world).unwrap();

        prop_assert!((ix - recovered[0]).abs() < 1e-6, "X mismatch: {} vs {}", ix, recovered[0]);
        prop_assert!((iy - recovered[1]).abs() < 1e-6, "Y mismatch: {} vs {}", iy, recovered[1]);
        prop_assert!((iz - recovered[2]).abs() < 1e-6, "Z mismatch: {} vs {}", iz, recovered[2]);
    }

    #[test]
    fn test_matrix_transform_roundtrip(
        tx in -50.0f64..50.0, ty in -50.0f64..50.0, tz in -50.0f64..50.0,
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
        px in -50.0f64..50.0, py in -50.0f64..50.0, pz in -50.0f64..50.0
    ) {
        let rot = make_rotation(ax, ay, az);
        let mut m = Matrix4d::identity();
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] = rot[(i, j)];
            }
        }
        m[(0, 3)] = tx;
        m[(1, 3)] = ty;
        m[(2, 3)] = tz;

        let transform = MatrixTransform::try_new(m).unwrap();
        let q = transform.forward([px, py, pz]);
        let back = transform.inverse(q);

        prop_assert!((px - back[0]).abs() < 1e-6);
        prop_assert!((py - back[1]).abs() < 1e-6);
        prop_assert!((pz - back[2]).abs() < 1e-6);
    }
}
