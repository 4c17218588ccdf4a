// Principal moments of a symmetric inertia tensor.
//
// The scene graph stores inertia as a diagonal plus a principal-axes rotation,
// the physics description stores the full tensor. Cyclic Jacobi sweeps are
// plenty for a 3x3.

use glam::{DMat3, DQuat, DVec3};

const MAX_SWEEPS: usize = 64;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-24;

/// Decompose `tensor = R * diag(moments) * R^T`.
///
/// Returns `(moments, R)` with `R` a proper rotation. A tensor that is already
/// diagonal comes back untouched with the identity rotation.
pub fn principal_moments(tensor: DMat3) -> (DVec3, DQuat) {
    let mut a = tensor.transpose().to_cols_array_2d(); // a[row][col]
    let mut v = DMat3::IDENTITY.to_cols_array_2d(); // v[row][col], columns are axes

    for _ in 0..MAX_SWEEPS {
        let off = a[0][1].powi(2) + a[0][2].powi(2) + a[1][2].powi(2);
        if off < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for (p, q) in [(0, 1), (0, 2), (1, 2)] {
            if a[p][q] == 0.0 {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            for row in a.iter_mut() {
                let (kp, kq) = (row[p], row[q]);
                row[p] = c * kp - s * kq;
                row[q] = s * kp + c * kq;
            }
            for k in 0..3 {
                let (pk, qk) = (a[p][k], a[q][k]);
                a[p][k] = c * pk - s * qk;
                a[q][k] = s * pk + c * qk;
            }
            for row in v.iter_mut() {
                let (kp, kq) = (row[p], row[q]);
                row[p] = c * kp - s * kq;
                row[q] = s * kp + c * kq;
            }
        }
    }

    let column = |j: usize| DVec3::new(v[0][j], v[1][j], v[2][j]);
    let mut axes = DMat3::from_cols(column(0), column(1), column(2));
    if axes.determinant() < 0.0 {
        axes.z_axis = -axes.z_axis;
    }

    (
        DVec3::new(a[0][0], a[1][1], a[2][2]),
        DQuat::from_mat3(&axes).normalize(),
    )
}

/// Rebuild the full tensor from principal moments and axes.
pub fn inertia_tensor(moments: DVec3, axes: DQuat) -> DMat3 {
    let r = DMat3::from_quat(axes.normalize());
    r * DMat3::from_diagonal(moments) * r.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat3_eq(a: DMat3, b: DMat3) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_diagonal_tensor_is_untouched() {
        let (moments, axes) = principal_moments(DMat3::from_diagonal(DVec3::new(1.0, 2.0, 3.0)));
        assert_eq!(moments, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(axes, DQuat::IDENTITY);
    }

    #[test]
    fn test_full_tensor_reconstructs() {
        let tensor = DMat3::from_cols(
            DVec3::new(2.0, 0.3, -0.1),
            DVec3::new(0.3, 1.5, 0.2),
            DVec3::new(-0.1, 0.2, 1.0),
        );
        let (moments, axes) = principal_moments(tensor);
        assert_mat3_eq(inertia_tensor(moments, axes), tensor);
    }

    #[test]
    fn test_rotated_diagonal_recovers_moments() {
        let rotation = DQuat::from_rotation_z(0.7) * DQuat::from_rotation_x(0.2);
        let tensor = inertia_tensor(DVec3::new(1.0, 4.0, 9.0), rotation);
        let (moments, axes) = principal_moments(tensor);

        let mut sorted = moments.to_array();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(sorted[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(sorted[1], 4.0, epsilon = 1e-9);
        assert_relative_eq!(sorted[2], 9.0, epsilon = 1e-9);
        assert_mat3_eq(inertia_tensor(moments, axes), tensor);
    }
}
