use nalgebra::Matrix4;

/// Homogeneous transform of one Denavit-Hartenberg link.
///
/// Rotation about z by `theta` composed with rotation about x by `alpha`,
/// translated by `a` along the rotated x axis and `d` along z.
pub fn dh_transform(d: f64, theta: f64, a: f64, alpha: f64) -> Matrix4<f64> {
    let (st, ct) = theta.sin_cos();
    let (sa, ca) = alpha.sin_cos();

    #[rustfmt::skip]
    let transform = Matrix4::new(
        ct, -st * ca, st * sa, a * ct,
        st, ct * ca, -ct * sa, a * st,
        0.0, sa, ca, d,
        0.0, 0.0, 0.0, 1.0,
    );
    transform
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_close(a: &Matrix4<f64>, b: &Matrix4<f64>) {
        assert!((a - b).abs().max() < 1e-12, "\n{a}\n!=\n{b}");
    }

    #[test]
    fn identity_for_zero_parameters() {
        assert_close(&dh_transform(0.0, 0.0, 0.0, 0.0), &Matrix4::identity());
    }

    #[test]
    fn pure_translation_along_z() {
        let t = dh_transform(0.25, 0.0, 0.0, 0.0);
        assert_eq!(t[(2, 3)], 0.25);
        assert_eq!(t.fixed_view::<3, 3>(0, 0).into_owned(), nalgebra::Matrix3::identity());
    }

    #[test]
    fn half_turn_about_x_flips_y_and_z() {
        let t = dh_transform(0.0, 0.0, 0.0, PI);
        let expected = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        assert_close(&t, &expected);
    }

    #[test]
    fn link_length_follows_theta() {
        let t = dh_transform(0.0, FRAC_PI_2, 2.0, 0.0);
        assert!((t[(0, 3)]).abs() < 1e-12);
        assert!((t[(1, 3)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_block_is_orthonormal() {
        let t = dh_transform(0.1, 0.7, 0.3, 1.1);
        let r = t.fixed_view::<3, 3>(0, 0).into_owned();
        let should_be_identity = r.transpose() * r;
        assert!((should_be_identity - nalgebra::Matrix3::identity()).abs().max() < 1e-12);
    }
}
