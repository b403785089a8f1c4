//! Angular separation and position angle of sources relative to a lens.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use ndarray::{Array1, ArrayView1, Zip};

use crate::Float;
use crate::error::{Result, ShearError};
use crate::ndarray_utils::{ensure_same_len, lit, to_f64};

/// Separations below this (in radians) leave the position angle undefined.
pub const MIN_SEPARATION: f64 = 1e-9;

/// Sky geometry used to compute angles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sky {
    /// Flat-sky approximation: small separations are treated as planar.
    #[default]
    Flat,
    /// Exact spherical geometry. Not implemented; requesting it fails.
    Curved,
}

impl fmt::Display for Sky {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sky::Flat => write!(f, "flat"),
            Sky::Curved => write!(f, "curved"),
        }
    }
}

impl FromStr for Sky {
    type Err = ShearError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flat" => Ok(Sky::Flat),
            "curved" => Ok(Sky::Curved),
            _ => Err(ShearError::UnsupportedMode { mode: s.to_owned() }),
        }
    }
}

/// Check that `ra` lies in `[-360, 360]` and `dec` in `[-90, 90]` degrees.
pub fn validate_radec<F: Float>(ra: F, dec: F, what: &str) -> Result<()> {
    if !(lit::<F>(-360.)..=lit(360.)).contains(&ra) {
        return Err(ShearError::invalid_coordinate(format!(
            "ra = {} of {what} is out of domain [-360, 360]",
            to_f64(ra)
        )));
    }
    if !(lit::<F>(-90.)..=lit(90.)).contains(&dec) {
        return Err(ShearError::invalid_coordinate(format!(
            "dec = {} of {what} is out of domain [-90, 90]",
            to_f64(dec)
        )));
    }
    Ok(())
}

/// Wrap an angle difference in radians into `[-pi, pi)`, shifting by one turn at most.
#[inline]
pub(crate) fn wrap_pi<F: Float>(dx: F) -> F {
    if dx >= F::pi() {
        dx - F::two_pi()
    } else if dx < -F::pi() {
        dx + F::two_pi()
    } else {
        dx
    }
}

/// Degrees to radians.
#[inline]
pub(crate) fn radians<F: Float>(deg: F) -> F {
    deg * F::pi() / lit(180.)
}

/// Flat-sky offset of a source from the lens in radians, `(dx, dy)` with `dx` pointing along RA.
#[inline]
fn flat_offset<F: Float>(ra_l: F, cos_dec_l: F, dec_l: F, ra_s: F, dec_s: F) -> (F, F) {
    let dx = wrap_pi(radians(ra_s - ra_l)) * cos_dec_l;
    let dy = radians(dec_s - dec_l);
    (dx, dy)
}

/// Compute the angular separation `theta` and position angle `phi` of every source
/// relative to the lens, both in radians.
///
/// # Arguments
/// - `(ra_l, dec_l)`: Lens position in decimal degrees.
/// - `(ra_s, dec_s)`: Source positions in decimal degrees. Must have the same length.
/// - `sky`: Geometry; only [`Sky::Flat`] is supported.
///
/// The RA difference is wrapped into `[-180, 180)` degrees first and only then scaled by
/// `cos(dec_l)`, so a source at `ra_l + 359` and one at `ra_l - 1` get the same angles.
/// Scaling before wrapping would give different results for RA offsets beyond
/// `180 * cos(dec_l)` degrees away from the equator; those lie far outside the
/// flat-sky regime anyway.
/// `phi = atan2(dy, -dx)`, so `phi` lies in `(-pi, pi]`.
///
/// # Errors
/// - [`ShearError::InvalidCoordinate`] for any position out of domain.
/// - [`ShearError::UnsupportedMode`] for [`Sky::Curved`].
/// - [`ShearError::DegenerateSeparation`] if a source lies within [`MIN_SEPARATION`] of the lens.
///
/// Separations above one degree are logged as a warning since the flat-sky approximation degrades.
///
/// # Example:
/// ```
/// # use ndarray::array;
/// # use cluster_shear::geometry::theta_phi;
/// # use cluster_shear::Sky;
/// let (theta, phi) = theta_phi(0., 0., array![0., 0.001].view(), array![0.001, 0.].view(), Sky::Flat)?;
/// assert!((theta[0] - 0.001f64.to_radians()).abs() < 1e-15);
/// assert!((phi[0] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// # Ok::<(), cluster_shear::ShearError>(())
/// ```
pub fn theta_phi<F: Float>(
    ra_l: F,
    dec_l: F,
    ra_s: ArrayView1<F>,
    dec_s: ArrayView1<F>,
    sky: Sky,
) -> Result<(Array1<F>, Array1<F>)> {
    validate_radec(ra_l, dec_l, "lens")?;
    ensure_same_len(ra_s, "source ra", dec_s, "source dec")?;
    if ra_s.iter().any(|ra| !(lit::<F>(-360.)..=lit(360.)).contains(ra)) {
        return Err(ShearError::invalid_coordinate(
            "object has an invalid ra in source catalog",
        ));
    }
    if dec_s.iter().any(|dec| !(lit::<F>(-90.)..=lit(90.)).contains(dec)) {
        return Err(ShearError::invalid_coordinate(
            "object has an invalid dec in source catalog",
        ));
    }

    if sky != Sky::Flat {
        return Err(ShearError::UnsupportedMode {
            mode: sky.to_string(),
        });
    }

    let n = ra_s.len();
    debug!("Computing flat-sky angles for {n} sources.");
    let cos_dec_l = radians(dec_l).cos();
    let mut theta = Array1::<F>::zeros(n);
    let mut phi = Array1::<F>::zeros(n);

    let zip = Zip::from(&mut theta)
        .and(&mut phi)
        .and(ra_s)
        .and(dec_s);
    let kernel = |t: &mut F, p: &mut F, &ra: &F, &dec: &F| {
        let (dx, dy) = flat_offset(ra_l, cos_dec_l, dec_l, ra, dec);
        *t = (dx * dx + dy * dy).sqrt();
        *p = dy.atan2(-dx);
    };
    #[cfg(feature = "parallel")]
    zip.par_for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    zip.for_each(kernel);

    let min_sep: F = lit(MIN_SEPARATION);
    if let Some((index, t)) = theta.iter().enumerate().find(|(_, t)| **t < min_sep) {
        return Err(ShearError::DegenerateSeparation {
            index,
            theta: to_f64(*t),
        });
    }
    let one_degree = F::pi() / lit(180.);
    let wide = theta.iter().filter(|t| **t > one_degree).count();
    if wide > 0 {
        warn!(
            "Using the flat-sky approximation with separations > 1 deg may be inaccurate ({wide} of {n} sources)."
        );
    }

    Ok((theta, phi))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Uniform;

    use super::*;

    #[test]
    fn wrap() {
        assert_abs_diff_eq!(wrap_pi(1.5 * PI), -0.5 * PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(-1.5 * PI), 0.5 * PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(PI), -PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(0.3), 0.3, epsilon = 1e-15);
    }

    #[test]
    fn axis_aligned_sources() {
        let (theta, phi) = theta_phi(
            0.,
            0.,
            array![0.001, 0.].view(),
            array![0., 0.001].view(),
            Sky::Flat,
        )
        .unwrap();

        assert_abs_diff_eq!(theta[0], 1.7453292519943296e-5, epsilon = 1e-12);
        assert_abs_diff_eq!(theta[1], 1.7453292519943296e-5, epsilon = 1e-12);
        // source east of the lens: dx > 0 so atan2(0, -dx) = pi
        assert_abs_diff_eq!(phi[0], PI, epsilon = 1e-12);
        assert_abs_diff_eq!(phi[1], FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn wraparound_branch() {
        let (theta, _) = theta_phi(
            0.,
            0.,
            array![359., -1., 1.].view(),
            array![0., 0., 0.].view(),
            Sky::Flat,
        )
        .unwrap();
        assert_abs_diff_eq!(theta[0], theta[1], epsilon = 1e-12);
        assert_abs_diff_eq!(theta[0], theta[2], epsilon = 1e-12);
        assert_abs_diff_eq!(theta[0], 1f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn wraparound_branch_off_equator() {
        let (theta, _) = theta_phi(
            0.5,
            60.,
            array![359.9, -0.1].view(),
            array![60.1, 60.1].view(),
            Sky::Flat,
        )
        .unwrap();
        assert_abs_diff_eq!(theta[0], theta[1], epsilon = 1e-12);
    }

    #[test]
    fn ra_scaled_by_cos_dec() {
        let (theta, _) = theta_phi(
            10.,
            60.,
            array![10.01].view(),
            array![60.].view(),
            Sky::Flat,
        )
        .unwrap();
        assert_abs_diff_eq!(theta[0], 0.01f64.to_radians() * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn random_theta_non_negative() {
        let ra = ndarray::Array1::random(500, Uniform::new(-360., 360.));
        let dec = ndarray::Array1::random(500, Uniform::new(-90., 90.));
        let (theta, phi) = theta_phi(12., -30., ra.view(), dec.view(), Sky::Flat).unwrap();
        assert_eq!(theta.len(), 500);
        assert!(theta.iter().all(|t| *t >= 0.));
        assert!(phi.iter().all(|p| *p > -PI && *p <= PI));
    }

    #[test]
    fn single_precision() {
        let (theta, _) = theta_phi(
            0f32,
            0.,
            array![0.5f32].view(),
            array![0f32].view(),
            Sky::Flat,
        )
        .unwrap();
        assert_abs_diff_eq!(theta[0], 0.5f32.to_radians(), epsilon = 1e-6);
    }

    #[test]
    fn invalid_coordinates() {
        let ok = array![0.1];
        let bad_ra = array![400.];
        let bad_dec = array![-91.];
        let err = |r: Result<(ndarray::Array1<f64>, ndarray::Array1<f64>)>| r.unwrap_err();

        assert!(matches!(
            err(theta_phi(361., 0., ok.view(), ok.view(), Sky::Flat)),
            ShearError::InvalidCoordinate { .. }
        ));
        assert!(matches!(
            err(theta_phi(0., 95., ok.view(), ok.view(), Sky::Flat)),
            ShearError::InvalidCoordinate { .. }
        ));
        assert!(matches!(
            err(theta_phi(0., 0., bad_ra.view(), ok.view(), Sky::Flat)),
            ShearError::InvalidCoordinate { .. }
        ));
        assert!(matches!(
            err(theta_phi(0., 0., ok.view(), bad_dec.view(), Sky::Flat)),
            ShearError::InvalidCoordinate { .. }
        ));
        assert!(matches!(
            err(theta_phi(0., 0., array![0.1, 0.2].view(), ok.view(), Sky::Flat)),
            ShearError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn curved_sky_unsupported() {
        let src = array![0.1];
        let err = theta_phi(0., 0., src.view(), src.view(), Sky::Curved).unwrap_err();
        assert!(matches!(err, ShearError::UnsupportedMode { .. }));
        assert_eq!("curved".parse::<Sky>().unwrap(), Sky::Curved);
        assert!(matches!(
            "round".parse::<Sky>(),
            Err(ShearError::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn source_on_lens() {
        let err = theta_phi(
            20.,
            -5.,
            array![20.1, 20.].view(),
            array![-5., -5.].view(),
            Sky::Flat,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ShearError::DegenerateSeparation { index: 1, .. }
        ));
    }

    #[test]
    fn wide_separation_is_not_fatal() {
        let ((theta, _), warnings) = crate::test_log::capture(log::Level::Warn, || {
            theta_phi(0., 0., array![3., 0.5].view(), array![0., 0.].view(), Sky::Flat).unwrap()
        });
        assert_abs_diff_eq!(theta[0], 3f64.to_radians(), epsilon = 1e-12);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("flat-sky"));
    }

    #[test]
    fn close_sources_are_quiet() {
        let (_, warnings) = crate::test_log::capture(log::Level::Warn, || {
            theta_phi(0., 0., array![0.9, 0.].view(), array![0., -0.9].view(), Sky::Flat).unwrap()
        });
        assert!(warnings.is_empty());
    }

    #[test]
    fn wrap_before_scaling_off_equator() {
        // 200 degrees east is 160 degrees west once wrapped
        let (theta, _) =
            theta_phi(0., 60., array![200.].view(), array![60.].view(), Sky::Flat).unwrap();
        assert_abs_diff_eq!(theta[0], 160f64.to_radians() * 0.5, epsilon = 1e-12);
    }
}
