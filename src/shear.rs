//! Tangential and cross components of the shear.
//!
//! With `phi` the position angle from [`theta_phi`](crate::geometry::theta_phi),
//! \[ g_t = -(g_1 \cos 2\phi + g_2 \sin 2\phi), \quad g_\times = -g_1 \sin 2\phi + g_2 \cos 2\phi, \]
//! cf. eqs. 7-8 of Schrabback et al. 2018, arXiv:1611.03866.
//! Tangential shear is positive for sources aligned tangentially around the lens.

use nalgebra::{Rotation2, Vector2};
use ndarray::{Array1, ArrayView1, Zip};

use crate::Float;
use crate::error::{Result, ShearError};
use crate::geometry::{Sky, theta_phi};
use crate::ndarray_utils::{ensure_same_len, to_f64};

/// Per-source result of [`compute_shear`].
#[derive(Clone, Debug, PartialEq)]
pub struct Shear<F: Float> {
    /// Angular separation from the lens in radians.
    pub theta: Array1<F>,
    /// Tangential shear.
    pub gt: Array1<F>,
    /// Cross shear.
    pub gx: Array1<F>,
}

/// Rotate `(g1, g2)` by `-2 phi`, the spin-2 rotation into the lens frame.
///
/// The result is `(-g_t, g_x)`.
#[inline]
fn rotate_spin2<F: Float>(g1: F, g2: F, phi: F) -> Vector2<F> {
    let two: F = F::one() + F::one();
    Rotation2::new(-two * phi) * Vector2::new(g1, g2)
}

fn validate<F: Float>(g1: ArrayView1<F>, g2: ArrayView1<F>, phi: ArrayView1<F>) -> Result<()> {
    ensure_same_len(g1, "shear1", g2, "shear2")?;
    ensure_same_len(g1, "shear1", phi, "phi")?;
    let lower = -F::pi();
    let upper = F::two_pi();
    if let Some((index, p)) = phi
        .iter()
        .enumerate()
        .find(|(_, p)| !(**p >= lower && **p < upper))
    {
        return Err(ShearError::InvalidAngle {
            index,
            phi: to_f64(*p),
        });
    }
    Ok(())
}

fn rotated<F: Float, R>(
    g1: ArrayView1<F>,
    g2: ArrayView1<F>,
    phi: ArrayView1<F>,
    component: R,
) -> Result<Array1<F>>
where
    R: Fn(Vector2<F>) -> F + Sync + Send,
{
    validate(g1, g2, phi)?;
    let zip = Zip::from(g1).and(g2).and(phi);
    let kernel = |&g1: &F, &g2: &F, &phi: &F| component(rotate_spin2(g1, g2, phi));
    #[cfg(feature = "parallel")]
    let out = zip.par_map_collect(kernel);
    #[cfg(not(feature = "parallel"))]
    let out = zip.map_collect(kernel);
    Ok(out)
}

/// Tangential shear of every source.
///
/// # Arguments
/// - `(g1, g2)`: Ellipticity or shear components.
/// - `phi`: Position angle in radians, within `[-pi, 2pi)`.
///
/// # Errors
/// [`ShearError::ShapeMismatch`] if the lengths differ,
/// [`ShearError::InvalidAngle`] if a position angle is outside `[-pi, 2pi)`.
pub fn tangential<F: Float>(
    g1: ArrayView1<F>,
    g2: ArrayView1<F>,
    phi: ArrayView1<F>,
) -> Result<Array1<F>> {
    rotated(g1, g2, phi, |v| -v.x)
}

/// Cross shear of every source. Same arguments and errors as [`tangential`].
pub fn cross<F: Float>(
    g1: ArrayView1<F>,
    g2: ArrayView1<F>,
    phi: ArrayView1<F>,
) -> Result<Array1<F>> {
    rotated(g1, g2, phi, |v| v.y)
}

/// Tangential and cross shear in one pass.
pub fn decompose<F: Float>(
    g1: ArrayView1<F>,
    g2: ArrayView1<F>,
    phi: ArrayView1<F>,
) -> Result<(Array1<F>, Array1<F>)> {
    validate(g1, g2, phi)?;
    let mut gt = Array1::<F>::zeros(g1.len());
    let mut gx = Array1::<F>::zeros(g1.len());
    let zip = Zip::from(&mut gt).and(&mut gx).and(g1).and(g2).and(phi);
    let kernel = |gt: &mut F, gx: &mut F, &g1: &F, &g2: &F, &phi: &F| {
        let v = rotate_spin2(g1, g2, phi);
        *gt = -v.x;
        *gx = v.y;
    };
    #[cfg(feature = "parallel")]
    zip.par_for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    zip.for_each(kernel);
    Ok((gt, gx))
}

/// Angular separation, tangential shear and cross shear of sources around a lens.
///
/// # Arguments
/// - `(ra_l, dec_l)`: Lens position in decimal degrees.
/// - `(ra_s, dec_s)`: Source positions in decimal degrees.
/// - `(g1, g2)`: Ellipticity or shear components of the sources.
/// - `sky`: Geometry used for the angles.
///
/// Fails like [`theta_phi`] and [`tangential`].
pub fn compute_shear<F: Float>(
    ra_l: F,
    dec_l: F,
    ra_s: ArrayView1<F>,
    dec_s: ArrayView1<F>,
    g1: ArrayView1<F>,
    g2: ArrayView1<F>,
    sky: Sky,
) -> Result<Shear<F>> {
    ensure_same_len(ra_s, "source ra", g1, "shear1")?;
    let (theta, phi) = theta_phi(ra_l, dec_l, ra_s, dec_s, sky)?;
    let (gt, gx) = decompose(g1, g2, phi.view())?;
    Ok(Shear { theta, gt, gx })
}
