//! Conversion of angular separations to angular or physical radius units.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use log::debug;
use ndarray::{Array1, ArrayView1};
use rkyv::{Archive, Deserialize, Serialize};

use crate::Float;
use crate::error::{Result, ShearError};
use crate::ndarray_utils::lit;

/// Physical length units a [`Cosmology`] can report distances in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LengthUnit {
    /// Kiloparsec.
    Kiloparsec,
    /// Megaparsec.
    Megaparsec,
}

impl LengthUnit {
    /// Number of this unit in one megaparsec.
    pub const fn per_megaparsec(self) -> f64 {
        match self {
            LengthUnit::Kiloparsec => 1e3,
            LengthUnit::Megaparsec => 1.,
        }
    }
}

/// Source of the angular diameter distance to the cluster.
///
/// Implement this for whatever cosmology backend is at hand.
/// Backends that work with comoving angular distances can return
/// `D_M(z) / (1 + z)`, which is the same quantity for a flat universe.
pub trait Cosmology {
    /// Angular diameter distance at `redshift`, expressed in `unit`.
    fn angular_diameter_distance(&self, redshift: f64, unit: LengthUnit) -> f64;
}

impl<C: Cosmology + ?Sized> Cosmology for &C {
    fn angular_diameter_distance(&self, redshift: f64, unit: LengthUnit) -> f64 {
        (**self).angular_diameter_distance(redshift, unit)
    }
}

#[derive(Clone, Copy, Debug)]
enum Scale {
    PerRadian(f64),
    Distance(LengthUnit),
}

/// Unit of the profile radius.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub enum RadiusUnit {
    /// `rad`
    Radian,
    /// `deg`
    Degree,
    /// `arcmin`
    Arcminute,
    /// `arcsec`
    Arcsecond,
    /// `kpc`, needs a cosmology.
    Kiloparsec,
    /// `Mpc`, needs a cosmology.
    Megaparsec,
}

impl RadiusUnit {
    /// All units, in the order they are listed in error messages.
    pub const ALL: [RadiusUnit; 6] = [
        RadiusUnit::Radian,
        RadiusUnit::Degree,
        RadiusUnit::Arcminute,
        RadiusUnit::Arcsecond,
        RadiusUnit::Kiloparsec,
        RadiusUnit::Megaparsec,
    ];

    /// Short name, as accepted by [`FromStr`].
    pub const fn symbol(self) -> &'static str {
        match self {
            RadiusUnit::Radian => "rad",
            RadiusUnit::Degree => "deg",
            RadiusUnit::Arcminute => "arcmin",
            RadiusUnit::Arcsecond => "arcsec",
            RadiusUnit::Kiloparsec => "kpc",
            RadiusUnit::Megaparsec => "Mpc",
        }
    }

    /// Conversion from radians: a plain factor for angular units,
    /// the angular diameter distance for physical ones.
    const fn scale(self) -> Scale {
        const DEG: f64 = 180. / std::f64::consts::PI;
        match self {
            RadiusUnit::Radian => Scale::PerRadian(1.),
            RadiusUnit::Degree => Scale::PerRadian(DEG),
            RadiusUnit::Arcminute => Scale::PerRadian(DEG * 60.),
            RadiusUnit::Arcsecond => Scale::PerRadian(DEG * 3600.),
            RadiusUnit::Kiloparsec => Scale::Distance(LengthUnit::Kiloparsec),
            RadiusUnit::Megaparsec => Scale::Distance(LengthUnit::Megaparsec),
        }
    }

    /// Number of this unit in one radian, `None` for physical units.
    pub const fn per_radian(self) -> Option<f64> {
        match self.scale() {
            Scale::PerRadian(factor) => Some(factor),
            Scale::Distance(_) => None,
        }
    }

    /// The length unit of a physical radius unit, `None` for angular units.
    pub const fn length_unit(self) -> Option<LengthUnit> {
        match self.scale() {
            Scale::PerRadian(_) => None,
            Scale::Distance(unit) => Some(unit),
        }
    }

    /// Whether converting to this unit needs a cosmology.
    pub const fn is_physical(self) -> bool {
        self.length_unit().is_some()
    }

    fn valid_symbols() -> String {
        Self::ALL.iter().map(|u| u.symbol()).join(", ")
    }
}

impl fmt::Display for RadiusUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for RadiusUnit {
    type Err = ShearError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|u| u.symbol() == s)
            .ok_or_else(|| ShearError::UnsupportedUnit {
                unit: s.to_owned(),
                valid: Self::valid_symbols(),
            })
    }
}

/// Convert angular separations `theta` in radians to `unit`.
///
/// Angular units are a plain rescaling. Physical units multiply `theta` by the angular diameter
/// distance of the cluster at `redshift`, as given by `cosmology`.
///
/// # Errors
/// [`ShearError::MissingCosmology`] if a physical unit is requested without both `redshift` and `cosmology`.
///
/// # Example:
/// ```
/// # use ndarray::array;
/// # use cluster_shear::{RadiusUnit, units::convert_theta};
/// let arcmin = convert_theta(array![std::f64::consts::PI / 10800.].view(), RadiusUnit::Arcminute, None, None)?;
/// assert!((arcmin[0] - 1.).abs() < 1e-12);
/// # Ok::<(), cluster_shear::ShearError>(())
/// ```
pub fn convert_theta<F: Float>(
    theta: ArrayView1<F>,
    unit: RadiusUnit,
    redshift: Option<f64>,
    cosmology: Option<&dyn Cosmology>,
) -> Result<Array1<F>> {
    let factor = match unit.scale() {
        Scale::PerRadian(factor) => factor,
        Scale::Distance(length_unit) => {
            let (Some(z), Some(cosmology)) = (redshift, cosmology) else {
                return Err(ShearError::MissingCosmology {
                    unit: unit.to_string(),
                });
            };
            let da = cosmology.angular_diameter_distance(z, length_unit);
            debug!("Angular diameter distance at z = {z}: {da} {unit}.");
            da
        }
    };
    let factor: F = lit(factor);
    Ok(theta.mapv(|t| t * factor))
}

/// Convert values in an angular `unit` back to radians.
///
/// # Errors
/// [`ShearError::MissingCosmology`] for physical units, which cannot be inverted without a distance.
pub fn to_radians<F: Float>(values: ArrayView1<F>, unit: RadiusUnit) -> Result<Array1<F>> {
    let per_radian = unit.per_radian().ok_or_else(|| ShearError::MissingCosmology {
        unit: unit.to_string(),
    })?;
    let factor: F = lit(per_radian);
    Ok(values.mapv(|v| v / factor))
}
