//! The galaxy cluster record: center, redshift and a column-oriented source catalog.

use std::fmt;
use std::path::Path;

use log::info;
use ndarray::ArrayView1;
use rkyv::rancor;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::{Result, ShearError};
use crate::geometry::validate_radec;
use crate::ndarray_utils::min_max;
use crate::profile::ShearProfile;
use crate::units::RadiusUnit;

/// A named catalog column.
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
struct Column {
    name: String,
    data: Vec<f64>,
}

/// Ordered, named `f64` columns of equal length, one row per source.
#[derive(Clone, Debug, Default, PartialEq, Archive, Serialize, Deserialize)]
pub struct GalaxyCatalog {
    columns: Vec<Column>,
}

impl GalaxyCatalog {
    /// Right ascension of the sources in degrees.
    pub const RA: &'static str = "ra";
    /// Declination of the sources in degrees.
    pub const DEC: &'static str = "dec";
    /// First ellipticity component.
    pub const E1: &'static str = "e1";
    /// Second ellipticity component.
    pub const E2: &'static str = "e2";
    /// Angular separation from the cluster center in radians.
    pub const THETA: &'static str = "theta";
    /// Tangential shear.
    pub const GT: &'static str = "gt";
    /// Cross shear.
    pub const GX: &'static str = "gx";

    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, builder style. See [`insert_column`](Self::insert_column).
    pub fn with_column(mut self, name: impl Into<String>, data: impl Into<Vec<f64>>) -> Result<Self> {
        self.insert_column(name, data)?;
        Ok(self)
    }

    /// Add a column, or replace the column of the same name.
    ///
    /// # Errors
    /// [`ShearError::ShapeMismatch`] if the length differs from the existing rows.
    pub fn insert_column(&mut self, name: impl Into<String>, data: impl Into<Vec<f64>>) -> Result<()> {
        let name = name.into();
        let data = data.into();
        let replaces_only_column = self.columns.len() == 1 && self.columns[0].name == name;
        if !self.columns.is_empty() && !replaces_only_column && data.len() != self.len() {
            return Err(ShearError::shape_mismatch(format!(
                "column `{name}` has {} rows, catalog has {}",
                data.len(),
                self.len()
            )));
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.data = data,
            None => self.columns.push(Column { name, data }),
        }
        Ok(())
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    /// Whether there are no sources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a column of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// View of a column.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| ArrayView1::from(c.data.as_slice()))
    }

    /// View of a column that a step depends on.
    ///
    /// # Errors
    /// [`ShearError::MissingColumn`] carrying `hint` if it is absent.
    pub fn require(&self, name: &str, hint: &'static str) -> Result<ArrayView1<'_, f64>> {
        self.column(name).ok_or_else(|| ShearError::MissingColumn {
            column: name.to_owned(),
            hint,
        })
    }
}

/// A galaxy cluster with its background source catalog.
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct GalaxyCluster {
    unique_id: String,
    ra: f64,
    dec: f64,
    z: f64,
    /// Background galaxies, e.g. `ra`, `dec`, `e1`, `e2`.
    pub galcat: GalaxyCatalog,
    profile: Option<ShearProfile>,
}

impl GalaxyCluster {
    /// Create a cluster.
    ///
    /// # Arguments
    /// - `unique_id`: Identifier of the cluster.
    /// - `(ra, dec)`: Center in decimal degrees.
    /// - `z`: Redshift of the cluster.
    /// - `galcat`: Background galaxies.
    ///
    /// # Errors
    /// [`ShearError::InvalidCoordinate`] for a center outside `[-360, 360]`/`[-90, 90]`,
    /// [`ShearError::InvalidRedshift`] for `z < 0`.
    pub fn new(
        unique_id: impl Into<String>,
        ra: f64,
        dec: f64,
        z: f64,
        galcat: GalaxyCatalog,
    ) -> Result<Self> {
        validate_radec(ra, dec, "cluster center")?;
        if !(z >= 0.) {
            return Err(ShearError::InvalidRedshift { z });
        }
        Ok(Self {
            unique_id: unique_id.into(),
            ra,
            dec,
            z,
            galcat,
            profile: None,
        })
    }

    /// Identifier of the cluster.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Right ascension of the center in degrees.
    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Declination of the center in degrees.
    pub fn dec(&self) -> f64 {
        self.dec
    }

    /// Redshift.
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Attached shear profile, if any.
    pub fn profile(&self) -> Option<&ShearProfile> {
        self.profile.as_ref()
    }

    /// Radius unit of the attached profile.
    pub fn profile_radius_unit(&self) -> Option<RadiusUnit> {
        self.profile.as_ref().map(ShearProfile::radius_unit)
    }

    /// Attach a profile, replacing any previous one.
    pub fn set_profile(&mut self, profile: ShearProfile) {
        self.profile = Some(profile);
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|bytes| bytes.to_vec())
            .map_err(|e| ShearError::Serialization {
                message: e.to_string(),
            })
    }

    /// Deserialize from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(|e| ShearError::Serialization {
            message: e.to_string(),
        })
    }

    /// Save the cluster to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!(
            "Saved cluster {} to {} ({} bytes)",
            self.unique_id,
            path.as_ref().display(),
            bytes.len()
        );
        Ok(())
    }

    /// Load a cluster saved with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let cluster = Self::from_bytes(&bytes)?;
        info!(
            "Loaded cluster {}: {} galaxies",
            cluster.unique_id,
            cluster.galcat.len()
        );
        Ok(cluster)
    }
}

impl fmt::Display for GalaxyCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GalaxyCluster {}:", self.unique_id)?;
        writeln!(f, "    ra: {}", self.ra)?;
        writeln!(f, "    dec: {}", self.dec)?;
        writeln!(f, "    z: {}", self.z)?;
        writeln!(f, "    --------------------")?;
        if self.galcat.is_empty() {
            return writeln!(f, "    galcat: Empty table");
        }
        writeln!(f, "    galcat: {} galaxies", self.galcat.len())?;
        for column in &self.galcat.columns {
            if let Some((min, max)) = min_max(ArrayView1::from(column.data.as_slice())) {
                writeln!(f, "        {}:", column.name)?;
                writeln!(f, "            from {min} to {max}")?;
            }
        }
        Ok(())
    }
}
