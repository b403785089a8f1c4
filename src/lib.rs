#![warn(missing_docs)]

//! Weak-lensing shear profiles of galaxy clusters. \
//! Given a cluster center and a catalog of background sources with measured ellipticities,
//! this computes each source's angular separation and position angle relative to the cluster center,
//! decomposes the ellipticity into tangential and cross shear,
//! and averages both in radial bins to obtain a shear profile.
//!
//! ## Interface
//! The central struct of this library is [`ShearPipeline`]. It holds the options
//! (sky geometry, binning, cosmology) and runs the two stages on a [`GalaxyCluster`]:
//! - [`ShearPipeline::compute_shear`] appends `theta`, `gt` and `gx` columns to the galaxy catalog.
//! - [`ShearPipeline::make_profile`] converts `theta` to the requested radius unit and bins both shears.
//!
//! Additional parameters are set via `ShearPipeline::with_*()` functions.
//!
//! Example:
//! ```rust
//! use cluster_shear::{Bins, GalaxyCatalog, GalaxyCluster, RadiusUnit, ShearPipeline};
//! use ndarray::array;
//!
//! let galcat = GalaxyCatalog::new()
//!     .with_column("ra", vec![0.01, -0.02, 0.03])?
//!     .with_column("dec", vec![0.02, 0.01, -0.01])?
//!     .with_column("e1", vec![0.05, -0.01, 0.02])?
//!     .with_column("e2", vec![0.01, 0.03, -0.02])?;
//! let mut cluster = GalaxyCluster::new("demo", 0., 0., 0.3, galcat)?;
//!
//! let pipeline = ShearPipeline::new().with_bins(Bins::Edges(array![0., 1., 2.5]));
//! pipeline.compute_shear(&mut cluster)?;
//! let profile = pipeline.make_profile(&mut cluster, RadiusUnit::Arcminute)?;
//! assert_eq!(profile.len(), 2);
//! # Ok::<(), cluster_shear::ShearError>(())
//! ```
//!
//! The individual stages are also available as free functions working on `ndarray` views:
//! [`geometry::theta_phi`], [`shear::tangential`], [`shear::cross`],
//! [`units::convert_theta`] and [`binning::bin_and_average`].
//!
//! ## Physical units
//! Converting angles to kpc or Mpc needs the angular diameter distance of the cluster.
//! This crate does not implement a cosmology; provide one by implementing [`Cosmology`].
//!
//! ## Diagnostics
//! Conditions that degrade accuracy without invalidating the result
//! (flat-sky separations above one degree, radii outside the bin range) are reported through the
//! [`log`] facade at `warn` level.

pub mod binning;
pub mod cluster;
pub mod error;
pub mod geometry;
pub(crate) mod ndarray_utils;
pub mod pipeline;
pub mod profile;
pub mod shear;
#[cfg(test)]
mod test_log;
pub mod units;

pub use binning::{BinAssignment, Bins, RadialAverages, bin_and_average, make_bins};
pub use cluster::{GalaxyCatalog, GalaxyCluster};
pub use error::{Result, ShearError};
pub use geometry::Sky;
pub use pipeline::ShearPipeline;
pub use profile::{ProfileBin, ShearProfile};
pub use shear::Shear;
pub use units::{Cosmology, LengthUnit, RadiusUnit};

/// A generic float trait such that the shear computations are generic over `f32`/`f64`.
///
/// This trait is automatically implemented for all types implementing the supertraits.
/// Particularly, this includes `f32` and `f64`.
/// [`num_traits::Float`] is not a supertrait as the need to specify the provider of the redundant definitions of the basic math functions would clutter the code.
pub trait Float: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive {}

impl<F> Float for F where F: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive {}
