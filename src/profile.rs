//! Binned shear profile of a cluster.

use rkyv::{Archive, Deserialize, Serialize};

use crate::binning::RadialAverages;
use crate::error::{Result, ShearError};
use crate::units::RadiusUnit;

/// One radial bin of a [`ShearProfile`].
#[derive(Clone, Copy, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct ProfileBin {
    /// Mean radius of the sources in the bin.
    pub radius: f64,
    /// Mean tangential shear.
    pub gt: f64,
    /// Standard error of the mean tangential shear.
    pub gt_err: f64,
    /// Mean cross shear.
    pub gx: f64,
    /// Standard error of the mean cross shear.
    pub gx_err: f64,
    /// Number of sources in the bin.
    pub count: usize,
}

/// Tangential and cross shear averaged in radial bins.
///
/// Empty bins hold NaN values.
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct ShearProfile {
    bins: Vec<ProfileBin>,
    edges: Vec<f64>,
    radius_unit: RadiusUnit,
}

impl ShearProfile {
    /// Combine tangential and cross averages computed on the same bins.
    ///
    /// # Errors
    /// [`ShearError::ShapeMismatch`] unless both have one value per bin in every column
    /// and identical membership.
    pub fn new(
        tangential: RadialAverages<f64>,
        cross: RadialAverages<f64>,
        edges: Vec<f64>,
        radius_unit: RadiusUnit,
    ) -> Result<Self> {
        let n = tangential.len();
        let columns_fit = |avg: &RadialAverages<f64>| {
            avg.centers.len() == n && avg.means.len() == n && avg.stderrs.len() == n
        };
        if tangential.counts != cross.counts
            || edges.len() != n + 1
            || !columns_fit(&tangential)
            || !columns_fit(&cross)
        {
            return Err(ShearError::shape_mismatch(format!(
                "tangential ({} bins) and cross ({} bins) averages do not share the {} bins of the edges",
                tangential.len(),
                cross.len(),
                edges.len().saturating_sub(1)
            )));
        }
        let bins = (0..n)
            .map(|i| ProfileBin {
                radius: tangential.centers[i],
                gt: tangential.means[i],
                gt_err: tangential.stderrs[i],
                gx: cross.means[i],
                gx_err: cross.stderrs[i],
                count: tangential.counts[i],
            })
            .collect();
        Ok(Self {
            bins,
            edges,
            radius_unit,
        })
    }

    /// The bins, innermost first.
    pub fn bins(&self) -> &[ProfileBin] {
        &self.bins
    }

    /// Bin edges, one more than bins.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Unit of the radii and edges.
    pub fn radius_unit(&self) -> RadiusUnit {
        self.radius_unit
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether there are no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Mean radius of every bin.
    pub fn radius(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.radius).collect()
    }

    /// Tangential shear and its error for every bin.
    pub fn tangential(&self) -> (Vec<f64>, Vec<f64>) {
        self.bins.iter().map(|b| (b.gt, b.gt_err)).unzip()
    }

    /// Cross shear and its error for every bin.
    pub fn cross(&self) -> (Vec<f64>, Vec<f64>) {
        self.bins.iter().map(|b| (b.gx, b.gx_err)).unzip()
    }
}
