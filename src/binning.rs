//! Radial binning and per-bin averages.
//!
//! A source with radius `r` belongs to bin `i` iff `edges[i] <= r < edges[i + 1]`.
//! The last bin excludes its right edge as well, so a source exactly at the final edge
//! belongs to no bin.

use std::cmp::Ordering;

use log::{debug, warn};
use ndarray::{Array1, ArrayView1};

use crate::Float;
use crate::error::{Result, ShearError};
use crate::ndarray_utils::{ensure_same_len, lit, mean, min_max, standard_error, to_f64};

/// Number of edges generated when no bins are given.
pub const DEFAULT_EDGE_COUNT: usize = 10;

/// How to bin radii.
#[derive(Clone, Debug, PartialEq)]
pub enum Bins<F: Float> {
    /// Explicit, strictly increasing bin edges (`n_bins + 1` values).
    Edges(Array1<F>),
    /// `n_bins` bins equally spaced between the smallest and largest radius.
    Linear(usize),
    /// `n_bins` bins equally spaced in log space between the smallest and largest radius.
    Log(usize),
}

impl<F: Float> Default for Bins<F> {
    /// [`DEFAULT_EDGE_COUNT`] linearly spaced edges, i.e. one bin fewer.
    fn default() -> Self {
        Bins::Linear(DEFAULT_EDGE_COUNT - 1)
    }
}

impl<F: Float> Bins<F> {
    /// Resolve into concrete edges for the given radii.
    ///
    /// # Errors
    /// [`ShearError::InvalidBins`] if explicit edges are fewer than two,
    /// or if generated edges cannot be built (see [`make_bins`]; an empty `radius` has no range).
    pub fn edges(&self, radius: ArrayView1<F>) -> Result<Array1<F>> {
        let (n_bins, log_bins) = match self {
            Bins::Edges(edges) => {
                if edges.len() < 2 {
                    return Err(ShearError::invalid_bins(format!(
                        "need at least two bin edges, got {}",
                        edges.len()
                    )));
                }
                return Ok(edges.clone());
            }
            Bins::Linear(n_bins) => (*n_bins, false),
            Bins::Log(n_bins) => (*n_bins, true),
        };
        let (rmin, rmax) = min_max(radius)
            .ok_or_else(|| ShearError::invalid_bins("cannot derive bin range from no radii"))?;
        make_bins(rmin, rmax, n_bins, log_bins)
    }
}

/// Define equal sized bins with an array of `n_bins + 1` bin edges.
///
/// # Arguments
/// - `(rmin, rmax)`: Range of the data, in any unit.
/// - `n_bins`: Number of bins.
/// - `log_bins`: Space the edges equally in log space instead.
///
/// The first and last edge are exactly `rmin` and `rmax`.
///
/// # Errors
/// [`ShearError::InvalidBins`] if `n_bins` is zero, `rmax <= rmin`, or `rmin <= 0` with `log_bins`.
///
/// # Example:
/// ```
/// # use cluster_shear::make_bins;
/// let edges = make_bins(1., 100., 2, true)?;
/// assert!((edges[1] - 10f64).abs() < 1e-12);
/// # Ok::<(), cluster_shear::ShearError>(())
/// ```
pub fn make_bins<F: Float>(rmin: F, rmax: F, n_bins: usize, log_bins: bool) -> Result<Array1<F>> {
    if n_bins == 0 {
        return Err(ShearError::invalid_bins("n_bins must be > 0"));
    }
    if !(rmax > rmin) {
        return Err(ShearError::invalid_bins(format!(
            "rmax ({}) should be larger than rmin ({})",
            to_f64(rmax),
            to_f64(rmin)
        )));
    }
    if log_bins && rmin <= F::zero() {
        return Err(ShearError::invalid_bins(format!(
            "log bins need a positive rmin, got {}",
            to_f64(rmin)
        )));
    }

    let (lo, hi) = if log_bins {
        (rmin.ln(), rmax.ln())
    } else {
        (rmin, rmax)
    };
    let step = (hi - lo) / lit(n_bins as f64);
    let mut edges = Array1::from_shape_fn(n_bins + 1, |i| {
        let x = lo + step * lit(i as f64);
        if log_bins { x.exp() } else { x }
    });
    edges[0] = rmin;
    edges[n_bins] = rmax;
    debug!(
        "Generated {} {} bin edges from {} to {}.",
        n_bins + 1,
        if log_bins { "log" } else { "linear" },
        to_f64(rmin),
        to_f64(rmax)
    );
    Ok(edges)
}

/// Membership of sources in radial bins.
///
/// Computed once per radius array and edges, then reused for every signal so that
/// all of them share the same bins.
#[derive(Clone, Debug, PartialEq)]
pub struct BinAssignment<F: Float> {
    edges: Array1<F>,
    members: Vec<Vec<usize>>,
}

impl<F: Float> BinAssignment<F> {
    /// Assign every radius to its bin. Sources outside `[edges[0], edges[n])` are left out.
    ///
    /// `edges` must be strictly increasing; this is not checked.
    pub fn new(radius: ArrayView1<F>, edges: Array1<F>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(ShearError::invalid_bins(format!(
                "need at least two bin edges, got {}",
                edges.len()
            )));
        }
        let n_bins = edges.len() - 1;
        let first = edges[0];
        let last = edges[n_bins];
        let edge_vec = edges.to_vec();

        let mut members = vec![Vec::new(); n_bins];
        let (mut below, mut above, mut on_last, mut nan) = (0usize, 0usize, 0usize, 0usize);
        for (index, r) in radius.iter().enumerate() {
            match r.partial_cmp(&first) {
                None => {
                    nan += 1;
                    continue;
                }
                Some(Ordering::Less) => {
                    below += 1;
                    continue;
                }
                _ => {}
            }
            if *r > last {
                above += 1;
                continue;
            }
            // number of edges <= r; bin i has edges[i] <= r < edges[i + 1]
            let upper = edge_vec.partition_point(|e| *e <= *r);
            match upper.checked_sub(1) {
                Some(bin) if bin < n_bins => members[bin].push(index),
                Some(_) => on_last += 1,
                None => {}
            }
        }

        if nan > 0 {
            warn!("{nan} radii are NaN and are excluded from the profile.");
        }
        if below > 0 {
            warn!("{below} radii lie below the first bin edge and are excluded from the profile.");
        }
        if above > 0 {
            warn!("{above} radii lie above the last bin edge and are excluded from the profile.");
        }
        if on_last > 0 {
            debug!("{on_last} radii lie exactly on the last bin edge and are excluded from the profile.");
        }

        Ok(Self { edges, members })
    }

    /// Bin edges.
    pub fn edges(&self) -> ArrayView1<F> {
        self.edges.view()
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.members.len()
    }

    /// Indices of the sources in bin `bin`, in catalog order. `None` past the last bin.
    pub fn members(&self, bin: usize) -> Option<&[usize]> {
        self.members.get(bin).map(Vec::as_slice)
    }

    /// Number of sources per bin.
    pub fn counts(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }

    /// Average `signal` over the bins.
    ///
    /// `radius` must be the array this assignment was built from.
    ///
    /// # Errors
    /// [`ShearError::ShapeMismatch`] if `radius` and `signal` differ in length.
    pub fn average(&self, radius: ArrayView1<F>, signal: ArrayView1<F>) -> Result<RadialAverages<F>> {
        ensure_same_len(radius, "radius", signal, "signal")?;

        let aggregate = |members: &Vec<usize>| {
            let r = mean(members.iter().map(|&i| radius[i]));
            let values: Vec<F> = members.iter().map(|&i| signal[i]).collect();
            let m = mean(values.iter().copied());
            (r, m, standard_error(&values))
        };

        #[cfg(feature = "parallel")]
        let per_bin: Vec<(F, F, F)> = {
            use rayon::prelude::*;
            self.members.par_iter().map(aggregate).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let per_bin: Vec<(F, F, F)> = self.members.iter().map(aggregate).collect();

        let centers = per_bin.iter().map(|b| b.0).collect();
        let means = per_bin.iter().map(|b| b.1).collect();
        let stderrs = per_bin.iter().map(|b| b.2).collect();

        Ok(RadialAverages {
            centers,
            means,
            stderrs,
            counts: self.counts(),
        })
    }
}

/// Per-bin averages of one signal.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialAverages<F: Float> {
    /// Mean radius of the sources in each bin, NaN for empty bins.
    pub centers: Array1<F>,
    /// Mean signal in each bin, NaN for empty bins.
    pub means: Array1<F>,
    /// Standard error of the mean signal (`std / sqrt(n)` with `ddof = 0`), NaN for empty bins.
    pub stderrs: Array1<F>,
    /// Number of sources in each bin.
    pub counts: Vec<usize>,
}

impl<F: Float> RadialAverages<F> {
    /// Number of bins.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether there are no bins.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Average `signal` in radial bins of `radius`.
///
/// # Arguments
/// - `radius`: Distance (physical or angular) of each source to the cluster center.
/// - `signal`: Per-source signal, e.g. tangential or cross shear.
/// - `bins`: Explicit edges or a number of generated bins.
///
/// Bin centers are the mean radius of the member sources, not the edge midpoints.
/// Empty bins yield NaN instead of an error.
///
/// # Example:
/// ```
/// # use ndarray::array;
/// # use cluster_shear::{Bins, bin_and_average};
/// let radius = array![1., 2., 3., 4., 5.];
/// let signal = array![10., 10., 10., 10., 10.];
/// let avg = bin_and_average(radius.view(), signal.view(), &Bins::Edges(array![0., 3., 6.]))?;
/// assert_eq!(avg.centers, array![1.5, 4.]);
/// assert_eq!(avg.counts, vec![2, 3]);
/// # Ok::<(), cluster_shear::ShearError>(())
/// ```
pub fn bin_and_average<F: Float>(
    radius: ArrayView1<F>,
    signal: ArrayView1<F>,
    bins: &Bins<F>,
) -> Result<RadialAverages<F>> {
    ensure_same_len(radius, "radius", signal, "signal")?;
    let edges = bins.edges(radius)?;
    BinAssignment::new(radius, edges)?.average(radius, signal)
}
