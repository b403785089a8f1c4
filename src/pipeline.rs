//! Main interface: shear computation and profiles for a [`GalaxyCluster`].

use std::fmt;

use log::{debug, info};

use crate::binning::{BinAssignment, Bins};
use crate::cluster::{GalaxyCatalog, GalaxyCluster};
use crate::error::Result;
use crate::geometry::Sky;
use crate::profile::ShearProfile;
use crate::shear::{Shear, compute_shear};
use crate::units::{Cosmology, RadiusUnit, convert_theta};

const SHEAR_HINT: &str =
    "Shear information is missing, the galaxy catalog must have (e1, e2) columns.";
const PROFILE_HINT: &str =
    "Tangential and cross shears (theta, gt, gx) are missing. Run compute_shear first!";

/// The central struct of this library.
///
/// Use this in order to build options for the shear computation and profiles.
/// For more details, check the module-level documentation.
#[derive(Clone)]
pub struct ShearPipeline<'a> {
    /// Sky geometry of the angle computation.
    sky: Sky,
    /// Binning of the profile.
    bins: Bins<f64>,
    /// Distance source for physical radius units.
    cosmology: Option<&'a dyn Cosmology>,
    /// Whether to write results back to the cluster.
    add_to_cluster: bool,
}

impl fmt::Debug for ShearPipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShearPipeline")
            .field("sky", &self.sky)
            .field("bins", &self.bins)
            .field("cosmology", &self.cosmology.is_some())
            .field("add_to_cluster", &self.add_to_cluster)
            .finish()
    }
}

impl Default for ShearPipeline<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ShearPipeline<'a> {
    /// Create a new instance using default options:
    /// flat sky, [`Bins::default()`], no cosmology, results written back to the cluster.
    pub fn new() -> Self {
        Self {
            sky: Sky::Flat,
            bins: Bins::default(),
            cosmology: None,
            add_to_cluster: true,
        }
    }

    /// Set the sky geometry.
    pub fn with_sky(mut self, sky: Sky) -> Self {
        self.sky = sky;
        self
    }

    /// Set the profile binning.
    pub fn with_bins(mut self, bins: Bins<f64>) -> Self {
        self.bins = bins;
        self
    }

    /// Set the cosmology used for physical radius units.
    pub fn with_cosmology(mut self, cosmology: &'a dyn Cosmology) -> Self {
        self.cosmology = Some(cosmology);
        self
    }

    /// Set whether [`compute_shear`](Self::compute_shear) and [`make_profile`](Self::make_profile)
    /// write their results back to the cluster.
    pub fn with_add_to_cluster(mut self, add_to_cluster: bool) -> Self {
        self.add_to_cluster = add_to_cluster;
        self
    }

    /// Angular separation, tangential and cross shear of every source, without touching the cluster.
    ///
    /// # Errors
    /// [`ShearError::MissingColumn`](crate::ShearError::MissingColumn) if `ra`, `dec`, `e1` or `e2` is missing,
    /// otherwise as [`compute_shear`](crate::shear::compute_shear).
    pub fn shear(&self, cluster: &GalaxyCluster) -> Result<Shear<f64>> {
        let galcat = &cluster.galcat;
        let e1 = galcat.require(GalaxyCatalog::E1, SHEAR_HINT)?;
        let e2 = galcat.require(GalaxyCatalog::E2, SHEAR_HINT)?;
        let ra = galcat.require(GalaxyCatalog::RA, SHEAR_HINT)?;
        let dec = galcat.require(GalaxyCatalog::DEC, SHEAR_HINT)?;

        info!(
            "Computing shear of {} sources around cluster {}.",
            galcat.len(),
            cluster.unique_id()
        );
        compute_shear(cluster.ra(), cluster.dec(), ra, dec, e1, e2, self.sky)
    }

    /// Compute the angular separation, tangential and cross shear of every source.
    ///
    /// Unless disabled via [`with_add_to_cluster`](Self::with_add_to_cluster),
    /// the results are added to the galaxy catalog as `theta`, `gt` and `gx`.
    /// The catalog is only modified once everything succeeded.
    pub fn compute_shear(&self, cluster: &mut GalaxyCluster) -> Result<Shear<f64>> {
        let shear = self.shear(cluster)?;
        if self.add_to_cluster {
            let galcat = &mut cluster.galcat;
            galcat.insert_column(GalaxyCatalog::THETA, shear.theta.to_vec())?;
            galcat.insert_column(GalaxyCatalog::GT, shear.gt.to_vec())?;
            galcat.insert_column(GalaxyCatalog::GX, shear.gx.to_vec())?;
            debug!("Added theta, gt and gx to the galaxy catalog.");
        }
        Ok(shear)
    }

    /// Shear profile of the cluster, without touching the cluster.
    ///
    /// `theta` is converted to `radius_unit` once, then tangential and cross shear
    /// are averaged on the same bins.
    ///
    /// # Errors
    /// - [`ShearError::MissingColumn`](crate::ShearError::MissingColumn) if `theta`, `gt` or `gx` is missing.
    /// - [`ShearError::MissingCosmology`](crate::ShearError::MissingCosmology) for physical units without a cosmology.
    /// - [`ShearError::InvalidBins`](crate::ShearError::InvalidBins) if the bins cannot be built.
    pub fn profile(&self, cluster: &GalaxyCluster, radius_unit: RadiusUnit) -> Result<ShearProfile> {
        let galcat = &cluster.galcat;
        let theta = galcat.require(GalaxyCatalog::THETA, PROFILE_HINT)?;
        let gt = galcat.require(GalaxyCatalog::GT, PROFILE_HINT)?;
        let gx = galcat.require(GalaxyCatalog::GX, PROFILE_HINT)?;

        let radius = convert_theta(theta, radius_unit, Some(cluster.z()), self.cosmology)?;
        let edges = self.bins.edges(radius.view())?;
        info!(
            "Averaging {} sources in {} bins of {radius_unit}.",
            radius.len(),
            edges.len() - 1
        );

        let assignment = BinAssignment::new(radius.view(), edges)?;
        let tangential = assignment.average(radius.view(), gt)?;
        let cross = assignment.average(radius.view(), gx)?;
        ShearProfile::new(
            tangential,
            cross,
            assignment.edges().to_vec(),
            radius_unit,
        )
    }

    /// Compute the shear profile of the cluster.
    ///
    /// Unless disabled via [`with_add_to_cluster`](Self::with_add_to_cluster),
    /// the profile (including its radius unit) is attached to the cluster.
    /// Also see [`profile`](Self::profile).
    pub fn make_profile(
        &self,
        cluster: &mut GalaxyCluster,
        radius_unit: RadiusUnit,
    ) -> Result<ShearProfile> {
        let profile = self.profile(cluster, radius_unit)?;
        if self.add_to_cluster {
            cluster.set_profile(profile.clone());
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array};
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Uniform;

    use super::*;
    use crate::ShearError;
    use crate::units::LengthUnit;

    /// Distance growing linearly with redshift, 4000 Mpc per unit z.
    struct Linear;

    impl Cosmology for Linear {
        fn angular_diameter_distance(&self, redshift: f64, unit: LengthUnit) -> f64 {
            4000. * redshift * unit.per_megaparsec()
        }
    }

    fn two_source_cluster() -> GalaxyCluster {
        let galcat = GalaxyCatalog::new()
            .with_column("ra", vec![0.001, 0.])
            .unwrap()
            .with_column("dec", vec![0., 0.001])
            .unwrap()
            .with_column("e1", vec![0.1, 0.1])
            .unwrap()
            .with_column("e2", vec![0., 0.])
            .unwrap();
        GalaxyCluster::new("two", 0., 0., 0.25, galcat).unwrap()
    }

    /// Sources on a ring around the cluster, sheared tangentially by `g`.
    fn tangential_ring(n: usize, g: f64) -> GalaxyCluster {
        let radius_deg = Array1::random(n, Uniform::new(0.01, 0.2));
        let angle = Array1::random(n, Uniform::new(0., 2. * std::f64::consts::PI));
        let ra = (&radius_deg * &angle.mapv(f64::cos)).mapv(|x| 30. + x);
        let dec = &radius_deg * &angle.mapv(f64::sin);
        // with phi = atan2(dy, -dx), phi = pi - angle
        let e1 = angle.mapv(|a| -g * (2. * a).cos());
        let e2 = angle.mapv(|a| g * (2. * a).sin());
        let galcat = GalaxyCatalog::new()
            .with_column("ra", ra.to_vec())
            .unwrap()
            .with_column("dec", dec.to_vec())
            .unwrap()
            .with_column("e1", e1.to_vec())
            .unwrap()
            .with_column("e2", e2.to_vec())
            .unwrap();
        GalaxyCluster::new("ring", 30., 0., 0.3, galcat).unwrap()
    }

    #[test]
    fn compute_shear_adds_columns() {
        let mut cluster = two_source_cluster();
        let shear = ShearPipeline::new().compute_shear(&mut cluster).unwrap();

        assert_abs_diff_eq!(shear.gt, array![-0.1, 0.1], epsilon = 1e-9);
        assert_abs_diff_eq!(shear.gx, array![0., 0.], epsilon = 1e-9);
        assert_eq!(cluster.galcat.column("theta").unwrap(), shear.theta);
        assert_eq!(cluster.galcat.column("gt").unwrap(), shear.gt);
        assert_eq!(cluster.galcat.column("gx").unwrap(), shear.gx);
    }

    #[test]
    fn compute_shear_without_mutation() {
        let mut cluster = two_source_cluster();
        let before = cluster.clone();
        ShearPipeline::new()
            .with_add_to_cluster(false)
            .compute_shear(&mut cluster)
            .unwrap();
        assert_eq!(cluster, before);
    }

    #[test]
    fn missing_ellipticities() {
        let galcat = GalaxyCatalog::new()
            .with_column("ra", vec![0.1])
            .unwrap()
            .with_column("dec", vec![0.1])
            .unwrap();
        let mut cluster = GalaxyCluster::new("no-shapes", 0., 0., 0.1, galcat).unwrap();
        let err = ShearPipeline::new().compute_shear(&mut cluster).unwrap_err();
        assert!(matches!(err, ShearError::MissingColumn { ref column, .. } if column == "e1"));
    }

    #[test]
    fn failed_validation_leaves_catalog_untouched() {
        let mut cluster = two_source_cluster();
        cluster.galcat.insert_column("dec", vec![0., 95.]).unwrap();
        let before = cluster.clone();
        let err = ShearPipeline::new().compute_shear(&mut cluster).unwrap_err();
        assert!(matches!(err, ShearError::InvalidCoordinate { .. }));
        assert_eq!(cluster, before);

        let err = ShearPipeline::new()
            .with_sky(Sky::Curved)
            .compute_shear(&mut two_source_cluster())
            .unwrap_err();
        assert!(matches!(err, ShearError::UnsupportedMode { .. }));
    }

    #[test]
    fn profile_needs_shear_first() {
        let mut cluster = two_source_cluster();
        let err = ShearPipeline::new()
            .make_profile(&mut cluster, RadiusUnit::Arcminute)
            .unwrap_err();
        assert!(matches!(err, ShearError::MissingColumn { ref column, .. } if column == "theta"));
        assert!(err.to_string().contains("Run compute_shear first!"));
    }

    #[test]
    fn physical_profile_needs_cosmology() {
        let mut cluster = two_source_cluster();
        let pipeline = ShearPipeline::new();
        pipeline.compute_shear(&mut cluster).unwrap();
        let err = pipeline
            .make_profile(&mut cluster, RadiusUnit::Megaparsec)
            .unwrap_err();
        assert!(matches!(err, ShearError::MissingCosmology { .. }));
        assert!(cluster.profile().is_none());
    }

    #[test]
    fn physical_profile() {
        let mut cluster = two_source_cluster();
        let cosmology = Linear;
        let pipeline = ShearPipeline::new()
            .with_cosmology(&cosmology)
            .with_bins(Bins::Edges(array![0., 20., 40.]));
        pipeline.compute_shear(&mut cluster).unwrap();
        let profile = pipeline
            .make_profile(&mut cluster, RadiusUnit::Kiloparsec)
            .unwrap();

        // 1.745e-5 rad at 1000 Mpc is about 17.45 kpc
        let expected_kpc = 0.001f64.to_radians() * 1e6;
        assert_eq!(profile.bins()[0].count, 2);
        assert_abs_diff_eq!(profile.bins()[0].radius, expected_kpc, epsilon = 1e-9);
        assert_abs_diff_eq!(profile.bins()[0].gt, 0., epsilon = 1e-9);
        assert_eq!(profile.bins()[1].count, 0);
        assert!(profile.bins()[1].gt.is_nan());
        assert_eq!(cluster.profile_radius_unit(), Some(RadiusUnit::Kiloparsec));
        // NaN in the empty bin rules out comparing whole profiles
        let stored = cluster.profile().unwrap();
        assert_eq!(stored.edges(), profile.edges());
        assert_eq!(stored.bins()[0], profile.bins()[0]);
        assert_eq!(stored.bins()[1].count, 0);
        assert!(stored.bins()[1].gx.is_nan());
    }

    #[test]
    fn tangential_signal_recovered() {
        crate::test_log::init();
        let g = 0.05;
        let mut cluster = tangential_ring(2000, g);
        let pipeline = ShearPipeline::new().with_bins(Bins::Log(5));
        pipeline.compute_shear(&mut cluster).unwrap();
        let profile = pipeline
            .make_profile(&mut cluster, RadiusUnit::Arcminute)
            .unwrap();

        assert_eq!(profile.len(), 5);
        assert_eq!(profile.edges().len(), 6);
        let total: usize = profile.bins().iter().map(|b| b.count).sum();
        // the outermost source sits on the last edge
        assert_eq!(total, 1999);
        for bin in profile.bins() {
            assert_abs_diff_eq!(bin.gt, g, epsilon = 1e-9);
            assert_abs_diff_eq!(bin.gx, 0., epsilon = 1e-9);
            assert!(bin.radius >= 0.6 && bin.radius < 12.);
        }
    }

    #[test]
    fn pure_profile_and_shared_bins() {
        let mut cluster = tangential_ring(500, 0.02);
        let pipeline = ShearPipeline::new().with_add_to_cluster(false);
        let shear = pipeline.shear(&cluster).unwrap();
        cluster.galcat.insert_column("theta", shear.theta.to_vec()).unwrap();
        cluster.galcat.insert_column("gt", shear.gt.to_vec()).unwrap();
        cluster.galcat.insert_column("gx", shear.gx.to_vec()).unwrap();

        let profile = pipeline.profile(&cluster, RadiusUnit::Degree).unwrap();
        assert!(cluster.profile().is_none());
        assert_eq!(profile.len(), 9);

        let tangential = crate::bin_and_average(
            cluster.galcat.column("theta").unwrap().mapv(f64::to_degrees).view(),
            shear.gt.view(),
            &Bins::default(),
        )
        .unwrap();
        for (bin, expected) in profile.bins().iter().zip(tangential.counts) {
            assert_eq!(bin.count, expected);
        }
    }
}
