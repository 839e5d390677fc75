//! TOML run file of the batch runner

use std::fs;
use std::path::{Path, PathBuf};

use roadfit_core::fit::FitConfig;
use roadfit_core::loading::NetworkConfig;
use roadfit_core::model::TimeSlice;
use roadfit_core::routing::RoutingConfig;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Inputs {
    /// Segments CSV: `id,from,to,street_type,length,oneway,geometry`
    pub segments: PathBuf,
    /// Node to area CSV: `node,area`
    pub node_areas: PathBuf,
    /// Observed trips CSV: `origin,destination,duration[,weekday,hour]`
    pub trips: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Outputs {
    /// Pair summary JSON written by `paths` and read by `fit`
    pub pairs: PathBuf,
    /// Directory receiving one coefficient CSV and report per slice
    pub coefficients: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    pub inputs: Inputs,
    pub outputs: Outputs,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub fit: FitConfig,
    #[serde(default)]
    pub slices: Vec<TimeSlice>,
}

impl RunConfig {
    /// Reads the run file; relative paths are resolved against its directory.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(AppError::io(path))?;
        let mut config = Self::parse(&text).map_err(|source| AppError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Configured slices, or the single unfiltered `all` slice
    pub fn slices(&self) -> Vec<TimeSlice> {
        if self.slices.is_empty() {
            vec![TimeSlice::all()]
        } else {
            self.slices.clone()
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.inputs.segments,
            &mut self.inputs.node_areas,
            &mut self.inputs.trips,
            &mut self.outputs.pairs,
            &mut self.outputs.coefficients,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        self.fit.bounds()?;
        if self.routing.samples_per_area == 0 {
            return Err(AppError::Config(
                "routing.samples_per_area must be at least 1".into(),
            ));
        }
        let mut names: Vec<&str> = self.slices.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(AppError::Config(format!(
                "slice name '{}' is used twice",
                pair[0]
            )));
        }
        if let Some(slice) = self
            .slices
            .iter()
            .find(|s| s.hours.is_some_and(|[start, end]| start > 23 || end > 24))
        {
            return Err(AppError::Config(format!(
                "slice '{}' has hours outside 0..24",
                slice.name
            )));
        }
        if let Some(slice) = self
            .slices
            .iter()
            .find(|s| s.hours.is_some_and(|[start, end]| start == end))
        {
            return Err(AppError::Config(format!(
                "slice '{}' has an empty hour window",
                slice.name
            )));
        }
        Ok(())
    }
}
