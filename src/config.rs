//! Type-safe builder for [`ScanConfig`], mirroring the crawler config's
//! typestate builder: the two fields a scan cannot run without —
//! `data_dir` and at least one target — are only reachable once supplied,
//! and `build()` only exists once both states are satisfied.

use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::context::StageOptions;
use crate::request::RequesterConfig;

pub struct WithDataDir;
pub struct WithTarget;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub data_dir: PathBuf,
    pub targets: Vec<String>,
    pub cache_dir: PathBuf,
    pub requester: RequesterConfig,
    pub stage_options: StageOptions,
    pub no_cache_load: bool,
    pub no_cache_save: bool,
    pub output_path: Option<PathBuf>,
}

pub struct ScanConfigBuilder<State = ()> {
    data_dir: Option<PathBuf>,
    targets: Vec<String>,
    cache_dir: PathBuf,
    requester: RequesterConfig,
    stage_options: StageOptions,
    no_cache_load: bool,
    no_cache_save: bool,
    output_path: Option<PathBuf>,
    _phantom: PhantomData<State>,
}

impl Default for ScanConfigBuilder<()> {
    fn default() -> Self {
        Self {
            data_dir: None,
            targets: Vec::new(),
            cache_dir: default_cache_dir(),
            requester: RequesterConfig::default(),
            stage_options: StageOptions::default(),
            no_cache_load: false,
            no_cache_save: false,
            output_path: None,
            _phantom: PhantomData,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("webfp-cache")
}

impl ScanConfig {
    #[must_use]
    pub fn builder() -> ScanConfigBuilder<()> {
        ScanConfigBuilder::default()
    }
}

impl ScanConfigBuilder<()> {
    pub fn data_dir(self, dir: impl Into<PathBuf>) -> ScanConfigBuilder<WithDataDir> {
        ScanConfigBuilder {
            data_dir: Some(dir.into()),
            targets: self.targets,
            cache_dir: self.cache_dir,
            requester: self.requester,
            stage_options: self.stage_options,
            no_cache_load: self.no_cache_load,
            no_cache_save: self.no_cache_save,
            output_path: self.output_path,
            _phantom: PhantomData,
        }
    }
}

impl ScanConfigBuilder<WithDataDir> {
    pub fn targets(self, targets: Vec<String>) -> ScanConfigBuilder<WithTarget> {
        ScanConfigBuilder {
            data_dir: self.data_dir,
            targets,
            cache_dir: self.cache_dir,
            requester: self.requester,
            stage_options: self.stage_options,
            no_cache_load: self.no_cache_load,
            no_cache_save: self.no_cache_save,
            output_path: self.output_path,
            _phantom: PhantomData,
        }
    }
}

impl ScanConfigBuilder<WithTarget> {
    pub fn build(self) -> Result<ScanConfig> {
        if self.targets.is_empty() {
            return Err(anyhow!("at least one scan target is required"));
        }
        Ok(ScanConfig {
            data_dir: self.data_dir.ok_or_else(|| anyhow!("data_dir is required"))?,
            targets: self.targets,
            cache_dir: self.cache_dir,
            requester: self.requester,
            stage_options: self.stage_options,
            no_cache_load: self.no_cache_load,
            no_cache_save: self.no_cache_save,
            output_path: self.output_path,
        })
    }
}

// Available at any builder state, since each has a sensible default.
impl<State> ScanConfigBuilder<State> {
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    #[must_use]
    pub fn requester(mut self, requester: RequesterConfig) -> Self {
        self.requester = requester;
        self
    }

    #[must_use]
    pub fn stage_options(mut self, options: StageOptions) -> Self {
        self.stage_options = options;
        self
    }

    #[must_use]
    pub fn no_cache_load(mut self, value: bool) -> Self {
        self.no_cache_load = value;
        self
    }

    #[must_use]
    pub fn no_cache_save(mut self, value: bool) -> Self {
        self.no_cache_save = value;
        self
    }

    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}
