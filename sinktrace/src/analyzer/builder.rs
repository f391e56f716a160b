//! Builder-style methods for the Sinktrace analyzer.

use super::Sinktrace;
use crate::config::Config;

impl Sinktrace {
    /// Creates an analyzer from a loaded configuration.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let section = &config.sinktrace;
        let analyzer = Self {
            enable_patterns: section.patterns.unwrap_or(true),
            enable_inference: section.inference.unwrap_or(true),
            include_tests: section.include_tests.unwrap_or(false),
            benchmark_mode: section.benchmark.unwrap_or(false),
            emit_jaif: section.jaif.unwrap_or(false),
            exclude_folders: section.exclude_folders.clone().unwrap_or_default(),
            include_folders: section.include_folders.clone().unwrap_or_default(),
            ..Self::default()
        };
        analyzer.with_config(config)
    }

    /// Builder-style method to set the analysis root.
    #[must_use]
    pub fn with_root(mut self, root: std::path::PathBuf) -> Self {
        self.analysis_root = root;
        self
    }

    /// Builder-style method to set verbose mode.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builder-style method to enable the pattern matcher.
    #[must_use]
    pub fn with_patterns(mut self, enabled: bool) -> Self {
        self.enable_patterns = enabled;
        self
    }

    /// Builder-style method to enable flow tracing.
    #[must_use]
    pub fn with_flow(mut self, enabled: bool) -> Self {
        self.enable_flow = enabled;
        self
    }

    /// Builder-style method to enable the solver and inferrer.
    #[must_use]
    pub fn with_inference(mut self, enabled: bool) -> Self {
        self.enable_inference = enabled;
        self
    }

    /// Builder-style method to include test files.
    #[must_use]
    pub fn with_tests(mut self, include: bool) -> Self {
        self.include_tests = include;
        self
    }

    /// Builder-style method to enable benchmark mode.
    #[must_use]
    pub fn with_benchmark(mut self, enabled: bool) -> Self {
        self.benchmark_mode = enabled;
        self
    }

    /// Builder-style method to attach JAIF exports to results.
    #[must_use]
    pub fn with_jaif(mut self, enabled: bool) -> Self {
        self.emit_jaif = enabled;
        self
    }

    /// Builder-style method to set excluded folders.
    #[must_use]
    pub fn with_excludes(mut self, folders: Vec<String>) -> Self {
        self.exclude_folders = folders;
        self
    }

    /// Builder-style method to set included folders.
    #[must_use]
    pub fn with_includes(mut self, folders: Vec<String>) -> Self {
        self.include_folders = folders;
        self
    }

    /// Builder-style method to set config.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Counts the source files a project analysis would visit.
    /// Useful for sizing a progress bar before the run.
    #[must_use]
    pub fn count_files(&self, root: &std::path::Path) -> usize {
        self.collect_source_files(root).len()
    }
}
