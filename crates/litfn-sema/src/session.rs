use std::path::{Path, PathBuf};
use std::sync::Arc;

use litfn_syntax::parse_unit;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::analyzer::Analyzer;
use crate::config::{AnalysisConfig, ConfigError};
use crate::dedup::{fold_literals, InstanceTable};
use crate::report::UnitReport;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Checks translation units against one configuration and one instance table.
#[derive(Debug, Clone)]
pub struct Session {
    config: AnalysisConfig,
    table: Arc<InstanceTable>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl Session {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_table(config, Arc::new(InstanceTable::new()))
    }

    pub fn with_table(config: AnalysisConfig, table: Arc<InstanceTable>) -> Self {
        Self { config, table }
    }

    pub fn from_config_file(path: &Path) -> Result<Self, SessionError> {
        Ok(Self::new(AnalysisConfig::load(path)?))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<InstanceTable> {
        &self.table
    }

    /// Parses and analyses one unit. Parser diagnostics come first in the report.
    #[instrument(skip(self, source))]
    pub fn check_source(&self, path: &str, source: &str) -> UnitReport {
        let (unit, parse_diagnostics) = parse_unit(path, source);
        let analyzer = Analyzer::new(self.config.clone(), Arc::clone(&self.table));
        let mut report = analyzer.analyze_unit(&unit);
        report.diagnostics.splice(0..0, parse_diagnostics);
        debug!(
            diagnostics = report.diagnostics.len(),
            literals = report.literals.len(),
            "checked unit"
        );
        report
    }

    pub fn check_file(&self, path: &Path) -> Result<UnitReport, SessionError> {
        let source = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.check_source(&path.display().to_string(), &source))
    }

    /// Checks `(path, source)` pairs in parallel. Unit ids follow input order and folding runs
    /// afterwards in the same order, so the reports do not depend on scheduling.
    #[instrument(skip_all, fields(units = sources.len()))]
    pub fn check_sources(&self, sources: &[(String, String)]) -> Vec<UnitReport> {
        let units: Vec<_> = sources
            .iter()
            .map(|(path, source)| (self.table.register_unit(), path, source))
            .collect();
        let mut reports: Vec<UnitReport> = units
            .into_par_iter()
            .map(|(unit_id, path, source)| {
                let (unit, parse_diagnostics) = parse_unit(path, source);
                let analyzer =
                    Analyzer::with_unit(self.config.clone(), Arc::clone(&self.table), unit_id)
                        .defer_folding();
                let mut report = analyzer.analyze_unit(&unit);
                report.diagnostics.splice(0..0, parse_diagnostics);
                report
            })
            .collect();
        if self.config.deduplicate {
            for report in &mut reports {
                fold_literals(&self.table, report.unit, &mut report.literals);
            }
        }
        reports
    }
}
