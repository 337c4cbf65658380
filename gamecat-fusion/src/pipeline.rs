//! Pipeline orchestration
//!
//! Single-threaded batch run: load -> preprocess (per source) -> fuse ->
//! curate -> synthesize -> fit models. Each stage consumes the previous
//! stage's output by value; nothing is revisited once handed on.

use crate::curation::{curate, CurationTable};
use crate::features::{classifier_dataset, ClassifierDataset, FeatureSynthesizer, TaxonomyTable};
use crate::fusion::{fuse_sources, ConflictReport};
use crate::model::{fit_models, ModelArtifacts};
use crate::preprocess::preprocess_source;
use crate::record::FusedGameRecord;
use crate::snapshot::{self, SnapshotDir};
use crate::sources::{SourceSchema, SourceTable};
use gamecat_common::config::TomlConfig;
use gamecat_common::{FeatureLayout, Result, RunDiagnostics};
use std::path::Path;
use tracing::info;

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<FusedGameRecord>,
    pub layout: FeatureLayout,
    pub models: ModelArtifacts,
    pub classifier: ClassifierDataset,
    pub conflicts: Vec<ConflictReport>,
    pub diagnostics: RunDiagnostics,
}

pub struct Pipeline {
    config: TomlConfig,
    synthesizer: FeatureSynthesizer,
    curation: CurationTable,
}

impl Pipeline {
    /// Load the data tables named by `config` (or the compiled-in ones)
    pub fn from_config(config: TomlConfig) -> Result<Self> {
        let taxonomy = TaxonomyTable::load(config.tables.taxonomy.as_deref())?;
        let curation = CurationTable::load(config.tables.curation.as_deref())?;
        Self::new(config, &taxonomy, curation)
    }

    pub fn new(config: TomlConfig, taxonomy: &TaxonomyTable, curation: CurationTable) -> Result<Self> {
        config.validate()?;
        let synthesizer = FeatureSynthesizer::new(taxonomy)?;
        curation.validate(synthesizer.layout())?;
        info!(
            "Feature layout v{}: {} columns (fingerprint {})",
            synthesizer.layout().version(),
            synthesizer.layout().dimension(),
            synthesizer.layout().fingerprint()
        );
        Ok(Self {
            config,
            synthesizer,
            curation,
        })
    }

    pub fn layout(&self) -> &FeatureLayout {
        self.synthesizer.layout()
    }

    /// Load both configured source files, then run
    ///
    /// Both files are checked for existence before anything is parsed.
    pub fn run_files(&self) -> Result<PipelineOutput> {
        let steam_path = &self.config.inputs.steam_path;
        let epic_path = &self.config.inputs.epic_path;
        for (schema, path) in [(SourceSchema::steam(), steam_path), (SourceSchema::epic(), epic_path)] {
            if !path.is_file() {
                return Err(gamecat_common::Error::MissingSource {
                    source_name: schema.id.to_string(),
                    path: path.display().to_string(),
                });
            }
        }

        let steam = SourceTable::from_csv_path(steam_path, SourceSchema::steam())?;
        let epic = SourceTable::from_csv_path(epic_path, SourceSchema::epic())?;
        self.run(steam, epic)
    }

    /// Run every stage over already-loaded source tables
    pub fn run(&self, primary: SourceTable, secondary: SourceTable) -> Result<PipelineOutput> {
        let params = &self.config.pipeline;
        let mut diagnostics = RunDiagnostics::default();

        let (primary, primary_stats) = preprocess_source(primary, params);
        let (secondary, secondary_stats) = preprocess_source(secondary, params);
        diagnostics.preprocess = vec![primary_stats, secondary_stats];

        let fusion = fuse_sources(primary, secondary, params)?;
        diagnostics.fusion = fusion.stats;

        let (curated, curation_stats) = curate(fusion.records, &self.curation, params);
        diagnostics.curation = curation_stats;

        let (mut records, synthesis_stats) = self.synthesizer.synthesize(curated);
        diagnostics.synthesis = synthesis_stats;

        let layout = self.synthesizer.layout().clone();
        let models = fit_models(&mut records, &layout, &self.config.model)?;
        diagnostics.model = Some(models.stats.clone());

        let classifier = classifier_dataset(&records, &layout, params.hit_quantile)?;
        info!(
            "Classifier dataset: {} rows, {} hits above {:.0} reviews",
            classifier.rows.len(),
            classifier.hit_count(),
            classifier.threshold
        );
        info!(
            "Run complete: {} records, {} dropped along the way",
            records.len(),
            diagnostics.total_dropped()
        );

        Ok(PipelineOutput {
            records,
            layout,
            models,
            classifier,
            conflicts: fusion.conflicts,
            diagnostics,
        })
    }
}

/// Persist every artifact of `output` into `dir`
pub fn write_snapshots(output: &PipelineOutput, dir: &Path) -> Result<SnapshotDir> {
    let snapshots = SnapshotDir::new(dir);
    snapshots.create()?;

    snapshot::write_fused_table(&snapshots.fused_table(), &output.records, &output.layout)?;
    snapshot::write_json(&snapshots.layout(), &output.layout)?;
    snapshot::write_json(&snapshots.cluster_model(), &output.models.cluster_model)?;
    snapshot::write_json(&snapshots.neighbor_index(), &output.models.neighbor_index)?;
    snapshot::write_json(&snapshots.classifier_dataset(), &output.classifier)?;
    snapshot::write_json(&snapshots.conflicts(), &output.conflicts)?;
    snapshot::write_json(&snapshots.diagnostics(), &output.diagnostics)?;

    info!("Snapshots written to {}", dir.display());
    Ok(snapshots)
}
