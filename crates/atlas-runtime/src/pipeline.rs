//! Runs an ordered list of analyzers against one connection

use crate::error::{RuntimeError, RuntimeResult};
use crate::progress::{ProgressEvent, ProgressSink};
use atlas_analysis::{AnalysisContext, AnalyzerRegistry};
use atlas_core::{AnalysisResult, Config};
use atlas_db::CatalogProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executes analyzer steps in order, storing each produced section in the
/// working result before the next step reads it.
pub struct Pipeline<'a> {
    registry: &'a AnalyzerRegistry,
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a AnalyzerRegistry, config: &'a Config) -> Self {
        Self { registry, config }
    }

    /// Run `steps` against `provider`, writing into `result`.
    ///
    /// On error or cancellation `result` may hold the sections of the
    /// steps that finished; callers run on a working copy.
    pub async fn run<S: AsRef<str>>(
        &self,
        provider: Arc<dyn CatalogProvider>,
        steps: &[S],
        result: &mut AnalysisResult,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RuntimeResult<()> {
        let total = steps.len();
        for (i, step) in steps.iter().enumerate() {
            let name = step.as_ref();
            if cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            let analyzer = self.registry.get(name)?;
            sink.emit(ProgressEvent::running(name, i + 1, total));

            let section = {
                let ctx = AnalysisContext::new(Arc::clone(&provider), result, self.config);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                    section = analyzer.analyze(&ctx) => section?,
                }
            };
            log::debug!(
                "Analyzer {} produced {} for {}",
                name,
                section.section(),
                provider.database_name().unwrap_or(provider.server_name())
            );
            result.put_section(section);

            sink.emit(ProgressEvent::completed(name, i + 1, total));
        }
        Ok(())
    }
}
