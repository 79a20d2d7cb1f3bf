use crate::core::join;
use crate::core::registry::TransformationRegistry;
use crate::domain::model::{Table, TableSet, TransformPlan};
use crate::utils::error::{EtlError, Result};

/// Executes a declarative transformation plan against a set of named tables.
pub struct TransformationPipeline<'a> {
    registry: &'a TransformationRegistry,
}

impl<'a> TransformationPipeline<'a> {
    pub fn new(registry: &'a TransformationRegistry) -> Self {
        Self { registry }
    }

    /// Runs the per-table transformation chains in configured order, then the
    /// joins in configured order, and returns the merged table.
    ///
    /// Each step's output replaces the table-set entry, so later chains and
    /// joins observe transformed tables. When several joins are configured,
    /// each one reads its inputs from the table set and only the final join's
    /// result becomes the pipeline output; joins do not chain.
    pub fn execute(&self, plan: &TransformPlan, mut tables: TableSet) -> Result<Table> {
        for spec in &plan.tables {
            let mut table = tables.take(&spec.table_name)?;

            for step in &spec.transformations {
                let transform = self.registry.lookup(&step.name)?;
                tracing::debug!(
                    "Applying '{}' to table '{}'",
                    step.name,
                    spec.table_name
                );
                table = transform(table, &step.parameters).map_err(|e| {
                    EtlError::TransformationFailed {
                        table: spec.table_name.clone(),
                        step: step.name.clone(),
                        source: Box::new(e),
                    }
                })?;
            }

            tracing::debug!(
                "Table '{}' transformed: {} rows x {} columns",
                spec.table_name,
                table.num_rows(),
                table.num_columns()
            );
            tables.insert(spec.table_name.clone(), table);
        }

        let mut merged: Option<Table> = None;
        for spec in &plan.join {
            let left = tables.get(&spec.source_1)?;
            let right = tables.get(&spec.source_2)?;

            let joined = join::join(left, right, spec.on.columns(), spec.how).map_err(|e| {
                EtlError::JoinFailed {
                    left: spec.source_1.clone(),
                    right: spec.source_2.clone(),
                    source: Box::new(e),
                }
            })?;
            tracing::debug!(
                "Joined '{}' with '{}': {} rows",
                spec.source_1,
                spec.source_2,
                joined.num_rows()
            );
            merged = Some(joined);
        }

        merged.ok_or(EtlError::NoJoinConfiguredError)
    }
}
