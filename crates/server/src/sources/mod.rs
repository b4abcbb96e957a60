//! Record sources for templates

pub mod demo;
pub mod erp;
pub mod spreadsheet;
pub mod table;

use serde::Serialize;
use template::Record;

use crate::error::{AppError, AppResult};
use crate::models::data_import;
use crate::models::template::{DataSource, Template};
use crate::state::AppState;

/// Records loaded for a template
#[derive(Debug, Clone, Serialize)]
pub struct LoadedRecords {
    pub records: Vec<Record>,
    /// True when the records are bundled ERP demo data
    pub demo: bool,
}

impl LoadedRecords {
    fn live(records: Vec<Record>) -> Self {
        Self {
            records,
            demo: false,
        }
    }
}

/// Load the records of a template's configured data source
pub async fn load_records(state: &AppState, template: &Template) -> AppResult<LoadedRecords> {
    match &template.data_source {
        DataSource::None => Err(AppError::Validation(format!(
            "template '{}' has no data source",
            template.key
        ))),
        DataSource::Table { table } => {
            let pool = state.pool.clone();
            let table = table.clone();
            let records = tokio::task::spawn_blocking(move || {
                let conn = pool.get()?;
                table::read_table(&conn, &table, table::DEFAULT_LIMIT)
            })
            .await??;
            Ok(LoadedRecords::live(records))
        }
        DataSource::Import { import_id } => {
            let import = {
                let conn = state.pool.get()?;
                data_import::get(&conn, *import_id)?
            };
            if import.template_id != template.id {
                return Err(AppError::Validation(format!(
                    "import {import_id} belongs to another template"
                )));
            }
            let path = state.storage.resolve(&import.file_path)?;
            let sheet = tokio::task::spawn_blocking(move || spreadsheet::read_file(&path)).await??;
            Ok(LoadedRecords::live(sheet.records()))
        }
        DataSource::ErpDoctype { doctype, filters } => {
            let result = erp::documents_or_demo(
                state.erp.as_ref(),
                doctype,
                filters.as_ref(),
                table::DEFAULT_LIMIT,
            )
            .await;
            Ok(LoadedRecords {
                records: result.records,
                demo: result.demo,
            })
        }
        DataSource::ErpReport { report, filters } => {
            let result = erp::report_or_demo(state.erp.as_ref(), report, filters.as_ref()).await;
            Ok(LoadedRecords {
                records: result.records,
                demo: result.demo,
            })
        }
    }
}
