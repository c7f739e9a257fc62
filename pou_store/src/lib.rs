//! Storage collaborator for analysis results: program uploads and their
//! generated reports, persisted as versioned JSON files.
//!
//! The cascade rule is an explicit repository invariant, not a storage
//! framework feature: deleting a program record deletes every report
//! record referencing it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const SCHEMA_VERSION_V1: u32 = 1;
pub const PROGRAMS_FILE_NAME: &str = "programs.v1.json";
pub const REPORTS_FILE_NAME: &str = "reports.v1.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schemaVersion: {0}")]
    UnsupportedSchemaVersion(u32),

    #[error("program not found: {0}")]
    ProgramNotFound(Uuid),
}

/// One uploaded program file, keyed to a project.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRecord {
    pub id: Uuid,
    pub project_name: String,
    pub program_name: String,
    pub program_content: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ProgramRecord {
    pub fn new(project_name: &str, program_name: &str, program_content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_name: project_name.to_string(),
            program_name: program_name.to_string(),
            program_content: program_content.to_string(),
            uploaded_at: Utc::now(),
        }
    }
}

/// One generated report for a check, owned by a program record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: Uuid,
    pub program_id: Uuid,
    pub check_name: String,
    pub check_verbose_name: String,
    pub report_content: String,
}

impl ReportRecord {
    pub fn new(
        program_id: Uuid,
        check_name: &str,
        check_verbose_name: &str,
        report_content: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            program_id,
            check_name: check_name.to_string(),
            check_verbose_name: check_verbose_name.to_string(),
            report_content: report_content.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ProgramsV1 {
    schema_version: u32,
    programs: Vec<ProgramRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ReportsV1 {
    schema_version: u32,
    reports: Vec<ReportRecord>,
}

/// Repository seam over any storage engine.
pub trait AnalysisRepository {
    fn insert_program(&mut self, record: ProgramRecord);

    /// Attach a report to an existing program.
    fn append_report(&mut self, record: ReportRecord) -> Result<(), StorageError>;

    fn program(&self, id: Uuid) -> Option<&ProgramRecord>;

    fn programs_in_project(&self, project_name: &str) -> Vec<&ProgramRecord>;

    fn reports_for(&self, program_id: Uuid) -> Vec<&ReportRecord>;

    /// Delete a program and, by invariant, every report referencing it.
    fn delete_program(&mut self, id: Uuid) -> Result<(), StorageError>;
}

/// JSON-file-backed repository: two versioned files under a base dir,
/// loaded wholesale on open, persisted wholesale on demand.
#[derive(Debug)]
pub struct JsonDirStore {
    base_dir: PathBuf,
    programs: Vec<ProgramRecord>,
    reports: Vec<ReportRecord>,
}

impl JsonDirStore {
    /// Open a store at `base_dir`, loading existing records if present.
    /// Files carrying another schema version are rejected, not migrated.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        let programs = match load_json::<ProgramsV1>(&base_dir.join(PROGRAMS_FILE_NAME))? {
            Some(file) if file.schema_version != SCHEMA_VERSION_V1 => {
                return Err(StorageError::UnsupportedSchemaVersion(file.schema_version))
            }
            Some(file) => file.programs,
            None => Vec::new(),
        };
        let reports = match load_json::<ReportsV1>(&base_dir.join(REPORTS_FILE_NAME))? {
            Some(file) if file.schema_version != SCHEMA_VERSION_V1 => {
                return Err(StorageError::UnsupportedSchemaVersion(file.schema_version))
            }
            Some(file) => file.reports,
            None => Vec::new(),
        };
        Ok(Self {
            base_dir,
            programs,
            reports,
        })
    }

    /// Write both record files, creating the base dir if needed.
    pub fn persist(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_dir)?;
        save_json(
            &self.base_dir.join(PROGRAMS_FILE_NAME),
            &ProgramsV1 {
                schema_version: SCHEMA_VERSION_V1,
                programs: self.programs.clone(),
            },
        )?;
        save_json(
            &self.base_dir.join(REPORTS_FILE_NAME),
            &ReportsV1 {
                schema_version: SCHEMA_VERSION_V1,
                reports: self.reports.clone(),
            },
        )
    }
}

impl AnalysisRepository for JsonDirStore {
    fn insert_program(&mut self, record: ProgramRecord) {
        self.programs.push(record);
    }

    fn append_report(&mut self, record: ReportRecord) -> Result<(), StorageError> {
        if self.program(record.program_id).is_none() {
            return Err(StorageError::ProgramNotFound(record.program_id));
        }
        self.reports.push(record);
        Ok(())
    }

    fn program(&self, id: Uuid) -> Option<&ProgramRecord> {
        self.programs.iter().find(|p| p.id == id)
    }

    fn programs_in_project(&self, project_name: &str) -> Vec<&ProgramRecord> {
        self.programs
            .iter()
            .filter(|p| p.project_name == project_name)
            .collect()
    }

    fn reports_for(&self, program_id: Uuid) -> Vec<&ReportRecord> {
        self.reports
            .iter()
            .filter(|r| r.program_id == program_id)
            .collect()
    }

    fn delete_program(&mut self, id: Uuid) -> Result<(), StorageError> {
        if self.program(id).is_none() {
            return Err(StorageError::ProgramNotFound(id));
        }
        self.programs.retain(|p| p.id != id);
        // Cascade: dependent reports go with their program.
        self.reports.retain(|r| r.program_id != id);
        Ok(())
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

fn save_json<T: Serialize>(path: &Path, payload: &T) -> Result<(), StorageError> {
    let text = serde_json::to_string_pretty(payload)?;
    fs::write(path, text)?;
    Ok(())
}
