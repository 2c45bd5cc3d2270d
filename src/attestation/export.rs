//! Final artifact export for closed precincts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::types::ElectionReturn;
use crate::{Error, Result};

const FINAL_DIR: &str = "final";
const ARTIFACT_NAME: &str = "election_return.json";
const DIGEST_SUFFIX: &str = "blake3";

/// How much of the return goes into the exported document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPayload {
    /// Tallies and precinct only; ballots and signatures are left out
    Minimal,
    #[default]
    Full,
}

impl fmt::Display for ExportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPayload::Minimal => f.write_str("minimal"),
            ExportPayload::Full => f.write_str("full"),
        }
    }
}

impl FromStr for ExportPayload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(ExportPayload::Minimal),
            "full" => Ok(ExportPayload::Full),
            other => Err(Error::validation(
                "payload",
                format!("expected 'minimal' or 'full', got '{other}'"),
            )),
        }
    }
}

/// Where an artifact landed and the digest of its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    /// `None` when the sink keeps nothing
    pub path: Option<PathBuf>,
    /// Hex BLAKE3 digest of the exported document
    pub digest: String,
}

/// Destination for finalized election returns
pub trait ArtifactSink: Send + Sync {
    fn export(
        &self,
        election_return: &ElectionReturn,
        payload: ExportPayload,
    ) -> Result<ExportReceipt>;
}

/// The exported JSON document for a return
pub fn render(election_return: &ElectionReturn, payload: ExportPayload) -> Result<Vec<u8>> {
    let mut doc = serde_json::to_value(election_return)?;
    if payload == ExportPayload::Minimal {
        if let Some(fields) = doc.as_object_mut() {
            fields.remove("ballots");
            fields.remove("signatures");
        }
    }
    Ok(serde_json::to_vec_pretty(&doc)?)
}

pub fn digest(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Writes `<root>/ER-<code>/final/election_return.json` and a digest file beside it
#[derive(Debug, Clone)]
pub struct FileArtifactSink {
    root: PathBuf,
}

impl FileArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn artifact_path(&self, return_code: &str) -> PathBuf {
        self.root
            .join(format!("ER-{return_code}"))
            .join(FINAL_DIR)
            .join(ARTIFACT_NAME)
    }

    fn digest_path(artifact: &Path) -> PathBuf {
        let mut name = artifact.as_os_str().to_owned();
        name.push(".");
        name.push(DIGEST_SUFFIX);
        PathBuf::from(name)
    }

    /// Whether an exported artifact still matches its recorded digest
    pub fn verify(&self, return_code: &str) -> Result<bool> {
        let artifact = self.artifact_path(return_code);
        let bytes = std::fs::read(&artifact)?;
        let recorded = std::fs::read_to_string(Self::digest_path(&artifact))?;
        Ok(recorded.trim() == digest(&bytes))
    }
}

impl ArtifactSink for FileArtifactSink {
    fn export(
        &self,
        election_return: &ElectionReturn,
        payload: ExportPayload,
    ) -> Result<ExportReceipt> {
        let bytes = render(election_return, payload)?;
        let digest = digest(&bytes);

        let artifact = self.artifact_path(&election_return.code);
        if let Some(dir) = artifact.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&artifact, &bytes)?;
        std::fs::write(Self::digest_path(&artifact), &digest)?;

        info!(
            code = %election_return.code,
            path = %artifact.display(),
            payload = %payload,
            "Election return exported"
        );

        Ok(ExportReceipt {
            path: Some(artifact),
            digest,
        })
    }
}

/// Sink for deployments that keep no artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct NullArtifactSink;

impl ArtifactSink for NullArtifactSink {
    fn export(
        &self,
        election_return: &ElectionReturn,
        payload: ExportPayload,
    ) -> Result<ExportReceipt> {
        Ok(ExportReceipt {
            path: None,
            digest: digest(&render(election_return, payload)?),
        })
    }
}
