//! Bot archive handling
//!
//! The export is patched as raw text before it is parsed. Function ARNs can
//! sit anywhere in the document, including inside stringified JSON, so a
//! structural edit would miss some of them.

use std::borrow::Cow;
use std::io::{Cursor, Read, Write};
use std::sync::LazyLock;

use regex::Regex;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::DeployerError;

static LAMBDA_FUNCTION_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"arn:aws:lambda:(\w+)-(\w+)-(\d+):(\d+):function").expect("static pattern")
});

/// Point every Lambda function ARN in `text` at `account_id`.
///
/// Partition, service and region segments are kept; only the account
/// segment changes.
pub fn rewrite_function_arns<'a>(text: &'a str, account_id: &str) -> Cow<'a, str> {
    let replacement = format!("arn:aws:lambda:${{1}}-${{2}}-${{3}}:{}:function", account_id);
    LAMBDA_FUNCTION_ARN.replace_all(text, replacement.as_str())
}

/// A zip container carrying a bot export
#[derive(Debug, Clone)]
pub struct BotArchive {
    bytes: Vec<u8>,
}

impl BotArchive {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Archive holding `text` as its only entry
    pub fn single_entry(entry_name: &str, text: &str) -> Result<Self, DeployerError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file(entry_name, options)?;
        writer.write_all(text.as_bytes())?;
        let cursor = writer.finish()?;

        Ok(Self {
            bytes: cursor.into_inner(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Read the UTF-8 document stored as `export_name`
    pub fn read_export(&self, export_name: &str) -> Result<String, DeployerError> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let mut entry = match archive.by_name(export_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(DeployerError::ArchiveError(format!(
                    "{} not found in archive (entries: {})",
                    export_name,
                    names.join(", ")
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;

        String::from_utf8(raw).map_err(|e| {
            DeployerError::ArchiveError(format!("{} is not valid UTF-8: {}", export_name, e))
        })
    }
}
