//! Parser for the fixture dataset files.
//!
//! A dataset directory holds two `::`-separated files:
//! - messages.dat: userId::campaignId::message::v1,v2,...,vn
//! - engagement.dat: campaignId::count
//!
//! Blank lines and lines starting with `#` are skipped. Message text may itself
//! contain `::`; the embedding is always the last field.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use rayon::prelude::*;
use std::fs;
use std::path::Path;

const MESSAGES_FILE: &str = "messages.dat";
const ENGAGEMENT_FILE: &str = "engagement.dat";

/// Read a file into numbered, non-comment lines
fn read_data_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;

    Ok(content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim().to_string()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

fn parse_error(file: &str, line: usize, reason: impl Into<String>) -> DataLoadError {
    DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: reason.into(),
    }
}

/// Parse a comma-separated embedding: "0.1,0.2,0.3" -> vec![0.1, 0.2, 0.3]
pub(crate) fn parse_embedding(s: &str, line: usize) -> Result<Embedding> {
    let embedding = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| parse_error(MESSAGES_FILE, line, format!("Invalid embedding value '{}': {}", v, e)))
        })
        .collect::<Result<Embedding>>()?;

    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(DataLoadError::InvalidValue {
            field: "embedding".to_string(),
            value: s.to_string(),
        });
    }
    Ok(embedding)
}

fn parse_message_line(line_no: usize, line: &str) -> Result<MessageRecord> {
    let mut parts = line.splitn(3, "::");

    let user_id = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| parse_error(MESSAGES_FILE, line_no, "Missing userId"))?;
    let campaign_id = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| parse_error(MESSAGES_FILE, line_no, "Missing campaignId"))?;
    let rest = parts
        .next()
        .ok_or_else(|| parse_error(MESSAGES_FILE, line_no, "Missing message"))?;

    let (message, embedding) = rest
        .rsplit_once("::")
        .ok_or_else(|| parse_error(MESSAGES_FILE, line_no, "Missing embedding"))?;

    Ok(MessageRecord {
        user_id: user_id.to_string(),
        campaign_id: campaign_id.to_string(),
        message: message.to_string(),
        embedding: parse_embedding(embedding, line_no)?,
    })
}

/// Parse the messages.dat file
///
/// Lines are parsed in parallel; the first failing line aborts the load.
pub fn parse_messages(path: &Path) -> Result<Vec<MessageRecord>> {
    let lines = read_data_lines(path)?;

    let messages = lines
        .par_iter()
        .map(|(line_no, line)| parse_message_line(*line_no, line))
        .collect::<Result<Vec<_>>>()?;

    // All embeddings must share the first one's dimension
    if let Some(first) = messages.first() {
        let expected = first.embedding.len();
        for ((line_no, _), message) in lines.iter().zip(&messages) {
            if message.embedding.len() != expected {
                return Err(DataLoadError::DimensionMismatch {
                    line: *line_no,
                    expected,
                    found: message.embedding.len(),
                });
            }
        }
    }

    Ok(messages)
}

/// Parse the engagement.dat file
pub fn parse_engagement(path: &Path) -> Result<Vec<EngagementCount>> {
    let lines = read_data_lines(path)?;
    let mut counts = Vec::with_capacity(lines.len());

    for (line_no, line) in lines {
        let (campaign_id, count) = line
            .split_once("::")
            .ok_or_else(|| parse_error(ENGAGEMENT_FILE, line_no, "Expected campaignId::count"))?;

        if campaign_id.is_empty() {
            return Err(parse_error(ENGAGEMENT_FILE, line_no, "Missing campaignId"));
        }

        counts.push(EngagementCount {
            campaign_id: campaign_id.to_string(),
            count: count.trim().parse().map_err(|e| {
                parse_error(ENGAGEMENT_FILE, line_no, format!("Invalid count: {}", e))
            })?,
        });
    }
    Ok(counts)
}

/// File names inside a dataset directory
pub fn dataset_paths(data_dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    (data_dir.join(MESSAGES_FILE), data_dir.join(ENGAGEMENT_FILE))
}
