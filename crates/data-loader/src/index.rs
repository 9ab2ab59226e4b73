//! DataIndex loading and validation.
//!
//! Builds the in-memory DataIndex from a dataset directory:
//! - Parse messages and engagement counts in parallel
//! - Insert messages (which also builds the user and graph indices)
//! - Record engagement counts
//! - Validate the result

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::info;

impl DataIndex {
    /// Load a dataset directory containing messages.dat and engagement.dat
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading campaign dataset from {:?}", data_dir);

        let (messages_path, engagement_path) = parser::dataset_paths(data_dir);

        // Both files are independent, so parse them side by side
        let (messages, engagement) = rayon::join(
            || parser::parse_messages(&messages_path),
            || parser::parse_engagement(&engagement_path),
        );
        let messages = messages?;
        let engagement = engagement?;

        info!(
            "Parsed {} messages and {} engagement rows",
            messages.len(),
            engagement.len()
        );

        let mut index = DataIndex::new();
        for message in messages {
            index.insert_message(message);
        }
        for row in engagement {
            index.set_engagement(row.campaign_id, row.count);
        }

        index.validate()?;

        let (users, campaigns, messages) = index.counts();
        info!(
            "DataIndex ready: {} users, {} campaigns, {} messages",
            users, campaigns, messages
        );
        Ok(index)
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - Every embedding has the index dimension (and the dimension is non-zero)
    /// - Every message has a non-empty user and campaign id
    pub fn validate(&self) -> Result<()> {
        let Some(dimension) = self.dimension else {
            return Ok(());
        };

        if dimension == 0 {
            return Err(DataLoadError::ValidationError(
                "embeddings must have at least one dimension".to_string(),
            ));
        }

        for (position, message) in self.messages.iter().enumerate() {
            if message.embedding.len() != dimension {
                return Err(DataLoadError::DimensionMismatch {
                    line: position + 1,
                    expected: dimension,
                    found: message.embedding.len(),
                });
            }
            if message.user_id.is_empty() || message.campaign_id.is_empty() {
                return Err(DataLoadError::ValidationError(format!(
                    "message {} is missing a user or campaign id",
                    position + 1
                )));
            }
        }
        Ok(())
    }
}
