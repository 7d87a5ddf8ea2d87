use serde::{Deserialize, Serialize};

use crate::codec::CompressionMode;
use crate::error::{LeafdexError, Result};

/// Default number of uncompressed bytes buffered per record-store chunk
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Index settings, fixed when an index is opened
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub compression: CompressionMode,
    pub chunk_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            compression: CompressionMode::Fast,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl IndexSettings {
    /// Select the compression scheme used for stored blocks
    pub fn with_compression(mut self, compression: CompressionMode) -> Self {
        self.compression = compression;
        self
    }

    /// Set the record-store chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(LeafdexError::InvalidRequest(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = IndexSettings::default();
        assert_eq!(settings.compression, CompressionMode::Fast);
        assert_eq!(settings.chunk_size, 16 * 1024);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_builder() {
        let settings = IndexSettings::default().with_chunk_size(0);
        assert!(matches!(
            settings.validate(),
            Err(LeafdexError::InvalidRequest(_))
        ));

        let settings = IndexSettings::default()
            .with_compression(CompressionMode::Fast)
            .with_chunk_size(512);
        assert_eq!(settings.chunk_size, 512);
    }

    #[test]
    fn test_settings_serde() {
        let settings = IndexSettings::default().with_chunk_size(4096);
        let bytes = bincode::serialize(&settings).unwrap();
        let restored: IndexSettings = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, settings);
    }
}
