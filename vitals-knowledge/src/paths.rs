use std::path::PathBuf;

use crate::RetrievalSettings;
use crate::errors::{KnowledgeError, KnowledgeResult};

pub fn data_root(settings: &RetrievalSettings) -> KnowledgeResult<PathBuf> {
    if let Some(path) = &settings.data_root_override {
        return Ok(path.clone());
    }
    if let Ok(override_dir) = std::env::var("VITALS_DATA_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let dir = dirs::data_dir().ok_or(KnowledgeError::MissingDataDir)?;
    Ok(dir.join("vitals"))
}

pub fn knowledge_db_path(settings: &RetrievalSettings) -> KnowledgeResult<PathBuf> {
    if let Some(path) = &settings.knowledge_db_path_override {
        return Ok(path.clone());
    }
    Ok(data_root(settings)?.join("knowledge.sqlite3"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let settings = RetrievalSettings {
            knowledge_db_path_override: Some(PathBuf::from("/tmp/custom.sqlite3")),
            ..Default::default()
        };
        assert_eq!(
            knowledge_db_path(&settings).unwrap(),
            PathBuf::from("/tmp/custom.sqlite3")
        );
    }

    #[test]
    fn data_root_override_is_used() {
        let settings = RetrievalSettings {
            data_root_override: Some(PathBuf::from("/tmp/vitals-data")),
            ..Default::default()
        };
        assert_eq!(
            knowledge_db_path(&settings).unwrap(),
            PathBuf::from("/tmp/vitals-data/knowledge.sqlite3")
        );
    }
}
