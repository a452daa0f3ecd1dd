use crate::core::Storage;
use crate::utils::error::Result;
use std::path::Path;

/// 本機檔案系統儲存，路徑相對於 `base_path`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_storage_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());

        tokio_test::block_on(async {
            storage
                .write_file("nested/dir/result.json", "{\"город\": 1}".as_bytes())
                .await
                .unwrap();
            let data = storage.read_file("nested/dir/result.json").await.unwrap();
            assert_eq!(String::from_utf8(data).unwrap(), "{\"город\": 1}");

            assert!(storage.read_file("missing.json").await.is_err());
        });
    }
}
