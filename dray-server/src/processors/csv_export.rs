use std::sync::Arc;

use async_trait::async_trait;
use dray_queue::{JobId, ProcessError, Processor};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::store::ContentStore;

#[derive(Debug, Deserialize)]
struct CsvPayload {
    data: Vec<Map<String, Value>>,
}

/// Renders `payload.data` as a CSV file and stores it under the job id.
///
/// The first record fixes the header set; every record must carry exactly
/// those keys with scalar values. Payload shape problems fail the job
/// permanently, storage problems retry.
pub struct CsvExportProcessor {
    store: Arc<dyn ContentStore>,
}

impl CsvExportProcessor {
    pub const JOB_TYPE: &'static str = "CSV_EXPORT";

    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    fn encode(rows: &[Map<String, Value>]) -> Result<Vec<u8>, ProcessError> {
        let first = rows.first().ok_or_else(|| {
            ProcessError::invalid_payload("data must contain at least one record")
        })?;
        let headers: Vec<&str> = first.keys().map(String::as_str).collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&headers)
            .map_err(|e| ProcessError::transient(format!("Failed to write CSV: {e}")))?;

        for (index, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ProcessError::invalid_payload(format!(
                    "Record {index} has {} fields, expected {}",
                    row.len(),
                    headers.len()
                )));
            }
            let mut fields = Vec::with_capacity(headers.len());
            for key in &headers {
                let value = row.get(*key).ok_or_else(|| {
                    ProcessError::invalid_payload(format!(
                        "Record {index} is missing field '{key}'"
                    ))
                })?;
                fields.push(scalar_field(value, index, key)?);
            }
            writer
                .write_record(&fields)
                .map_err(|e| ProcessError::transient(format!("Failed to write CSV: {e}")))?;
        }

        writer
            .into_inner()
            .map_err(|e| ProcessError::transient(format!("Failed to flush CSV: {e}")))
    }
}

fn scalar_field(value: &Value, index: usize, key: &str) -> Result<String, ProcessError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => Err(ProcessError::invalid_payload(format!(
            "Field '{key}' in record {index} is not a scalar"
        ))),
    }
}

#[async_trait]
impl Processor for CsvExportProcessor {
    fn job_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    async fn process(&self, job_id: &JobId, payload: &Value) -> Result<Value, ProcessError> {
        let payload: CsvPayload = serde_json::from_value(payload.clone()).map_err(|e| {
            ProcessError::invalid_payload(format!("expected a data array of records: {e}"))
        })?;

        let bytes = Self::encode(&payload.data)?;
        let path = self
            .store
            .put(&format!("{job_id}.csv"), &bytes)
            .await
            .map_err(|e| ProcessError::transient(format!("Failed to store CSV: {e}")))?;

        info!(job_id = %job_id, path = %path, rows = payload.data.len(), "CSV export written");
        Ok(json!({ "filePath": path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// Captures stored content instead of touching the filesystem.
    #[derive(Default)]
    struct MemoryStore {
        files: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl ContentStore for MemoryStore {
        async fn put(&self, key: &str, bytes: &[u8]) -> io::Result<String> {
            self.files
                .lock()
                .unwrap()
                .push((key.to_string(), bytes.to_vec()));
            Ok(format!("/stored/{key}"))
        }
    }

    fn processor() -> (CsvExportProcessor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (CsvExportProcessor::new(store.clone()), store)
    }

    #[tokio::test]
    async fn renders_records_to_csv_and_stores_them() {
        let (processor, store) = processor();
        let job_id = JobId::new();
        let payload = json!({
            "data": [
                { "id": 1, "name": "Alice" },
                { "id": 2, "name": "Bob" }
            ]
        });

        let result = processor.process(&job_id, &payload).await.unwrap();

        assert_eq!(
            result,
            json!({ "filePath": format!("/stored/{job_id}.csv") })
        );
        let files = store.files.lock().unwrap();
        let (key, bytes) = &files[0];
        assert_eq!(key, &format!("{job_id}.csv"));
        assert_eq!(bytes.as_slice(), b"id,name\n1,Alice\n2,Bob\n");
    }

    #[tokio::test]
    async fn renders_null_bool_and_float_fields() {
        let (processor, store) = processor();
        let payload = json!({
            "data": [
                { "score": 1.5, "active": true, "note": null }
            ]
        });

        processor.process(&JobId::new(), &payload).await.unwrap();

        let files = store.files.lock().unwrap();
        assert_eq!(files[0].1.as_slice(), b"score,active,note\n1.5,true,\n");
    }

    #[tokio::test]
    async fn empty_data_is_a_permanent_failure() {
        let (processor, _) = processor();

        let err = processor
            .process(&JobId::new(), &json!({ "data": [] }))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidPayload(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn missing_data_key_is_a_permanent_failure() {
        let (processor, _) = processor();

        let err = processor
            .process(&JobId::new(), &json!({ "rows": [] }))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn mismatched_record_keys_are_rejected() {
        let (processor, _) = processor();
        let payload = json!({
            "data": [
                { "id": 1, "name": "Alice" },
                { "id": 2, "email": "bob@example.com" }
            ]
        });

        let err = processor
            .process(&JobId::new(), &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn nested_values_are_rejected() {
        let (processor, _) = processor();
        let payload = json!({
            "data": [
                { "id": 1, "tags": ["a", "b"] }
            ]
        });

        let err = processor
            .process(&JobId::new(), &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidPayload(_)));
    }
}
