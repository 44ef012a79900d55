//! Record endpoints: create, update, list.

use reqwest::Method;
use serde_json::Value;

use super::transport::{ApiResponse, Transport};
use super::{records_path, RemoteClient};
use crate::error::Result;
use crate::model::{ListPage, Record};

impl<T: Transport> RemoteClient<T> {
    /// `POST` a new record.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    pub async fn create_record(&self, collection: &str, data: &Record) -> Result<ApiResponse> {
        let request = self
            .request(Method::POST, &records_path(collection))
            .json(Value::Object(data.clone()));
        self.send(&request).await
    }

    /// `PATCH` the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    pub async fn update_record(
        &self,
        collection: &str,
        id: &str,
        data: &Record,
    ) -> Result<ApiResponse> {
        let path = format!("{}/{id}", records_path(collection));
        let request = self
            .request(Method::PATCH, &path)
            .json(Value::Object(data.clone()));
        self.send(&request).await
    }

    /// Fetch one page of records (1-based `page`).
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted, or `Json`
    /// if the page cannot be decoded.
    pub async fn list_records(
        &self,
        collection: &str,
        page: usize,
        per_page: usize,
    ) -> Result<ListPage<Record>> {
        let request = self
            .request(Method::GET, &records_path(collection))
            .query("page", page)
            .query("perPage", per_page);
        self.send(&request).await?.json()
    }
}
