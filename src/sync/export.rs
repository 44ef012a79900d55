//! Collection export.
//!
//! Pages through every record of the selected collections and writes one
//! file per collection to an output directory:
//!
//! - **ndjson**: one compact record per line, streamed page by page
//! - **json**: one pretty document `{"collection", "exportedAt", "items"}`
//!
//! Each file is written atomically and a `manifest.json` lists what was
//! exported. The output can be fed straight back into `pbsync import`.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{at_least_one, CollectionFilter, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::model::{CollectionDescriptor, Record};
use crate::remote::{CollectionCatalog, RemoteClient, Transport};
use crate::sync::file::{write_manifest, AtomicFile};
use crate::sync::source::SourceFormat;
use crate::sync::types::{ExportReport, ExportedCollection};

/// Receives a notification per exported collection.
pub trait ExportReporter {
    fn exported(&self, _collection: &ExportedCollection) {}
}

impl ExportReporter for super::import::SilentReporter {}

/// Settings for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub filter: CollectionFilter,
    /// Export system collections too.
    pub include_system: bool,
    /// Records per listing request.
    pub page_size: usize,
    pub format: SourceFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            filter: CollectionFilter::default(),
            include_system: false,
            page_size: DEFAULT_PAGE_SIZE,
            format: SourceFormat::Aggregated,
        }
    }
}

/// Exporter for remote collections.
pub struct Exporter<'a, T> {
    client: &'a RemoteClient<T>,
    output_dir: PathBuf,
    options: ExportOptions,
}

impl<'a, T: Transport> Exporter<'a, T> {
    #[must_use]
    pub fn new(client: &'a RemoteClient<T>, output_dir: PathBuf, options: ExportOptions) -> Self {
        Self {
            client,
            output_dir,
            options,
        }
    }

    /// Get the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Collections that pass the filter, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `NothingToExport` if the selection is empty.
    pub fn select<'c>(
        &self,
        catalog: &'c CollectionCatalog,
    ) -> Result<Vec<&'c CollectionDescriptor>> {
        let selected = catalog.select(&self.options.filter, self.options.include_system);
        if selected.is_empty() {
            return Err(Error::NothingToExport);
        }
        Ok(selected)
    }

    /// Export every selected collection, then write the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is selected, a listing request fails, or
    /// a file cannot be written. Collections finished before the failure
    /// stay on disk.
    pub async fn export<R: ExportReporter>(
        &self,
        catalog: &CollectionCatalog,
        reporter: &R,
    ) -> Result<ExportReport> {
        let selected = self.select(catalog)?;
        let mut report = ExportReport {
            output_dir: self.output_dir.clone(),
            collections: Vec::with_capacity(selected.len()),
        };

        for descriptor in selected {
            let exported = self.export_collection(&descriptor.name).await?;
            info!(
                collection = %exported.collection,
                records = exported.records,
                "Collection exported"
            );
            reporter.exported(&exported);
            report.collections.push(exported);
        }

        write_manifest(&self.output_dir, &report.collections)?;
        Ok(report)
    }

    /// Export one collection to `<output_dir>/<name>.<ext>`.
    ///
    /// # Errors
    ///
    /// Returns an error if a listing request or the file write fails; the
    /// previous file (if any) is left untouched in that case.
    pub async fn export_collection(&self, name: &str) -> Result<ExportedCollection> {
        let format = self.options.format;
        let path = self.output_dir.join(format!("{name}.{}", format.extension()));
        let mut file = AtomicFile::create(&path)?;
        let mut items: Vec<Record> = Vec::new();
        let per_page = at_least_one(self.options.page_size);
        let mut written = 0usize;
        let mut page = 1;

        loop {
            let listing = self.client.list_records(name, page, per_page).await?;
            if listing.items.is_empty() {
                break;
            }
            let reported = listing.total();
            written += listing.items.len();
            debug!(collection = name, page, written, "Fetched page");

            match format {
                SourceFormat::LineDelimited => {
                    for record in &listing.items {
                        serde_json::to_writer(&mut file, record)?;
                        file.write_all(b"\n")?;
                    }
                }
                SourceFormat::Aggregated => items.extend(listing.items),
            }

            // A zero total is treated as unknown.
            if reported.is_some_and(|total| total > 0 && written as u64 >= total) {
                break;
            }
            page += 1;
        }

        if format == SourceFormat::Aggregated {
            let document = json!({
                "collection": name,
                "exportedAt": Utc::now().to_rfc3339(),
                "items": items,
            });
            serde_json::to_writer_pretty(&mut file, &document)?;
            file.write_all(b"\n")?;
        }
        file.commit()?;

        Ok(ExportedCollection {
            collection: name.to_string(),
            records: written,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::MockTransport;
    use crate::remote::{ApiRequest, ApiResponse};
    use crate::sync::source::RecordSource;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Three `posts` spread over pages of two, `tags` empty.
    fn store(req: &ApiRequest) -> Result<ApiResponse> {
        let page: usize = req.query_value("page").unwrap().parse().unwrap();
        let body = if req.url.ends_with("/posts/records") {
            match page {
                1 => concat!(
                    r#"{"totalItems":3,"items":["#,
                    r#"{"id":"p1","@collectionName":"posts","title":"a"},"#,
                    r#"{"id":"p2","title":"b"}]}"#
                ),
                2 => r#"{"totalItems":3,"items":[{"id":"p3","title":"c"}]}"#,
                _ => r#"{"totalItems":3,"items":[]}"#,
            }
        } else {
            r#"{"totalItems":0,"items":[]}"#
        };
        Ok(ApiResponse::new(200, body))
    }

    fn catalog() -> CollectionCatalog {
        let mut users = CollectionDescriptor::named("_superusers");
        users.system = true;
        CollectionCatalog::from_descriptors([
            CollectionDescriptor::named("tags"),
            CollectionDescriptor::named("posts"),
            users,
        ])
    }

    fn options(format: SourceFormat) -> ExportOptions {
        ExportOptions {
            page_size: 2,
            format,
            ..ExportOptions::default()
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl ExportReporter for Recorder {
        fn exported(&self, collection: &ExportedCollection) {
            self.0
                .borrow_mut()
                .push(format!("{}: {}", collection.collection, collection.records));
        }
    }

    #[tokio::test]
    async fn test_ndjson_export_streams_every_page() {
        let dir = TempDir::new().unwrap();
        let client = RemoteClient::new(MockTransport::new(store), "http://pb.local");
        let exporter = Exporter::new(
            &client,
            dir.path().to_path_buf(),
            options(SourceFormat::LineDelimited),
        );
        let recorder = Recorder::default();

        let report = exporter.export(&catalog(), &recorder).await.unwrap();

        assert_eq!(*recorder.0.borrow(), vec!["posts: 3", "tags: 0"]);
        assert_eq!(report.total(), 3);
        // Stops once totalItems is reached, no trailing empty page.
        let post_pages = client
            .transport()
            .requests()
            .iter()
            .filter(|r| r.url.ends_with("/posts/records"))
            .count();
        assert_eq!(post_pages, 2);

        let content = fs::read_to_string(dir.path().join("posts.ndjson")).unwrap();
        let ids: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(fs::read_to_string(dir.path().join("tags.ndjson")).unwrap(), "");
        assert!(!dir.path().join("_superusers.ndjson").exists());
    }

    #[tokio::test]
    async fn test_json_export_document_and_manifest() {
        let dir = TempDir::new().unwrap();
        let client = RemoteClient::new(MockTransport::new(store), "http://pb.local");
        let exporter =
            Exporter::new(&client, dir.path().to_path_buf(), options(SourceFormat::Aggregated));

        exporter.export(&catalog(), &crate::sync::SilentReporter).await.unwrap();

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        let document: Value = serde_json::from_str(&read("posts.json")).unwrap();
        assert_eq!(document["collection"], "posts");
        assert_eq!(document["items"].as_array().unwrap().len(), 3);
        let exported_at = document["exportedAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(exported_at).is_ok());

        let manifest: Value = serde_json::from_str(&read("manifest.json")).unwrap();
        assert_eq!(
            manifest,
            json!([{"collection": "posts", "records": 3}, {"collection": "tags", "records": 0}])
        );
    }

    #[tokio::test]
    async fn test_exported_file_imports_back() {
        let dir = TempDir::new().unwrap();
        let client = RemoteClient::new(MockTransport::new(store), "http://pb.local");
        let exporter =
            Exporter::new(&client, dir.path().to_path_buf(), options(SourceFormat::Aggregated));

        let exported = exporter.export_collection("posts").await.unwrap();

        let mut source = RecordSource::open(&exported.path).unwrap();
        assert_eq!(source.infer_collection().unwrap(), "posts");
        assert_eq!(source.count(), 3);
    }

    #[tokio::test]
    async fn test_empty_selection_is_an_error() {
        let dir = TempDir::new().unwrap();
        let client = RemoteClient::new(MockTransport::new(store), "http://pb.local");
        let exporter = Exporter::new(
            &client,
            dir.path().to_path_buf(),
            ExportOptions {
                filter: CollectionFilter::from_lists(Some("missing"), None),
                ..ExportOptions::default()
            },
        );

        let err = exporter.export(&catalog(), &crate::sync::SilentReporter).await.unwrap_err();

        assert!(matches!(err, Error::NothingToExport));
        assert!(client.transport().requests().is_empty());
        assert!(!dir.path().join("manifest.json").exists());
    }

    #[tokio::test]
    async fn test_include_system_selects_system_collections() {
        let dir = TempDir::new().unwrap();
        let client = RemoteClient::new(MockTransport::new(store), "http://pb.local");
        let exporter = Exporter::new(
            &client,
            dir.path().to_path_buf(),
            ExportOptions {
                include_system: true,
                ..ExportOptions::default()
            },
        );
        let catalog = catalog();

        let names: Vec<&str> = exporter
            .select(&catalog)
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();

        assert_eq!(names, vec!["_superusers", "posts", "tags"]);
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posts.json");
        fs::write(&path, "previous").unwrap();
        let client = RemoteClient::new(
            MockTransport::scripted(vec![ApiResponse::new(403, "forbidden")]),
            "http://pb.local",
        );
        let exporter = Exporter::new(&client, dir.path().to_path_buf(), ExportOptions::default());

        let err = exporter.export_collection("posts").await.unwrap_err();

        assert!(matches!(err, Error::Http { status: 403, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }
}
