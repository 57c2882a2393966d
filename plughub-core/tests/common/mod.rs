//! Test helper functions for integration tests
//!
//! Shared across the test files using the tests/common/ pattern: an
//! in-memory feed serving the JSON under tests/fixtures/, and a temporary
//! host with install manifests.

#![allow(dead_code)]

use plughub_core::catalog::{
    CatalogEntry, Developer, GithubRepo, HubFeed, ManifestEntry, ManifestFile, ReleaseEntry,
};
use plughub_core::config::HostPaths;
use plughub_core::error::Result;
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture<T: DeserializeOwned>(name: &str) -> T {
    let content = std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("missing fixture {name}: {e}"));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid fixture {name}: {e}"))
}

/// `HubFeed` serving the fixture files, counting release requests
///
/// Every repository gets the same release list.
pub struct FixtureFeed {
    pub release_calls: Cell<usize>,
    pub latest_calls: Cell<usize>,
}

impl FixtureFeed {
    pub fn new() -> Self {
        Self {
            release_calls: Cell::new(0),
            latest_calls: Cell::new(0),
        }
    }
}

impl HubFeed for FixtureFeed {
    fn catalog(&self) -> Result<Vec<CatalogEntry>> {
        Ok(load_fixture("allplan-extensions.json"))
    }

    fn developers(&self) -> Result<Vec<Developer>> {
        Ok(load_fixture("plugin-developers.json"))
    }

    fn releases(&self, _repo: &GithubRepo) -> Result<Vec<ReleaseEntry>> {
        self.release_calls.set(self.release_calls.get() + 1);
        Ok(load_fixture("releases.json"))
    }

    fn latest_release(&self, _repo: &GithubRepo) -> Result<ReleaseEntry> {
        self.latest_calls.set(self.latest_calls.get() + 1);
        Ok(load_fixture("latest-release.json"))
    }
}

/// Local HTTP server answering every request with the same status line
///
/// Returns the base URL. The server thread lives until the test binary exits.
pub fn serve_status(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().expect("local addr");

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            let body = status_line;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{addr}")
}

/// Temporary host directory with etc, std and usr roots
pub struct TestHost {
    pub dir: TempDir,
    pub paths: HostPaths,
}

impl TestHost {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();

        let paths = HostPaths {
            etc: Some(root.join("etc")),
            std: Some(root.join("std")),
            usr: Some(root.join("usr")),
        };

        for location_root in [&paths.etc, &paths.std, &paths.usr].into_iter().flatten() {
            std::fs::create_dir_all(location_root).expect("location root");
        }

        Self { dir, paths }
    }

    /// Write a manifest into one location root
    pub fn write_manifest(&self, location_root: &Path, entries: Vec<serde_json::Value>) {
        let plugins: Vec<ManifestEntry> = entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).expect("manifest entry"))
            .collect();

        let manifest = ManifestFile {
            plugins,
            ..Default::default()
        };
        manifest
            .save_to_path(&location_root.join("AllepPlugins").join("manifests.json"))
            .expect("write manifest");
    }

    /// Create a file below a location root, creating parent directories
    pub fn touch(&self, location_root: &Path, relative: &str) -> PathBuf {
        let path = relative
            .split('\\')
            .fold(location_root.to_path_buf(), |path, part| path.join(part));
        std::fs::create_dir_all(path.parent().expect("parent")).expect("parent dir");
        std::fs::write(&path, b"content").expect("write file");
        path
    }

    pub fn usr(&self) -> &Path {
        self.paths.usr.as_deref().expect("usr root")
    }

    pub fn std(&self) -> &Path {
        self.paths.std.as_deref().expect("std root")
    }
}
