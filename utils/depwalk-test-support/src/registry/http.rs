use std::fmt;

use assert_fs::TempDir;
use assert_fs::prelude::*;
use axum::http::StatusCode;
use once_cell::sync::Lazy;
use tokio::runtime;

use crate::document::DocumentBuilder;
use crate::simple_http_server::SimpleHttpServer;

// Keep a global multi-threading runtime to contain all running servers in one shared
// thread pool, while maintaining synchronous nature of tests.
static RUNTIME: Lazy<runtime::Runtime> = Lazy::new(|| {
    runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
});

/// An npm-compatible registry serving package documents from a temporary directory.
///
/// Documents are stored under the package name, so scoped packages end up in a directory named
/// after the scope. The server decodes `@scope%2Fname` back into that path.
pub struct HttpRegistry {
    t: TempDir,
    url: String,

    // This needs to be stored here so that it's dropped properly.
    server: SimpleHttpServer,
}

impl HttpRegistry {
    pub fn serve() -> Self {
        let t = TempDir::new().unwrap();
        let server = {
            let _guard = RUNTIME.enter();
            SimpleHttpServer::serve(t.path().to_owned())
        };
        let url = server.url();
        Self { t, url, server }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn publish(&mut self, document: DocumentBuilder) -> &mut Self {
        let body = document.to_json_string();
        self.publish_raw(document.name(), &body)
    }

    /// Serve `body` verbatim as the document of `name`.
    pub fn publish_raw(&mut self, name: &str, body: &str) -> &mut Self {
        self.t.child(name).write_str(body).unwrap();
        self
    }

    /// Respond to requests for the document of `name` with `500 Internal Server Error`.
    pub fn fail(&mut self, name: &str) -> &mut Self {
        self.fail_with(name, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn fail_with(&mut self, name: &str, status: StatusCode) -> &mut Self {
        self.server
            .fail(format!("/{}", name.replacen('/', "%2F", 1)), status);
        self
    }

    /// Enable this when writing tests to see what requests are being made in the test.
    pub fn print_logs(&self) {
        self.server.print_logs(true);
    }

    pub fn logs(&self) -> String {
        let _guard = RUNTIME.enter();
        RUNTIME.block_on(async { self.server.logs_to_string().await })
    }

    pub fn requested_paths(&self) -> Vec<String> {
        let _guard = RUNTIME.enter();
        RUNTIME.block_on(async { self.server.requested_paths().await })
    }
}

impl fmt::Display for HttpRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}
