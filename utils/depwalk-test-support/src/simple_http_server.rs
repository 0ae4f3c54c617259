use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use itertools::Itertools;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;

/// Key is request count from logger middleware. Keeping logs in ordered map allows sorting logs by
/// request incoming time, not by response outgoing one.
type LogsStore = Arc<Mutex<BTreeMap<u32, HttpLog>>>;

type LoggerState = (LogsStore, Arc<AtomicBool>);

/// Raw request paths which should be answered with the given status instead of file contents.
pub type FailuresStore = Arc<RwLock<HashMap<String, StatusCode>>>;

/// Static file server with request logging and failure injection.
pub struct SimpleHttpServer {
    addr: SocketAddr,
    print_logs: Arc<AtomicBool>,
    logs: LogsStore,
    failures: FailuresStore,
    ct: Option<tokio::sync::oneshot::Sender<()>>,
}

pub struct HttpLog {
    pub req_method: Method,
    pub req_uri: String,
    pub res_status: StatusCode,
}

impl SimpleHttpServer {
    /// Serve files from `dir`. Must be called within a tokio runtime context.
    pub fn serve(dir: PathBuf) -> Self {
        let (ct, ctrx) = tokio::sync::oneshot::channel::<()>();

        let print_logs = Arc::new(AtomicBool::new(false));
        let logs: LogsStore = Default::default();
        let failures: FailuresStore = Default::default();

        let app = Router::new()
            .fallback_service(ServeDir::new(dir))
            .layer(middleware::from_fn_with_state(
                failures.clone(),
                inject_failures,
            ))
            .layer(middleware::from_fn_with_state(
                (logs.clone(), print_logs.clone()),
                logger,
            ));

        let tcp = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = tcp.local_addr().unwrap();
        let server = axum::Server::from_tcp(tcp)
            .unwrap()
            .serve(app.into_make_service());

        tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async {
                ctrx.await.ok();
            });

            let _ = graceful.await;
        });

        Self {
            addr,
            print_logs,
            logs,
            failures,
            ct: Some(ct),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Respond to requests for `path` (as sent on the wire, percent-encoding included) with
    /// `status`.
    pub fn fail(&self, path: impl Into<String>, status: StatusCode) {
        self.failures.write().unwrap().insert(path.into(), status);
    }

    /// Enable this when writing tests to see what requests are being made in the test.
    pub fn print_logs(&self, enable: bool) {
        self.print_logs.store(enable, Ordering::Relaxed);
    }

    pub async fn logs_to_string(&self) -> String {
        let logs = self.logs.lock().await;
        logs.values().map(ToString::to_string).join("\n")
    }

    /// Request paths of all requests made so far, sorted.
    pub async fn requested_paths(&self) -> Vec<String> {
        let logs = self.logs.lock().await;
        logs.values().map(|log| log.req_uri.clone()).sorted().collect()
    }
}

impl Drop for SimpleHttpServer {
    fn drop(&mut self) {
        let _ = self.ct.take().map(|ct| ct.send(()));
    }
}

async fn inject_failures<B>(
    State(failures): State<FailuresStore>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let status = failures
        .read()
        .unwrap()
        .get(request.uri().path())
        .copied();
    match status {
        Some(status) => (status, "injected failure").into_response(),
        None => next.run(request).await,
    }
}

async fn logger<B>(
    State((logs, print_logs)): State<LoggerState>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    let print_logs = print_logs.load(Ordering::Relaxed);

    if print_logs {
        eprintln!(
            "http[{count}]: {method} {uri}",
            method = request.method(),
            uri = request.uri()
        );
    }

    let req_method = request.method().clone();
    let req_uri = request.uri().to_string();

    let response = next.run(request).await;

    if print_logs {
        eprintln!("http[{count}]: {status}", status = response.status());
    }

    let log = HttpLog {
        req_method,
        req_uri,
        res_status: response.status(),
    };

    {
        let mut logs = logs.lock().await;
        logs.insert(count, log);
    }

    response
}

impl fmt::Display for HttpLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{method} {uri} -> {status}",
            method = self.req_method,
            uri = self.req_uri,
            status = self.res_status
        )
    }
}
