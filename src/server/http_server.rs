use super::service::AppService;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// How long a worker blocks in `recv` before re-checking for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 4;

/// `tiny_http` front end serving an [`AppService`] on a pool of worker threads.
pub struct HttpServer {
    service: AppService,
    workers: usize,
}

/// Handle to a running HTTP server
///
/// Provides methods for waiting until the server is ready, stopping it gracefully,
/// or joining the worker threads.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the server is bound to (useful after binding port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't accept within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting requests and wait for in-flight ones to finish.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                error!("HTTP worker panicked");
            }
        }
        info!(addr = %self.addr, "HTTP server stopped");
    }

    /// Block until every worker exits (only after [`stop`](Self::stop) from
    /// another handle owner, or a worker failure).
    pub fn join(self) {
        for worker in self.workers {
            if worker.join().is_err() {
                error!("HTTP worker panicked");
            }
        }
    }

    /// Flag that stops the workers when set; for signal handlers.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(service: AppService) -> Self {
        Self {
            service,
            workers: DEFAULT_WORKERS,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Start the HTTP server on the given address
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = tiny_http::Server::http(addr).map_err(io::Error::other)?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));

        let workers = (0..self.workers)
            .map(|id| {
                let server = Arc::clone(&server);
                let shutdown = Arc::clone(&shutdown);
                let service = self.service.clone();
                thread::Builder::new()
                    .name(format!("specroute-http-{id}"))
                    .spawn(move || worker_loop(id, &server, &shutdown, &service))
            })
            .collect::<io::Result<Vec<_>>>()?;

        info!(addr = %addr, workers = workers.len(), "HTTP server listening");
        Ok(ServerHandle {
            addr,
            server,
            shutdown,
            workers,
        })
    }
}

fn worker_loop(id: usize, server: &tiny_http::Server, shutdown: &AtomicBool, service: &AppService) {
    debug!(worker = id, "HTTP worker started");
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => service.handle(request),
            Ok(None) => {}
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                debug!(worker = id, error = %e, "recv interrupted");
            }
        }
    }
    debug!(worker = id, "HTTP worker exiting");
}
