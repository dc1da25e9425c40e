#![allow(dead_code)]
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{body::Incoming as IncomingBody, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub trait ServiceFactory {
    type ServiceType: Service<
            Request<IncomingBody>,
            Response = Response<Full<Bytes>>,
            Error = hyper::Error,
        > + Send
        + 'static;

    fn create_service(&self) -> Self::ServiceType;
}

/// Answers `/` with 200 and everything else with 404. Counts requests.
#[derive(Clone, Default)]
pub struct TestService {
    pub head_requests: Arc<AtomicUsize>,
    pub get_requests: Arc<AtomicUsize>,
}

#[derive(Clone, Default)]
pub struct TestServiceFactory {
    pub head_requests: Arc<AtomicUsize>,
    pub get_requests: Arc<AtomicUsize>,
}

impl TestServiceFactory {
    pub fn head_count(&self) -> usize {
        self.head_requests.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.get_requests.load(Ordering::SeqCst)
    }
}

impl ServiceFactory for TestServiceFactory {
    type ServiceType = TestService;

    fn create_service(&self) -> Self::ServiceType {
        TestService {
            head_requests: Arc::clone(&self.head_requests),
            get_requests: Arc::clone(&self.get_requests),
        }
    }
}

impl Service<Request<IncomingBody>> for TestService {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<IncomingBody>) -> Self::Future {
        fn response(
            status: hyper::StatusCode,
            s: &'static str,
        ) -> Result<Response<Full<Bytes>>, hyper::Error> {
            Ok(Response::builder()
                .status(status)
                .body(Full::new(Bytes::from(s)))
                .unwrap())
        }

        match *req.method() {
            hyper::Method::HEAD => {
                self.head_requests.fetch_add(1, Ordering::SeqCst);
            }
            hyper::Method::GET => {
                self.get_requests.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }

        let res = match req.uri().path() {
            "/" => response(hyper::StatusCode::OK, "here"),
            // Return the 404 Not Found for other routes.
            _ => response(hyper::StatusCode::NOT_FOUND, "not found"),
        };

        Box::pin(async { res })
    }
}

/// Bind an ephemeral loopback port and serve connections from `factory`
/// until the runtime shuts down.
pub async fn spawn_service<F>(factory: F) -> anyhow::Result<SocketAddr>
where
    F: ServiceFactory + Send + 'static,
    <<F as ServiceFactory>::ServiceType as Service<
        hyper::Request<hyper::body::Incoming>,
    >>::Future: Send,
{
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let io = TokioIo::new(stream);
            let service = factory.create_service();
            tokio::task::spawn(async move {
                if let Err(err) =
                    http1::Builder::new().serve_connection(io, service).await
                {
                    println!("Failed to serve connection: {:?}", err);
                }
            });
        }
    });

    Ok(addr)
}

/// A loopback port that accepts connections and never answers. The accepted
/// sockets are held open until the test process exits.
pub fn silent_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    addr
}

/// A loopback port nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
