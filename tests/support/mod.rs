#![allow(dead_code)]

//! Shared fixtures: scripted collaborators and a fully wired gateway app.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use url::Url;

use wardgate::config::{UnsafeUrlPolicy, UploadConfig};
use wardgate::error::UploadError;
use wardgate::gateway::AppState;
use wardgate::keyfiles::KeyFileServer;
use wardgate::security::{Resolver, UrlSafetyGuard};
use wardgate::store::UserStore;
use wardgate::upload::UploadOrchestrator;
use wardgate::upload::fetcher::{BodyStream, FetchOutcome, ImageFetcher};

/// Fixed-answer resolver: `cdn.example.com` is public, `intranet.example.com`
/// is private, everything else fails to resolve.
pub struct MockResolver;

impl Resolver for MockResolver {
    fn resolve_all<'a>(
        &'a self,
        host: &'a str,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<Vec<IpAddr>>> + Send + 'a>> {
        Box::pin(async move {
            match host {
                "cdn.example.com" => Ok(vec![IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))]),
                "intranet.example.com" => Ok(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))]),
                _ => Err(std::io::Error::other("no such host")),
            }
        })
    }
}

/// Scripted fetcher: one programmed `(status, body)` per URL, call-counted.
pub struct ScriptedFetcher {
    responses: HashMap<String, (u16, Vec<u8>)>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new(responses: &[(&str, u16, &[u8])]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(url, status, body)| ((*url).to_string(), (*status, body.to_vec())))
                .collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl ImageFetcher for ScriptedFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, UploadError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.responses.get(url.as_str()).cloned();
        Box::pin(async move {
            let (status, bytes) =
                scripted.ok_or_else(|| UploadError::FetchFailed("unscripted url".into()))?;
            let body: BodyStream = Box::pin(futures_util::stream::iter([Ok(bytes)]));
            Ok(FetchOutcome {
                status,
                redirect: None,
                body,
            })
        })
    }
}

/// Everything a gateway test needs, with tempdirs kept alive.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<UserStore>,
    pub key_files_dir: TempDir,
    pub uploads_dir: TempDir,
    pub fetch_calls: Arc<AtomicUsize>,
}

pub async fn test_app(responses: &[(&str, u16, &[u8])], policy: UnsafeUrlPolicy) -> TestApp {
    let key_files_dir = TempDir::new().expect("tempdir");
    let uploads_dir = TempDir::new().expect("tempdir");

    let store = Arc::new(UserStore::open_in_memory().await.expect("store"));
    let guard = UrlSafetyGuard::with_resolver(Arc::new(MockResolver), Duration::from_secs(1));
    let fetcher = ScriptedFetcher::new(responses);
    let fetch_calls = fetcher.call_counter();
    let config = UploadConfig {
        on_unsafe_url: policy,
        ..UploadConfig::default()
    };
    let uploads = Arc::new(
        UploadOrchestrator::new(
            guard,
            Arc::new(fetcher),
            store.clone(),
            uploads_dir.path().to_path_buf(),
            &config,
        )
        .expect("orchestrator"),
    );
    let key_files = Arc::new(KeyFileServer::new(key_files_dir.path().to_path_buf()));

    TestApp {
        state: AppState {
            store: store.clone(),
            uploads,
            key_files,
        },
        store,
        key_files_dir,
        uploads_dir,
        fetch_calls,
    }
}

/// Serve `state` on an ephemeral loopback port; returns the base URL.
pub async fn spawn_gateway(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, wardgate::gateway::router(state))
            .await
            .expect("serve");
    });
    format!("http://{addr}")
}
