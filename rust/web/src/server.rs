use crate::handlers;
use crate::middleware::with_request_logging;
use crate::session::SessionManager;
use crate::settings::{LifecycleSettings, SettingsError};
use botserver_engine::registry::RuleRegistry;
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::hyper::body::Bytes;
use warp::reply::{Reply, Response};
use warp::Filter;

/// Largest request body accepted by `/hello` and `/play`.
const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    lifecycle: LifecycleSettings,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            lifecycle: LifecycleSettings::default(),
        }
    }

    /// Ephemeral localhost port with short lifecycle timings.
    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0).with_lifecycle(LifecycleSettings::for_tests())
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleSettings) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn lifecycle(&self) -> &LifecycleSettings {
        &self.lifecycle
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.lifecycle().validate()?;
        let sessions = Arc::new(SessionManager::new(
            RuleRegistry::with_defaults(),
            config.lifecycle().clone(),
        ));
        Ok(Self::new_with_dependencies(config, sessions))
    }

    pub fn new_with_dependencies(config: ServerConfig, sessions: Arc<SessionManager>) -> Self {
        Self { config, sessions }
    }

    pub fn new_for_tests() -> Self {
        let config = ServerConfig::for_tests();
        let sessions = Arc::new(SessionManager::new(
            RuleRegistry::with_defaults(),
            config.lifecycle().clone(),
        ));
        Self::new_with_dependencies(config, sessions)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid lifecycle settings: {0}")]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let context = AppContext::new(config)?;
        Ok(Self { context })
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(address = %addr, "bot server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    /// Every route of the bot API, wrapped in request logging.
    pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let routes = Self::health_route()
            .or(Self::hello_route(context))
            .unify()
            .or(Self::play_route(context))
            .unify()
            .or(Self::ws_route(context))
            .unify();

        with_request_logging(routes).boxed()
    }

    fn health_route() -> BoxedFilter<(Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response())
            .boxed()
    }

    fn hello_route(context: &AppContext) -> BoxedFilter<(Response,)> {
        warp::path!("hello")
            .and(warp::post())
            .and(Self::with_session_manager(context.sessions()))
            .and(Self::json_body())
            .and_then(|sessions: Arc<SessionManager>, body: Bytes| async move {
                Ok::<_, Infallible>(handlers::hello(sessions, body).await)
            })
            .boxed()
    }

    fn play_route(context: &AppContext) -> BoxedFilter<(Response,)> {
        warp::path!("play")
            .and(warp::post())
            .and(Self::with_session_manager(context.sessions()))
            .and(Self::json_body())
            .and_then(|sessions: Arc<SessionManager>, body: Bytes| async move {
                Ok::<_, Infallible>(handlers::play(sessions, body).await)
            })
            .boxed()
    }

    fn ws_route(context: &AppContext) -> BoxedFilter<(Response,)> {
        warp::path!("ws")
            .and(warp::get())
            .and(warp::query::<handlers::WsQuery>())
            .and(warp::ws())
            .and(Self::with_session_manager(context.sessions()))
            .map(
                |query: handlers::WsQuery, ws: warp::ws::Ws, sessions: Arc<SessionManager>| {
                    handlers::upgrade(sessions, query, ws)
                },
            )
            .boxed()
    }

    fn json_body() -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
        warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
    }

    fn with_session_manager(
        sessions: Arc<SessionManager>,
    ) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&sessions))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        tracing::info!(address = %self.addr, "bot server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
