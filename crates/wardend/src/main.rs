//! wardend - The warden background service
//!
//! This is the main entry point for the wardend service.
//! It wires together all the components:
//! - Configuration loading
//! - Policy store initialization
//! - Policy engine
//! - Linux app catalog and enforcer
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use warden_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, PolicyView, Response, ResponsePayload,
};
use warden_config::{load_config, Settings};
use warden_core::{CoreError, DecisionTracker, Matcher, MergeOutcome, PolicyEngine};
use warden_host_api::{AppCatalog, Enforcer};
use warden_host_linux::{LinuxCatalog, TracingEnforcer};
use warden_ipc::{IpcServer, ServerMessage};
use warden_store::{JsonFileBackend, PolicyStore};
use warden_util::{default_config_path, ClientId, RateLimiter, WardenError};

type Engine = PolicyEngine<JsonFileBackend>;

/// wardend - Distraction blocking service
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "Distraction blocking policy service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/warden/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set WARDEN_SOCKET env var)
    #[arg(short, long, env = "WARDEN_SOCKET")]
    socket: Option<PathBuf>,

    /// Policy document path override (or set WARDEN_POLICY env var)
    #[arg(short, long, env = "WARDEN_POLICY")]
    policy: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: Engine,
    catalog: Arc<LinuxCatalog>,
    enforcer: Arc<dyn Enforcer>,
    ipc: Arc<IpcServer>,
    rate_limiter: RateLimiter,
    tick_interval: Duration,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings = if args.config.exists() {
            load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            info!(config_path = %args.config.display(), "No config file, using defaults");
            Settings::default()
        };

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.daemon.socket_path.clone());

        let policy_path = args
            .policy
            .clone()
            .unwrap_or_else(|| settings.daemon.policy_path.clone());

        let store = PolicyStore::new(JsonFileBackend::new(&policy_path));
        let doc = store
            .load_or_create(&settings.initial_policy)
            .with_context(|| format!("Failed to open policy {:?}", policy_path))?;

        info!(
            policy_path = %policy_path.display(),
            blocklist = doc.blocklist.len(),
            whitelist = doc.whitelist.len(),
            shield = doc.shield,
            "Policy loaded"
        );

        let catalog = Arc::new(LinuxCatalog::new());
        let engine = PolicyEngine::new(store, catalog.clone());

        let ipc = IpcServer::bind(&socket_path)
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;

        let rate_limiter = RateLimiter::new(
            settings.daemon.rate_limit_per_second,
            Duration::from_secs(1),
        );

        Ok(Self {
            engine,
            catalog,
            enforcer: Arc::new(TracingEnforcer::new()),
            ipc: Arc::new(ipc),
            rate_limiter,
            tick_interval: settings.daemon.tick_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        // Wrap mutable state
        let engine = Arc::new(Mutex::new(self.engine));
        let tracker = Arc::new(Mutex::new(DecisionTracker::new()));
        let rate_limiter = Arc::new(Mutex::new(self.rate_limiter));
        let catalog = self.catalog.clone();
        let enforcer = self.enforcer.clone();

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move { ipc_accept.run().await });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let mut tick_timer = tokio::time::interval(self.tick_interval);

        info!(tick_interval = ?self.tick_interval, "Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Re-evaluate running apps and watched domains
                _ = tick_timer.tick() => {
                    Self::evaluate(&engine, &tracker, catalog.as_ref(), enforcer.as_ref(), &ipc_ref).await;
                }

                Some(msg) = ipc_messages.recv() => {
                    let changed = Self::handle_ipc_message(&engine, &ipc_ref, &rate_limiter, msg).await;
                    if changed {
                        Self::evaluate(&engine, &tracker, catalog.as_ref(), enforcer.as_ref(), &ipc_ref).await;
                    }
                }
            }
        }

        info!("Shutting down wardend");
        Self::release_all(&tracker, enforcer.as_ref()).await;
        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));
        ipc_ref.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    /// Compile the policy, update tracked decisions and forward any flips
    async fn evaluate(
        engine: &Arc<Mutex<Engine>>,
        tracker: &Arc<Mutex<DecisionTracker>>,
        catalog: &dyn AppCatalog,
        enforcer: &dyn Enforcer,
        ipc: &Arc<IpcServer>,
    ) {
        let now = warden_util::now_epoch();

        let (matcher, doc) = {
            let engine = engine.lock().await;
            match engine.policy(now) {
                Ok(doc) => (Matcher::compile(&doc, now), doc),
                Err(e) => {
                    warn!(error = %e, "Failed to load policy for evaluation");
                    return;
                }
            }
        };

        let mut observed: BTreeSet<String> = match catalog.running_apps() {
            Ok(apps) => apps,
            Err(e) => {
                warn!(error = %e, "Failed to list running apps");
                BTreeSet::new()
            }
        };
        observed.extend(
            doc.blocklist_names()
                .chain(doc.whitelist_names())
                .filter(|name| name.contains('.') && !name.contains('*'))
                .map(String::from),
        );

        let changes = tracker.lock().await.update(observed, &matcher, now);

        for change in changes {
            if let Err(e) = enforcer.on_block_decision_changed(&change.name, change.blocked) {
                warn!(name = %change.name, error = %e, "Enforcer failed");
            }
            ipc.broadcast_event(Event::new(EventPayload::BlockDecisionChanged {
                name: change.name,
                blocked: change.blocked,
            }));
        }
    }

    /// Lift every block still in force before exiting
    async fn release_all(tracker: &Arc<Mutex<DecisionTracker>>, enforcer: &dyn Enforcer) {
        let tracker = tracker.lock().await;
        for name in tracker.blocked() {
            if let Err(e) = enforcer.on_block_decision_changed(name, false) {
                warn!(name = %name, error = %e, "Enforcer failed to release block");
            }
        }
    }

    /// Returns true when the policy was modified
    async fn handle_ipc_message(
        engine: &Arc<Mutex<Engine>>,
        ipc: &Arc<IpcServer>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) -> bool {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return false;
                    }
                }

                let (response, changed) =
                    Self::handle_command(engine, &client_id, request.request_id, request.command).await;

                let _ = ipc.send_response(&client_id, response).await;

                if let Some(view) = changed {
                    ipc.broadcast_event(Event::new(EventPayload::PolicyChanged(view)));
                    return true;
                }
                false
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(client_id = %client_id, uid = ?info.uid, "Client connected");
                false
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let mut limiter = rate_limiter.lock().await;
                limiter.remove(&client_id);
                false
            }
        }
    }

    /// Run a command against the engine. The second element is the new
    /// policy view when the command actually changed the document.
    async fn handle_command(
        engine: &Arc<Mutex<Engine>>,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> (Response, Option<PolicyView>) {
        let now = warden_util::now_epoch();
        let engine = engine.lock().await;

        let result = match command {
            Command::Block { name, time } => {
                engine.block(&name, time.as_deref(), now).map(|outcome| {
                    let entry = outcome
                        .document
                        .blocklist
                        .iter()
                        .rfind(|e| e.name == name)
                        .cloned();
                    let payload = match entry {
                        Some(entry) if outcome.fully_applied() => ResponsePayload::Blocked { entry },
                        _ => policy_updated(&outcome),
                    };
                    (payload, changed_view(&outcome))
                })
            }

            Command::Unblock { name, password } => engine
                .unblock(&name, password.as_deref(), now)
                .map(mutation),

            Command::Allow { name, password } => engine
                .allow(&name, password.as_deref(), now)
                .map(mutation),

            Command::Disallow { name } => engine.disallow(&name, now).map(mutation),

            Command::EnableShield { password } => engine.enable_shield(&password, now).map(mutation),

            Command::DisableShield { password } => {
                engine.disable_shield(&password, now).map(mutation)
            }

            Command::IsBlocked { name } => engine
                .is_blocked(&name, now)
                .map(|blocked| (ResponsePayload::Decision { name, blocked }, None)),

            Command::GetPolicy => engine
                .policy(now)
                .map(|doc| (ResponsePayload::Policy(PolicyView::from(&doc)), None)),

            Command::SubscribeEvents => Ok((
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
                None,
            )),

            Command::Ping => Ok((ResponsePayload::Pong, None)),
        };

        match result {
            Ok((payload, changed)) => (Response::success(request_id, payload), changed),
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "Command failed");
                (Response::error(request_id, error_info(e)), None)
            }
        }
    }
}

fn policy_updated(outcome: &MergeOutcome) -> ResponsePayload {
    ResponsePayload::PolicyUpdated {
        policy: PolicyView::from(&outcome.document),
        rejected: outcome.rejected.iter().copied().collect(),
    }
}

fn changed_view(outcome: &MergeOutcome) -> Option<PolicyView> {
    outcome.changed.then(|| PolicyView::from(&outcome.document))
}

fn mutation(outcome: MergeOutcome) -> (ResponsePayload, Option<PolicyView>) {
    (policy_updated(&outcome), changed_view(&outcome))
}

fn error_info(e: CoreError) -> ErrorInfo {
    let e = WardenError::from(e);
    let code = match &e {
        WardenError::PolicyNotFound(_) => ErrorCode::PolicyNotFound,
        WardenError::PolicyCorrupt(_) => ErrorCode::PolicyCorrupt,
        WardenError::InvalidDistraction(_) | WardenError::InvalidTimeFormat(_) => {
            ErrorCode::InvalidDistraction
        }
        WardenError::StoreError(_) => ErrorCode::StoreError,
        WardenError::RateLimited => ErrorCode::RateLimited,
        _ => ErrorCode::InternalError,
    };
    ErrorInfo::new(code, e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "wardend starting"
    );

    let service = Service::new(&args).await?;
    service.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_api::{DistractionEntry, PolicyDocument, RejectedField};

    fn outcome(changed: bool, rejected: BTreeSet<RejectedField>) -> MergeOutcome {
        MergeOutcome {
            document: PolicyDocument {
                blocklist: vec![DistractionEntry::new("example.com")],
                ..Default::default()
            },
            rejected,
            changed,
        }
    }

    #[test]
    fn unchanged_policy_is_not_broadcast() {
        let rejected = BTreeSet::from([RejectedField::BlocklistRemoval]);
        let (payload, view) = mutation(outcome(false, rejected));
        assert!(view.is_none());
        assert!(matches!(
            payload,
            ResponsePayload::PolicyUpdated { ref rejected, .. } if rejected == &[RejectedField::BlocklistRemoval]
        ));
    }

    #[test]
    fn changed_policy_is_broadcast() {
        let (_, view) = mutation(outcome(true, BTreeSet::new()));
        assert_eq!(view, Some(PolicyView::from(&outcome(true, BTreeSet::new()).document)));
    }
}
