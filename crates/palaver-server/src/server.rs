//! Process-wide state and the TCP accept loop.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::net::{TcpListener, TcpSocket};
use tracing::{error, info, warn};

use palaver_store::{Database, StoreError};

use crate::activity::ActivityLog;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::roster::{Roster, SessionId};
use crate::session;

/// Everything a session task needs, shared behind one `Arc`.
///
/// The store, roster and activity mutexes are component-local and
/// independent; no code path holds two of them at once.
pub struct ServerState {
    pub config: ServerConfig,
    store: Mutex<Database>,
    pub roster: Roster,
    pub activity: ActivityLog,
    next_session_id: AtomicU64,
}

impl ServerState {
    /// Open the persistent store and activity log. A failure here is
    /// a startup failure and aborts the server.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>> {
        let store = Database::open_at(&config.db_path)?;
        let activity = ActivityLog::open(&config.log_path)?;
        Ok(Arc::new(Self {
            config,
            store: Mutex::new(store),
            roster: Roster::new(),
            activity,
            next_session_id: AtomicU64::new(1),
        }))
    }

    /// Serialized handle to the store. Callers must release the guard
    /// before touching the roster; never hold it across socket I/O.
    pub fn store(&self) -> MutexGuard<'_, Database> {
        // A poisoned lock means a session task panicked mid-query;
        // the database connection itself is still valid.
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn next_session_id(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Map a store result onto the wire success flag, logging real
/// SQLite faults as persistence failures.
pub(crate) fn store_flag(result: std::result::Result<bool, StoreError>, op: &str) -> bool {
    match result {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, op, "store operation failed");
            false
        }
    }
}

/// Bind the listening socket with address reuse and a backlog equal
/// to the session cap.
pub fn bind(config: &ServerConfig) -> io::Result<TcpListener> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, config.port).into();
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(config.max_sessions as u32)
}

/// Accept connections forever, one session task each.
///
/// Admission control: when the roster is at the cap, the socket is
/// closed right after accept, without any frame. Accept errors are
/// logged and the loop continues.
pub async fn serve(state: Arc<ServerState>, listener: TcpListener) -> io::Result<()> {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "failed to accept connection");
                continue;
            }
        };

        if state.roster.len() >= state.config.max_sessions {
            warn!(%addr, cap = state.config.max_sessions, "session cap reached, rejecting connection");
            drop(stream);
            continue;
        }

        info!(%addr, "new connection");
        let id = state.next_session_id();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            session::run(state, stream, addr, id).await;
        });
    }
}
