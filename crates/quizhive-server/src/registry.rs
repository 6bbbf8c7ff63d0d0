use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;

use quizhive_core::{ConnectionId, GameCode, GameEvent};

/// Transport bookkeeping for one socket: which game it watches and the
/// bounded queue its writer task drains.
struct ConnectionHandle {
    game: GameCode,
    tx: mpsc::Sender<String>,
}

/// Registry of live player connections, bucketed by game for fanout.
///
/// Knows nothing about sessions or players; it moves serialized frames onto
/// per-connection queues and that is all. Sends never block: a full queue
/// drops the frame with a warning so one slow consumer cannot stall a game,
/// and a vanished connection is a silent no-op since disconnects race with
/// broadcasts.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    games: DashMap<GameCode, Vec<ConnectionId>>,
    max_send_queue: usize,
}

impl ConnectionRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            connections: DashMap::new(),
            games: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a connection under a game and return its id plus the
    /// receiving end of its outbound queue.
    pub fn register(&self, game: GameCode) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.connections.insert(
            id.clone(),
            ConnectionHandle {
                game: game.clone(),
                tx,
            },
        );
        self.games.entry(game).or_default().push(id.clone());
        (id, rx)
    }

    /// Drop a connection. Closing its queue ends the writer task; an empty
    /// game bucket is pruned. Unknown ids are ignored.
    pub fn unregister(&self, id: &ConnectionId) {
        let Some((_, handle)) = self.connections.remove(id) else {
            return;
        };
        if let Entry::Occupied(mut bucket) = self.games.entry(handle.game) {
            bucket.get_mut().retain(|c| c != id);
            if bucket.get().is_empty() {
                bucket.remove();
            }
        }
    }

    /// Queue a frame for one connection. False when the connection is gone
    /// or its queue is full.
    pub fn send_to(&self, id: &ConnectionId, message: String) -> bool {
        let Some(handle) = self.connections.get(id) else {
            return false;
        };
        match handle.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    connection_id = %id,
                    msg_len = msg.len(),
                    "send queue full, dropping frame"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Serialize an event for one connection.
    pub fn send_event(&self, id: &ConnectionId, event: &GameEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send_to(id, json),
            Err(_) => false,
        }
    }

    /// Queue a frame for every connection watching a game, best effort.
    pub fn broadcast(&self, game: &GameCode, message: &str) {
        let Some(bucket) = self.games.get(game) else {
            return;
        };
        for id in bucket.iter() {
            self.send_to(id, message.to_string());
        }
    }

    /// Serialize an event once and fan it out to a game.
    pub fn broadcast_event(&self, game: &GameCode, event: &GameEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            self.broadcast(game, &json);
        }
    }

    /// Number of live connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Number of live connections watching one game.
    pub fn count_for_game(&self, game: &GameCode) -> usize {
        self.games.get(game).map_or(0, |bucket| bucket.len())
    }
}
