// Connection table: one slot per accepted TCP peer.
//
// A slot holds the stream behind an `Arc` so callers can take a handle under
// the session lock and do the actual network I/O after releasing it
// (`&TcpStream` implements both `Read` and `Write`). Closing a slot shuts the
// socket down in both directions, which also unblocks any thread still
// reading from a cloned handle.
//
// Positions in the table are stable from setup onward: after the lobby,
// slots are only ever marked closed, never removed, because combatants store
// their slot position. `remove` exists for the lobby only, where no position
// has been handed out yet.

use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use skirmish_protocol::{RosterIndex, SlotId};

/// One accepted peer.
#[derive(Debug)]
pub struct ConnectionSlot {
    id: SlotId,
    stream: Option<Arc<TcpStream>>,
    roster_index: Option<RosterIndex>,
}

impl ConnectionSlot {
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<Arc<TcpStream>> {
        self.stream.clone()
    }

    pub fn roster_index(&self) -> Option<RosterIndex> {
        self.roster_index
    }

    fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConnectionTable {
    slots: Vec<ConnectionSlot>,
    next_id: u32,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot for a freshly accepted stream.
    pub fn admit(&mut self, stream: TcpStream) -> (SlotId, Arc<TcpStream>) {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        let stream = Arc::new(stream);
        self.slots.push(ConnectionSlot {
            id,
            stream: Some(stream.clone()),
            roster_index: None,
        });
        (id, stream)
    }

    /// Drop a slot from the table entirely, closing it if still open.
    /// Lobby only: shifts the positions of later slots.
    pub fn remove(&mut self, id: SlotId) -> bool {
        match self.position_of(id) {
            Some(pos) => {
                let mut slot = self.slots.remove(pos);
                slot.close();
                true
            }
            None => false,
        }
    }

    /// Mark a slot closed, keeping its position. Returns false if it was
    /// already closed or unknown.
    pub fn close(&mut self, id: SlotId) -> bool {
        self.slots
            .iter_mut()
            .find(|s| s.id == id)
            .is_some_and(ConnectionSlot::close)
    }

    pub fn close_at(&mut self, position: usize) -> bool {
        self.slots.get_mut(position).is_some_and(ConnectionSlot::close)
    }

    /// Close every slot. Returns how many were still open.
    pub fn close_all(&mut self) -> usize {
        self.slots.iter_mut().map(ConnectionSlot::close).filter(|&closed| closed).count()
    }

    pub fn position_of(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn slot_at(&self, position: usize) -> Option<&ConnectionSlot> {
        self.slots.get(position)
    }

    pub fn stream_at(&self, position: usize) -> Option<Arc<TcpStream>> {
        self.slots.get(position).and_then(ConnectionSlot::stream)
    }

    pub fn is_open_at(&self, position: usize) -> bool {
        self.slots.get(position).is_some_and(ConnectionSlot::is_open)
    }

    pub fn set_roster_index(&mut self, id: SlotId, index: RosterIndex) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.roster_index = Some(index);
        }
    }

    pub fn slots(&self) -> &[ConnectionSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots whose peer is still connected.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_open()).count()
    }

    /// Handles for every open slot, for I/O outside the lock.
    pub fn open_streams(&self) -> Vec<(SlotId, Arc<TcpStream>)> {
        self.slots
            .iter()
            .filter_map(|s| s.stream.clone().map(|stream| (s.id, stream)))
            .collect()
    }

    /// Switch every open slot's blocking mode. Slots whose socket refuses
    /// the change are closed; their ids are returned.
    pub fn set_nonblocking_all(&mut self, nonblocking: bool) -> Vec<SlotId> {
        let mut failed = Vec::new();
        for slot in &mut self.slots {
            let result: io::Result<()> = match slot.stream {
                Some(ref stream) => stream.set_nonblocking(nonblocking),
                None => continue,
            };
            if result.is_err() {
                slot.close();
                failed.push(slot.id);
            }
        }
        failed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Read;
    use std::net::TcpListener;

    use super::*;

    /// Create a TCP pair: (client_stream, server_stream) on localhost.
    pub(crate) fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn admit_assigns_increasing_ids() {
        let mut table = ConnectionTable::new();
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let (a, _) = table.admit(s1);
        let (b, _) = table.admit(s2);
        assert_eq!(a, SlotId(0));
        assert_eq!(b, SlotId(1));
        assert_eq!(table.open_count(), 2);
    }

    #[test]
    fn close_keeps_position_and_signals_peer() {
        let mut table = ConnectionTable::new();
        let (mut client, server) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let (a, _) = table.admit(server);
        let (b, _) = table.admit(s2);

        assert!(table.close(a));
        assert!(!table.close(a), "second close is a no-op");
        assert_eq!(table.len(), 2);
        assert_eq!(table.position_of(b), Some(1));
        assert_eq!(table.open_count(), 1);
        assert!(!table.is_open_at(0));

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).unwrap(), 0, "peer sees EOF");
    }

    #[test]
    fn remove_shifts_positions() {
        let mut table = ConnectionTable::new();
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let (a, _) = table.admit(s1);
        let (b, _) = table.admit(s2);
        assert!(table.remove(a));
        assert_eq!(table.position_of(b), Some(0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn occupancy_tracks_admits_and_departures() {
        let mut table = ConnectionTable::new();
        let mut pairs = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let (client, server) = tcp_pair();
            pairs.push(client);
            ids.push(table.admit(server).0);
        }
        table.remove(ids[1]);
        table.close(ids[2]);
        let open = table.slots().iter().filter(|s| s.is_open()).count();
        assert_eq!(table.open_count(), open);
        assert_eq!(table.open_count(), 2);
        assert_eq!(table.open_streams().len(), 2);
        assert_eq!(table.close_all(), 2);
        assert_eq!(table.open_count(), 0);
    }
}
