// TCP line client for talking to a battle server.
//
// `connect()` opens the socket and spawns a background reader thread. The
// reader splits incoming bytes into segments (on `\n` or `\r`), classifies
// each as a `ServerLine`, and pushes it into an `mpsc` channel. The calling
// thread keeps the write half and never blocks on network reads:
// `poll()` drains whatever has arrived, `recv_timeout()` waits for the next
// line. The channel disconnects when the server closes the socket, so a
// closed connection shows up as `RecvTimeoutError::Disconnected`.
//
// Used by the `skirmish-client` binary and the integration tests.

use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use skirmish_protocol::{ServerLine, read_segment, write_line};

pub struct LineClient {
    writer: TcpStream,
    inbox: Receiver<ServerLine>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl LineClient {
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let reader = BufReader::new(stream.try_clone()?);

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::Builder::new()
            .name("client-reader".into())
            .spawn(move || reader_loop(reader, tx))?;

        Ok(Self {
            writer: stream,
            inbox: rx,
            _reader_thread: Some(reader_thread),
        })
    }

    /// Send one newline-terminated line.
    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        write_line(&mut self.writer, line)
    }

    /// Drain every line received so far (non-blocking).
    pub fn poll(&self) -> Vec<ServerLine> {
        let mut lines = Vec::new();
        while let Ok(line) = self.inbox.try_recv() {
            lines.push(line);
        }
        lines
    }

    /// Wait up to `timeout` for the next line.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ServerLine, RecvTimeoutError> {
        self.inbox.recv_timeout(timeout)
    }

    /// Close both directions; the server sees EOF.
    pub fn disconnect(&self) {
        let _ = self.writer.shutdown(Shutdown::Both);
    }
}

/// Reader thread: classify segments until EOF or the receiver is dropped.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerLine>) {
    while let Ok(segment) = read_segment(&mut reader) {
        if tx.send(ServerLine::classify(segment)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use skirmish_protocol::read_line;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn classifies_and_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = LineClient::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        server
            .write_all(b"hello\nGame starts in 3s...\rINPUT Name: \n")
            .unwrap();
        assert_eq!(client.recv_timeout(WAIT).unwrap(), ServerLine::Text("hello".into()));
        assert!(matches!(client.recv_timeout(WAIT).unwrap(), ServerLine::Countdown(_)));
        assert_eq!(
            client.recv_timeout(WAIT).unwrap(),
            ServerLine::Prompt("Name: ".into())
        );

        client.send_line("Conan Orc").unwrap();
        assert_eq!(read_line(&mut server).unwrap(), "Conan Orc");
    }

    #[test]
    fn server_close_disconnects_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = LineClient::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(server);
        assert_eq!(client.recv_timeout(WAIT), Err(RecvTimeoutError::Disconnected));
        assert!(client.poll().is_empty());
    }
}
