//! Per-connection task: a minimal HTTP/1.1 responder.
//!
//! Not an HTTP implementation. Normal mode reads up to the end of the
//! request head and answers `200 OK`; rejected mode answers
//! `503 Service Unavailable` straight away. Either way the connection
//! is closed after one response.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use admit_pool::{Task, TaskError, TaskResult};

const RECV_BUF_SIZE: usize = 4096;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub static SERVED: AtomicU64 = AtomicU64::new(0);
pub static REJECTED: AtomicU64 = AtomicU64::new(0);

const HELLO_BODY: &[u8] = b"Hello from admit-httpd!\n";
const BUSY_BODY: &[u8] = b"Server busy, retry shortly.\n";

fn make_response(status: &str, extra_headers: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         Server: admit-httpd\r\n\
         {}\
         \r\n",
        status,
        body.len(),
        extra_headers,
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

pub fn hello_response() -> Vec<u8> {
    make_response("200 OK", "", HELLO_BODY)
}

pub fn busy_response() -> Vec<u8> {
    make_response("503 Service Unavailable", "Retry-After: 1\r\n", BUSY_BODY)
}

/// True once `buf` holds a full request head.
pub fn has_complete_request(buf: &[u8]) -> bool {
    buf.len() >= 4 && buf.windows(4).any(|w| w == b"\r\n\r\n")
}

/// One accepted connection.
pub struct HttpTask {
    stream: TcpStream,
    peer: SocketAddr,
    /// Simulated handler latency in normal mode.
    work: Duration,
}

impl HttpTask {
    pub fn new(stream: TcpStream, peer: SocketAddr, work: Duration) -> Self {
        HttpTask { stream, peer, work }
    }

    fn serve(mut self) -> TaskResult {
        self.stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut buf = [0u8; RECV_BUF_SIZE];
        let mut len = 0;
        while !has_complete_request(&buf[..len]) {
            if len == buf.len() {
                return Err(TaskError::failed(format!(
                    "{}: request head exceeds {} bytes",
                    self.peer, RECV_BUF_SIZE
                )));
            }
            let n = self.stream.read(&mut buf[len..])?;
            if n == 0 {
                // Client went away before finishing the request.
                return Ok(());
            }
            len += n;
        }

        if !self.work.is_zero() {
            std::thread::sleep(self.work);
        }

        self.stream.write_all(&hello_response())?;
        let _ = self.stream.shutdown(Shutdown::Write);
        SERVED.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn refuse(mut self) -> TaskResult {
        // Best effort: swallow whatever request bytes already arrived so
        // closing does not reset the connection before the 503 is read.
        let mut scratch = [0u8; RECV_BUF_SIZE];
        if self.stream.set_nonblocking(true).is_ok() {
            let _ = self.stream.read(&mut scratch);
            self.stream.set_nonblocking(false)?;
        }

        self.stream.write_all(&busy_response())?;
        let _ = self.stream.shutdown(Shutdown::Write);
        REJECTED.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Task for HttpTask {
    fn invoke(self: Box<Self>, rejected: bool) -> TaskResult {
        if rejected {
            (*self).refuse()
        } else {
            (*self).serve()
        }
    }

    fn label(&self) -> &str {
        "http-conn"
    }
}
