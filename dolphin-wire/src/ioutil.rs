use dolphin_base::{conn_err, malformed_err, Error, Result};
use std::io::{ErrorKind as Io, Read, Write};

/// Whether a read ran to completion or stopped because the source had no
/// more bytes ready. Bytes read before the stop stay buffered in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamStatus {
    Ok,
    WouldBlock,
}

const READ_CHUNK: usize = 64 * 1024;

/// Buffered little-endian reader over any byte source. A source that
/// reports `WouldBlock` (or a read timeout) leaves whatever was read so far
/// in the buffer, so the caller can come back later and resume.
pub struct DataInputStream<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    reversed: bool,
}

impl<R: Read> DataInputStream<R> {
    pub fn new(inner: R) -> Self {
        DataInputStream {
            inner,
            buf: Vec::new(),
            pos: 0,
            reversed: false,
        }
    }

    /// Integers on this stream arrive big-endian and are swapped per element.
    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Bytes read from the source and not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
    }

    /// Reads until at least `n` bytes are buffered. Returns false when the
    /// source would block first.
    pub fn fill(&mut self, n: usize) -> Result<bool> {
        while self.buf.len() - self.pos < n {
            if self.pos > 0 && self.pos * 2 >= self.buf.len() {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }
            let old = self.buf.len();
            self.buf.resize(old + READ_CHUNK, 0);
            let got = self.inner.read(&mut self.buf[old..]);
            match got {
                Ok(0) => {
                    self.buf.truncate(old);
                    if old == self.pos {
                        return Err(conn_err("connection closed by peer"));
                    }
                    return Err(malformed_err(format!(
                        "stream ended with {} of {} bytes",
                        old - self.pos,
                        n
                    )));
                }
                Ok(k) => self.buf.truncate(old + k),
                Err(e) => {
                    self.buf.truncate(old);
                    match e.kind() {
                        Io::Interrupted => {}
                        Io::WouldBlock | Io::TimedOut => return Ok(false),
                        _ => return Err(Error::from_io(e)),
                    }
                }
            }
        }
        Ok(true)
    }

    /// Like [`Self::fill`] but treats a blocked source as a timeout.
    pub fn require(&mut self, n: usize) -> Result<()> {
        if self.fill(n)? {
            Ok(())
        } else {
            Err(conn_err(format!("timed out waiting for {} bytes", n)))
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.require(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.consume(N);
        if self.reversed {
            out.reverse();
        }
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take::<1>()?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    pub fn read_i128(&mut self) -> Result<i128> {
        Ok(i128::from_le_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    /// Raw bytes, never swapped.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.require(n)?;
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.consume(n);
        Ok(out)
    }

    /// Scans for `delim` in what is buffered, reading more as needed.
    /// Returns the bytes before it (the delimiter is consumed), or `None`
    /// when the source would block before the delimiter arrives.
    pub fn try_read_until(&mut self, delim: u8) -> Result<Option<Vec<u8>>> {
        let mut scanned = 0;
        loop {
            if let Some(i) = memchr::memchr(delim, &self.buf[self.pos + scanned..]) {
                let end = self.pos + scanned + i;
                let out = self.buf[self.pos..end].to_vec();
                self.consume(end - self.pos + 1);
                return Ok(Some(out));
            }
            scanned = self.buf.len() - self.pos;
            if !self.fill(scanned + 1)? {
                return Ok(None);
            }
        }
    }

    /// A NUL-terminated string.
    pub fn read_string(&mut self) -> Result<String> {
        match self.try_read_until(0)? {
            Some(bytes) => String::from_utf8(bytes).map_err(|e| malformed_err(format!("string is not utf-8: {}", e))),
            None => Err(conn_err("timed out reading a string")),
        }
    }

    /// A newline-terminated line without the newline.
    pub fn read_line(&mut self) -> Result<String> {
        match self.try_read_until(b'\n')? {
            Some(bytes) => String::from_utf8(bytes).map_err(|e| malformed_err(format!("line is not utf-8: {}", e))),
            None => Err(conn_err("timed out reading a line")),
        }
    }

    /// An i32 length followed by that many bytes.
    pub fn read_blob(&mut self) -> Result<Vec<u8>> {
        let n = self.read_i32()?;
        let n = usize::try_from(n).map_err(|_| malformed_err(format!("negative blob length {}", n)))?;
        self.read_bytes(n)
    }
}

/// Little-endian writer that buffers into memory and hands the bytes to
/// `inner` on [`Self::flush`]. With a `Vec<u8>` inner it doubles as an
/// in-memory encoder.
pub struct DataOutputStream<W> {
    inner: W,
    buf: Vec<u8>,
    reversed: bool,
}

impl<W: Write> DataOutputStream<W> {
    pub fn new(inner: W) -> Self {
        DataOutputStream {
            inner,
            buf: Vec::new(),
            reversed: false,
        }
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Bytes written since the last flush.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    fn put<const N: usize>(&mut self, mut bytes: [u8; N]) {
        if self.reversed {
            bytes.reverse();
        }
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.put(v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.put(v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.put(v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.put(v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.put(v.to_le_bytes());
    }

    pub fn write_i128(&mut self, v: i128) {
        self.put(v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.put(v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.put(v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// `s` followed by a NUL.
    pub fn write_string(&mut self, s: &[u8]) {
        self.buf.extend_from_slice(s);
        self.buf.push(0);
    }

    pub fn write_blob(&mut self, b: &[u8]) -> Result<()> {
        let n = i32::try_from(b.len()).map_err(|_| malformed_err(format!("blob of {} bytes too long", b.len())))?;
        self.write_i32(n);
        self.buf.extend_from_slice(b);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.write_all(&self.buf).map_err(Error::from_io)?;
        self.buf.clear();
        self.inner.flush().map_err(Error::from_io)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}
