use tokio::io::{AsyncRead, AsyncReadExt};

use lpwrite_api::Record;

const RECORD_TERMINATOR: u8 = b'\n';
const READ_CHUNK: usize = 8192;

/// Splits a byte source into line protocol records.
///
/// Records keep their terminator, so concatenating everything produced
/// reproduces the source byte for byte. There is no line length ceiling:
/// the buffer grows until a terminator or end of stream is seen. A
/// trailing record without terminator is still emitted if non-empty.
///
/// The source is borrowed for reading only and never closed here.
pub struct RecordReader<R> {
    source: R,
    buf: Vec<u8>,
    /// Start of the first record not yet emitted.
    start: usize,
    /// Prefix of `buf` already known to contain no terminator past `start`.
    scanned: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::with_capacity(READ_CHUNK),
            start: 0,
            scanned: 0,
            eof: false,
        }
    }

    /// Следующая запись или `None` в конце потока.
    ///
    /// Cancel safe: всё состояние хранится в `self`, прерванный вызов
    /// не теряет прочитанных байт.
    pub async fn next_record(&mut self) -> std::io::Result<Option<Record>> {
        let mut tmp = [0u8; READ_CHUNK];

        loop {
            let from = self.start.max(self.scanned);
            if let Some(pos) = self.buf[from..].iter().position(|&b| b == RECORD_TERMINATOR) {
                let end = from + pos + 1;
                let line = self.buf[self.start..end].to_vec();
                self.start = end;
                self.scanned = end;
                return Ok(Some(Record::new(line)));
            }
            self.scanned = self.buf.len();

            if self.eof {
                if self.start == self.buf.len() {
                    return Ok(None);
                }
                let line = self.buf[self.start..].to_vec();
                self.start = self.buf.len();
                return Ok(Some(Record::new(line)));
            }

            // уже выданные записи сдвигаем один раз на чтение, а не на запись
            if self.start > 0 {
                self.buf.drain(..self.start);
                self.scanned -= self.start;
                self.start = 0;
            }

            match self.source.read(&mut tmp).await? {
                0 => self.eof = true,
                n => self.buf.extend_from_slice(&tmp[..n]),
            }
        }
    }
}
