use std::io::{Cursor, Read, Write};
use crate::rsa::error::Result;
use crate::rsa::keys::asn1::{encode_integer, encode_sequence};
use crate::rsa::keys::{KeyPair, BASE64_SPLIT, PEM_FOOTER, PEM_HEADER};
use crate::rsa::math::BigMath;

/// Buffers base64 text and, on flush, writes it framed by `header` and
/// `footer` with lines of `BASE64_SPLIT` characters.
pub struct KeyWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    pub header: String,
    pub footer: String,
}

impl<W: Write> KeyWriter<W> {
    pub fn new(writer: W) -> Self {
        KeyWriter {
            writer,
            buffer: vec![],
            header: "".to_string(),
            footer: "".to_string(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Write for KeyWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut cur = Cursor::new(std::mem::take(&mut self.buffer));
        self.writer.write_all(self.header.as_bytes())?;
        self.writer.write_all(b"\n")?;
        let mut buf = [0u8; BASE64_SPLIT];
        loop {
            let n = cur.read(&mut buf)?;
            if n == 0 { break; }
            self.writer.write_all(&buf[0..n])?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(self.footer.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// DER `SEQUENCE { version 0, n, e, d }` wrapped as PEM.
pub fn encode_private_key_pem<M: BigMath>(pair: &KeyPair<M>) -> Result<String> {
    let (n, e) = pair.public_key().to_bytes();
    let (_, d) = pair.private_key().to_bytes();
    let der = encode_sequence(&[
        encode_integer(&[0]),
        encode_integer(&n),
        encode_integer(&e),
        encode_integer(&d),
    ]);
    let mut key_writer = KeyWriter::new(Vec::new());
    key_writer.header = PEM_HEADER.to_string();
    key_writer.footer = PEM_FOOTER.to_string();
    key_writer.write_all(base64::encode(der).as_bytes())?;
    key_writer.flush()?;
    Ok(String::from_utf8_lossy(&key_writer.into_inner()).into_owned())
}
