//! Streaming `multipart/form-data` encoder for file uploads.

use std::io;
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::producer::{spawn_producer, BodyProducer, BodyWriter, StreamingBody, PIPE_CAPACITY};

const CHUNK_SIZE: usize = 64 * 1024;

/// Text fields followed by one file part, read from disk while uploading.
#[derive(Clone, Debug)]
pub struct MultipartUpload {
    path: PathBuf,
    file_field: String,
    filename: String,
    fields: Vec<(String, String)>,
    boundary: String,
}

impl MultipartUpload {
    /// The file part is named `file_field` and carries the path's base name.
    pub fn new(path: impl AsRef<Path>, file_field: impl Into<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let boundary = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();
        Self {
            path,
            file_field: file_field.into(),
            filename,
            fields: Vec::new(),
            boundary,
        }
    }

    /// Adds a text field; fields are sent in insertion order before the file.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn head(&self) -> Bytes {
        let mut head = BytesMut::new();
        for (name, value) in &self.fields {
            self.put_part_header(&mut head, name, None);
            head.put_slice(value.as_bytes());
            head.put_slice(b"\r\n");
        }
        self.put_part_header(&mut head, &self.file_field, Some(&self.filename));
        head.freeze()
    }

    fn tail(&self) -> Bytes {
        Bytes::from(format!("\r\n--{}--\r\n", self.boundary))
    }

    fn put_part_header(&self, buf: &mut BytesMut, name: &str, filename: Option<&str>) {
        buf.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                escape_quotes(name),
                escape_quotes(filename)
            ),
            None => format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quotes(name)
            ),
        };
        buf.put_slice(disposition.as_bytes());
    }
}

impl BodyProducer for MultipartUpload {
    fn produce(&self) -> StreamingBody {
        let path = self.path.clone();
        let head = self.head();
        let tail = self.tail();
        spawn_producer(PIPE_CAPACITY, move |writer| {
            write_upload(writer, path, head, tail)
        })
    }
}

async fn write_upload(writer: BodyWriter, path: PathBuf, head: Bytes, tail: Bytes) -> io::Result<()> {
    // Open before sending anything so a missing file aborts an empty request.
    let mut file = File::open(&path).await.map_err(|err| {
        io::Error::new(err.kind(), format!("could not open {}: {err}", path.display()))
    })?;
    writer.write(head).await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).await.map_err(|err| {
            io::Error::new(err.kind(), format!("could not read {}: {err}", path.display()))
        })?;
        if read == 0 {
            break;
        }
        writer.write(Bytes::copy_from_slice(&buf[..read])).await?;
    }

    writer.write(tail).await
}

/// Percent-encodes the characters that would end a quoted header parameter
/// or the header line itself.
fn escape_quotes(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
