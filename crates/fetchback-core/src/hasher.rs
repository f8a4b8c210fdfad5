use md5::Context;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::trace;

const READ_CHUNK: usize = 64 * 1024;

/// Stream a file through MD5 and return the lowercase hex digest.
///
/// Reads the file exactly once; large downloads never sit in memory whole.
pub fn md5_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let digest = md5_reader(BufReader::with_capacity(READ_CHUNK, file))?;
    trace!("md5 {} = {}", path.display(), digest);
    Ok(digest)
}

pub fn md5_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut context = Context::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}
