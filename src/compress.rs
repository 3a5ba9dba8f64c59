/* ************************************************************************
*   File: compress.rs                                     Part of TideMUD *
*  Usage: Per-connection MCCP output stream compression                   *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::io;

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::telnet::{IAC, SB, SE, TELOPT_COMPRESS, TELOPT_COMPRESS2, WILL};

/// Compression state for one connection.  Both MCCP option codes are
/// offered at connect time; the first one the client acknowledges becomes
/// the active stream.  Start and stop are idempotent.
pub struct CompressState {
    active: Option<ActiveStream>,
}

struct ActiveStream {
    option: u8,
    z: Compress,
}

impl CompressState {
    pub fn new() -> CompressState {
        CompressState { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn option(&self) -> Option<u8> {
        self.active.as_ref().map(|s| s.option)
    }

    /// Begin compressing.  Returns the in-band announcement that must be
    /// written to the client, uncompressed, before any compressed output.
    /// A second start (either option code) is a no-op.
    pub fn start(&mut self, option: u8) -> Option<Vec<u8>> {
        if self.active.is_some() {
            return None;
        }
        let announce = match option {
            TELOPT_COMPRESS => vec![IAC, SB, TELOPT_COMPRESS, WILL, SE],
            TELOPT_COMPRESS2 => vec![IAC, SB, TELOPT_COMPRESS2, IAC, SE],
            _ => return None,
        };
        self.active = Some(ActiveStream {
            option,
            z: Compress::new(Compression::default(), true),
        });
        Some(announce)
    }

    /// Run output bytes through the active stream with a sync flush, so the
    /// client can decompress everything written so far.
    pub fn process(&mut self, input: &[u8]) -> io::Result<Vec<u8>> {
        match self.active.as_mut() {
            None => Ok(input.to_vec()),
            Some(stream) => run_deflate(&mut stream.z, input, FlushCompress::Sync),
        }
    }

    /// Shut the stream down, returning the final compressed tail to write.
    /// Ending an inactive stream is a no-op.
    pub fn end(&mut self) -> Option<Vec<u8>> {
        let mut stream = self.active.take()?;
        run_deflate(&mut stream.z, &[], FlushCompress::Finish).ok()
    }
}

fn run_deflate(z: &mut Compress, input: &[u8], flush: FlushCompress) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() / 2 + 64);
    let mut chunk = [0u8; 4096];
    let mut consumed = 0usize;
    loop {
        let in_before = z.total_in();
        let out_before = z.total_out();
        let status = z
            .compress(&input[consumed..], &mut chunk, flush)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        consumed += (z.total_in() - in_before) as usize;
        let produced = (z.total_out() - out_before) as usize;
        out.extend_from_slice(&chunk[..produced]);
        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if consumed >= input.len() && produced == 0 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Decompress, FlushDecompress};

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut z = Decompress::new(true);
        let mut out = vec![0u8; 65536];
        z.decompress(data, &mut out, FlushDecompress::Sync).unwrap();
        out.truncate(z.total_out() as usize);
        out
    }

    #[test]
    fn start_is_idempotent_and_first_option_wins() {
        let mut state = CompressState::new();
        assert!(state.start(TELOPT_COMPRESS2).is_some());
        assert!(state.start(TELOPT_COMPRESS).is_none());
        assert_eq!(state.option(), Some(TELOPT_COMPRESS2));
    }

    #[test]
    fn end_is_idempotent() {
        let mut state = CompressState::new();
        assert!(state.end().is_none());
        state.start(TELOPT_COMPRESS2);
        assert!(state.end().is_some());
        assert!(state.end().is_none());
        assert!(!state.is_active());
    }

    #[test]
    fn sync_flushed_output_round_trips() {
        let mut state = CompressState::new();
        state.start(TELOPT_COMPRESS2);
        let text = b"The tide rolls in.\r\nThe tide rolls out.\r\n";
        let compressed = state.process(text).unwrap();
        assert!(!compressed.is_empty());
        assert_eq!(inflate(&compressed), text);
    }

    #[test]
    fn inactive_stream_passes_bytes_through() {
        let mut state = CompressState::new();
        let text = b"plain text";
        assert_eq!(state.process(text).unwrap(), text);
    }
}
