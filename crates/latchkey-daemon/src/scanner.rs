//! Scanner subprocess and scan ingestion.
//!
//! The scanner is an external program printing one credential per line on
//! its standard output. Each line is trimmed, validated and zero-padded to a
//! [`FobId`], then posted to the scan mailbox. Lines that are not credentials
//! are logged and skipped, as are lines longer than
//! [`MAX_SCAN_LINE_LENGTH`], which are dropped without being buffered in
//! full. End of output ends ingestion.

use std::process::Stdio;

use bytes::BytesMut;
use futures::StreamExt;
use latchkey_core::FobId;
use latchkey_core::constants::FOB_LENGTH;
use tokio::io::AsyncRead;
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, trace, warn};

use crate::error::{DaemonError, DaemonResult};
use crate::mailbox::Mailbox;

/// Running scanner subprocess.
///
/// The child is killed when this value is dropped.
#[derive(Debug)]
pub struct ScannerProcess {
    child: Child,
}

impl ScannerProcess {
    /// Start `command` (program followed by whitespace-separated arguments)
    /// with its standard output piped.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::ScannerSpawn` if the program cannot be started,
    /// or `DaemonError::Config` if the command is blank.
    pub fn spawn(command: &str) -> DaemonResult<(Self, ChildStdout)> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| DaemonError::Config("scanner command is empty".into()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DaemonError::ScannerSpawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| DaemonError::ScannerSpawn {
            command: command.to_string(),
            source: std::io::Error::other("stdout not captured"),
        })?;

        info!(command, pid = child.id(), "Scanner started");
        Ok((Self { child }, stdout))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Longest scanner line accepted, allowing for padding and a `\r`.
pub const MAX_SCAN_LINE_LENGTH: usize = FOB_LENGTH * 4;

/// One decoded scanner line.
#[derive(Debug, PartialEq, Eq)]
enum ScanLine {
    Line(String),
    /// A line over the length limit; its bytes were discarded.
    Overlong,
}

/// [`LinesCodec`] with a length limit that reports an overlong line as an
/// item instead of an error, so the stream keeps going. The inner codec
/// discards the rest of such a line up to its newline.
struct ScanLineCodec {
    lines: LinesCodec,
}

impl ScanLineCodec {
    fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_SCAN_LINE_LENGTH),
        }
    }

    fn map(result: Result<Option<String>, LinesCodecError>) -> Result<Option<ScanLine>, LinesCodecError> {
        match result {
            Ok(line) => Ok(line.map(ScanLine::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(ScanLine::Overlong)),
            Err(e) => Err(e),
        }
    }
}

impl Decoder for ScanLineCodec {
    type Item = ScanLine;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ScanLine>, LinesCodecError> {
        Self::map(self.lines.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<ScanLine>, LinesCodecError> {
        Self::map(self.lines.decode_eof(buf))
    }
}

/// Read scanner lines from `reader` and post each credential to `mailbox`.
///
/// # Errors
///
/// Returns `DaemonError::ScannerExited` when the stream ends, or
/// `DaemonError::ScannerRead` if it cannot be read.
pub async fn ingest<R>(reader: R, mailbox: &Mailbox<FobId>) -> DaemonResult<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, ScanLineCodec::new());

    while let Some(line) = lines.next().await {
        let line = match line.map_err(|e| DaemonError::ScannerRead(e.to_string()))? {
            ScanLine::Line(line) => line,
            ScanLine::Overlong => {
                warn!(max = MAX_SCAN_LINE_LENGTH, "Ignoring overlong scanner line");
                continue;
            }
        };

        let raw = line.trim();
        if raw.is_empty() {
            trace!("Blank scanner line");
            continue;
        }

        match FobId::from_scan(raw) {
            Ok(fob) => {
                debug!(%fob, "Scan received");
                mailbox.post(fob);
            }
            Err(e) => warn!(line = raw, error = %e, "Ignoring malformed scan"),
        }
    }

    warn!("Scanner output closed");
    Err(DaemonError::ScannerExited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::io::AsyncWriteExt;

    fn fob(raw: &str) -> FobId {
        FobId::from_scan(raw).unwrap()
    }

    #[rstest]
    #[case::padded(b"1234567\n".as_slice(), "0001234567")]
    #[case::trailing_whitespace(b"1234567  \r\n".as_slice(), "0001234567")]
    #[case::full_width(b"0009999999\n".as_slice(), "0009999999")]
    #[case::no_final_newline(b"42".as_slice(), "0000000042")]
    #[tokio::test]
    async fn test_ingest_normalizes(#[case] input: &[u8], #[case] expected: &str) {
        let mailbox = Mailbox::new();

        let result = ingest(input, &mailbox).await;

        assert!(matches!(result, Err(DaemonError::ScannerExited)));
        assert_eq!(mailbox.take().unwrap().as_str(), expected);
    }

    #[tokio::test]
    async fn test_ingest_skips_garbage_and_keeps_latest() {
        let mailbox = Mailbox::new();
        let input: &[u8] = b"0000000001\n\nnot-a-fob\n12345678901\n0000000002\n";

        let _ = ingest(input, &mailbox).await;

        assert_eq!(mailbox.take(), Some(fob("2")));
        assert_eq!(mailbox.take(), None);
    }

    #[tokio::test]
    async fn test_ingest_skips_overlong_line_and_continues() {
        let mailbox = Mailbox::new();
        let mut input = vec![b'7'; MAX_SCAN_LINE_LENGTH * 100];
        input.extend_from_slice(b"\n1234567\n");

        let result = ingest(input.as_slice(), &mailbox).await;

        assert!(matches!(result, Err(DaemonError::ScannerExited)));
        assert_eq!(mailbox.take(), Some(fob("1234567")));
    }

    #[tokio::test]
    async fn test_ingest_discards_endless_line() {
        let mailbox = Mailbox::new();
        let (mut scanner, output) = tokio::io::duplex(64);
        let ingestion = tokio::spawn(async move {
            let mailbox = mailbox;
            let result = ingest(output, &mailbox).await;
            (result, mailbox.take())
        });

        // Far more than the limit without a newline, then a real scan
        for _ in 0..1_000 {
            scanner.write_all(&[b'9'; 64]).await.unwrap();
        }
        scanner.write_all(b"\n42\n").await.unwrap();
        drop(scanner);

        let (result, latest) = ingestion.await.unwrap();
        assert!(matches!(result, Err(DaemonError::ScannerExited)));
        assert_eq!(latest, Some(fob("42")));
    }

    #[test]
    fn test_codec_reports_overlong_as_item() {
        let mut codec = ScanLineCodec::new();
        let mut buf = BytesMut::from(&[b'1'; MAX_SCAN_LINE_LENGTH + 1][..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(ScanLine::Overlong));
        buf.extend_from_slice(b"111\n0000000005\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(ScanLine::Line("0000000005".into()))
        );
    }

    #[tokio::test]
    async fn test_ingest_stops_on_invalid_utf8() {
        let mailbox = Mailbox::new();
        let input: &[u8] = b"\xff\xfe\n0000000003\n";

        let result = ingest(input, &mailbox).await;

        assert!(matches!(result, Err(DaemonError::ScannerRead(_))));
        assert_eq!(mailbox.take(), None);
    }

    #[tokio::test]
    async fn test_spawn_reads_real_subprocess() {
        let (process, stdout) = ScannerProcess::spawn("echo 1234567").unwrap();
        assert!(process.id().is_some());
        let mailbox = Mailbox::new();

        let result = ingest(stdout, &mailbox).await;

        assert!(matches!(result, Err(DaemonError::ScannerExited)));
        assert_eq!(mailbox.take(), Some(fob("1234567")));
    }

    #[test]
    fn test_spawn_rejects_blank_command() {
        assert!(matches!(
            ScannerProcess::spawn("   "),
            Err(DaemonError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_reports_missing_program() {
        let result = ScannerProcess::spawn("/nonexistent/latchkey-scanner");
        assert!(matches!(result, Err(DaemonError::ScannerSpawn { .. })));
    }
}
