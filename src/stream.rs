//! Async adapter over the blocking parser.
//!
//! The tokenizer itself is synchronous. For async callers the parser runs on
//! Tokio's blocking pool, reading through a [`SyncIoBridge`], and hands points
//! back over a bounded channel.

use std::io::BufReader;
use std::pin::Pin;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::SyncIoBridge;

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::parser::LineProtocolParser;
use crate::source::ReaderSource;
use crate::types::Point;

/// Points buffered between the parsing thread and the consumer.
const CHANNEL_CAPACITY: usize = 256;

/// Parse Line Protocol from an async reader and return the points as a stream.
///
/// Nothing is read until the stream is first polled. Points are parsed one at a
/// time, so memory use stays flat regardless of input size. The stream ends
/// after the first error.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use lineproto_stream::{ParserConfig, stream::parse_stream};
///
/// let file = tokio::fs::File::open("metrics.lp").await?;
/// let mut points = parse_stream(file, ParserConfig::default());
/// while let Some(point) = points.next().await {
///     println!("{}", point?);
/// }
/// ```
pub fn parse_stream<R>(
    reader: R,
    config: ParserConfig,
) -> Pin<Box<dyn Stream<Item = Result<Point>> + Send>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let s = stream! {
        let (tx, mut rx) = mpsc::channel::<Result<Point>>(CHANNEL_CAPACITY);

        let handle = tokio::task::spawn_blocking(move || {
            let source = ReaderSource::new(BufReader::new(SyncIoBridge::new(reader)));
            let parser = LineProtocolParser::with_config(source, config);
            for item in parser {
                if tx.blocking_send(item).is_err() {
                    // Consumer went away
                    break;
                }
            }
        });

        while let Some(item) = rx.recv().await {
            yield item;
        }

        if let Err(e) = handle.await {
            yield Err(Error::Task(e));
        }
    };

    Box::pin(s)
}

/// Parse everything from an async reader into a Vec.
///
/// **Warning**: This keeps all points in memory. For large inputs use
/// [`parse_stream`] instead.
pub async fn collect_points<R>(reader: R, config: ParserConfig) -> Result<Vec<Point>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut stream = parse_stream(reader, config);
    let mut results = Vec::new();

    while let Some(item) = stream.next().await {
        results.push(item?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_parse_stream_yields_points_in_order() {
        let input: &'static [u8] = b"# header\na,host=x f=1i 10\nb f=\"s\" 20\n";
        let points = collect_points(input, ParserConfig::default()).await.unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].measurement(), "a");
        assert_eq!(points[0].tag("host"), Some("x"));
        assert_eq!(points[0].get_integer("f"), Some(1));
        assert_eq!(points[1].get_str("f"), Some("s"));
        assert_eq!(points[1].timestamp(), Some(20));
    }

    #[tokio::test]
    async fn test_parse_stream_skips_bad_lines() {
        let input: &'static [u8] = b"a f=1\nbad\nc f=3\n";
        let points = collect_points(input, ParserConfig::default()).await.unwrap();
        let names: Vec<_> = points.iter().map(|p| p.measurement().to_string()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[tokio::test]
    async fn test_parse_stream_fail_fast_ends_with_error() {
        let input: &'static [u8] = b"a f=1\nbad\nc f=3\n";
        let mut stream = parse_stream(input, ParserConfig::new().fail_fast());

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await,
            Some(Err(Error::Syntax { line: 2, .. }))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parse_stream_from_pipe() {
        let (mut writer, reader) = tokio::io::duplex(16);

        let producer = tokio::spawn(async move {
            for i in 0..100 {
                let line = format!("cpu,core={} usage={}.5 {}\n", i % 4, i, i);
                writer.write_all(line.as_bytes()).await.unwrap();
            }
            // Dropping the writer closes the pipe
        });

        let points = collect_points(reader, ParserConfig::default()).await.unwrap();
        producer.await.unwrap();

        assert_eq!(points.len(), 100);
        assert_eq!(points[99].get_float("usage"), Some(99.5));
        assert_eq!(points[99].tag("core"), Some("3"));
    }
}
