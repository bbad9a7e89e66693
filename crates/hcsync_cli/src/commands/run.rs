//! Run command implementation.
//!
//! Starts the scheduler and feeds push messages read from stdin, one JSON
//! object per line, into its push queue. Stops on ctrl-c.

use hcsync_engine::{push_queue, PushQueue, Scheduler};
use hcsync_protocol::PushMessage;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Runs the run command.
pub async fn run(
    data_dir: &Path,
    sync_now: bool,
    queue_capacity: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = super::open_context(data_dir)?;
    let (queue, receiver) = push_queue(queue_capacity);
    let handle = Scheduler::new(ctx).with_push_receiver(receiver).start()?;
    if sync_now {
        handle.trigger_sync();
    }

    let intake = tokio::spawn(async move {
        let forwarded = forward_lines(BufReader::new(tokio::io::stdin()), &queue).await;
        debug!(forwarded, "stdin closed");
    });

    info!(data_dir = %data_dir.display(), "running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    intake.abort();
    handle.shutdown().await;
    Ok(())
}

/// Sends every parseable line of `reader` to `queue` and returns how many
/// were sent. Blank and malformed lines are skipped.
pub async fn forward_lines<R>(reader: R, queue: &PushQueue) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read push input");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<PushMessage>(line) {
            Ok(message) => {
                if queue.send(message).await.is_err() {
                    warn!("push queue closed");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!(error = %e, "ignoring malformed push message"),
        }
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_valid_lines_in_order() {
        let input = concat!(
            r#"{"op":"DEL","data":"{\"recordType\":\"Steps\",\"uuids\":[\"a\"]}"}"#,
            "\n\nnot json\n",
            r#"{"op":"PUSH","data":"[]"}"#,
            "\n"
        );
        let (queue, mut receiver) = push_queue(8);

        let forwarded = forward_lines(input.as_bytes(), &queue).await;
        assert_eq!(forwarded, 2);

        drop(queue);
        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert_eq!(first.op, "DEL");
        assert_eq!(second.op, "PUSH");
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn stops_when_queue_closes() {
        let input = "{\"op\":\"PUSH\",\"data\":\"[]\"}\n{\"op\":\"PUSH\",\"data\":\"[]\"}\n";
        let (queue, receiver) = push_queue(8);
        drop(receiver);

        assert_eq!(forward_lines(input.as_bytes(), &queue).await, 0);
    }
}
