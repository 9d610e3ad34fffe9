//! BLE peripheral side: the write dispatcher, the link lifecycle and a
//! line-driven stand-in for the platform radio layer.
//!
//! The simulated link reads one event per line:
//!
//! ```text
//! # comment
//! FFF1 4e455854            write "NEXT" to the command characteristic
//! FFF2 424d5031... phone-1 write to data, with a central id
//! read                     read request
//! ```

pub mod dispatch;
pub mod link;

use std::future::Future;
use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub use dispatch::{BitmapOutcome, Channel, WriteDispatcher, WriteReport};
pub use link::{LinkAction, LinkEvent, LinkState, Peripheral, WriteRequest};

use crate::config::PeripheralConfig;
use crate::error::Result;
use crate::frame::now_str;
use crate::shutdown_signal;

#[derive(Error, Debug, PartialEq)]
pub enum LineError {
    #[error("expected '<characteristic> <hex> [central]'")]
    Missing,

    #[error("bad hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Parse one line of the simulated link. Blank lines and `#` comments yield
/// `Ok(None)`.
pub fn parse_line(line: &str) -> std::result::Result<Option<LinkEvent>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.eq_ignore_ascii_case("read") {
        return Ok(Some(LinkEvent::ReadRequested));
    }
    let mut parts = line.split_whitespace();
    let characteristic = parts.next().ok_or(LineError::Missing)?;
    let payload = parts.next().ok_or(LineError::Missing)?;
    let central = parts.next().map(str::to_string);
    Ok(Some(LinkEvent::WriteReceived(WriteRequest {
        central,
        characteristic: characteristic.to_string(),
        data: hex::decode(payload)?,
    })))
}

impl Peripheral {
    pub fn from_config(config: PeripheralConfig) -> Self {
        let dispatcher = WriteDispatcher::new(
            config.ids.clone(),
            config.dump,
            config.mode,
            config.renderer,
        );
        Peripheral::new(config.ids, dispatcher)
    }

    /// Feed an event and play the platform's part: registration and
    /// advertising requests succeed immediately.
    pub fn step<W: Write>(&mut self, event: LinkEvent, out: &mut W) -> Result<()> {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            next = match self.handle(event) {
                LinkAction::None | LinkAction::RespondRead(_) => None,
                LinkAction::AddService(_) => Some(LinkEvent::ServiceAdded(Ok(()))),
                LinkAction::StartAdvertising { .. } => Some(LinkEvent::AdvertisingStarted(Ok(()))),
                LinkAction::Dispatched(report) => {
                    print_report(&report, out)?;
                    None
                }
            };
        }
        Ok(())
    }

    /// Process lines until the input ends or `shutdown` resolves. Shutdown is
    /// only observed between events.
    pub async fn drive<R, W, F>(&mut self, reader: R, out: &mut W, shutdown: F) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        F: Future<Output = ()>,
    {
        self.step(LinkEvent::PowerChanged { powered_on: true }, out)?;

        let mut lines = reader.lines();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopped");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!(writes = self.dispatcher().writes(), "Input closed");
                        break;
                    };
                    match parse_line(&line) {
                        Ok(Some(event)) => self.step(event, out)?,
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, line = %line, "Skipping malformed line"),
                    }
                }
            }
        }
        Ok(())
    }
}

fn print_report<W: Write>(report: &WriteReport, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "\n[{}] from central={} char={} channel={} len={}",
        now_str(),
        report.central.as_deref().unwrap_or("?"),
        report.characteristic,
        report.channel,
        report.len
    )?;
    writeln!(out, "{report}")?;
    if let Some(BitmapOutcome::Failed { header_mode, error }) = &report.bitmap {
        if *header_mode {
            warn!(error = %error, "bitmap header render error");
        } else {
            warn!(error = %error, "bitmap render error");
        }
    }
    Ok(())
}

/// Run the peripheral against stdin (or `input`) until EOF or Ctrl+C.
pub fn run_peripheral(config: PeripheralConfig, input: Option<&Path>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut peripheral = Peripheral::from_config(config);
    let mut stdout = std::io::stdout();
    let shutdown = shutdown_signal();

    run_detached(rt, async move {
        match input {
            Some(path) => {
                let file = tokio::fs::File::open(path).await?;
                peripheral
                    .drive(BufReader::new(file), &mut stdout, shutdown)
                    .await
            }
            None => {
                peripheral
                    .drive(BufReader::new(tokio::io::stdin()), &mut stdout, shutdown)
                    .await
            }
        }
    })
}

/// Blocks on `fut`, then tears the runtime down without waiting on blocking
/// tasks. A pending stdin read runs on such a task and cannot be cancelled.
fn run_detached<F: Future>(rt: tokio::runtime::Runtime, fut: F) -> F::Output {
    let out = rt.block_on(fut);
    rt.shutdown_background();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_writes_with_and_without_central() {
        assert_eq!(
            parse_line("FFF1 4e45 phone").unwrap(),
            Some(LinkEvent::WriteReceived(WriteRequest {
                central: Some("phone".into()),
                characteristic: "FFF1".into(),
                data: vec![0x4e, 0x45],
            }))
        );
        let Some(LinkEvent::WriteReceived(req)) = parse_line("  fff2 aa ").unwrap() else {
            panic!("expected a write");
        };
        assert_eq!(req.central, None);
        assert_eq!(req.data, vec![0xAA]);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   # hello"), Ok(None));
        assert_eq!(parse_line("READ"), Ok(Some(LinkEvent::ReadRequested)));
    }

    #[test]
    fn returns_while_a_blocking_read_is_still_pending() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let started = std::time::Instant::now();
        let out = run_detached(rt, async {
            // Stands in for a stdin read that never completes.
            drop(tokio::task::spawn_blocking(|| {
                std::thread::sleep(std::time::Duration::from_secs(30))
            }));
            7
        });
        assert_eq!(out, 7);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn drive_stops_on_shutdown_with_an_open_reader() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let config = PeripheralConfig::new(
            crate::config::ServiceIds::default(),
            crate::config::DumpOptions::default(),
            &crate::config::BitmapArgs::default(),
            "#",
            ".",
        )
        .unwrap();
        let mut p = Peripheral::from_config(config);
        let mut out = Vec::new();
        let (writer, reader) = tokio::io::duplex(16);
        let res = run_detached(rt, async {
            let (tx, rx) = tokio::sync::oneshot::channel::<()>();
            tx.send(()).unwrap();
            p.drive(BufReader::new(reader), &mut out, async {
                let _ = rx.await;
            })
            .await
        });
        drop(writer);
        assert!(res.is_ok());
        assert_eq!(p.state(), LinkState::Advertising);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_line("FFF1"), Err(LineError::Missing));
        assert!(matches!(parse_line("FFF1 zz"), Err(LineError::Hex(_))));
    }
}
