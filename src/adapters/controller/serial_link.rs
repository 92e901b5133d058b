use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

use crate::application::ports::ControllerLinkPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::record::RankingRecord;

/// Microcontrollers reset when the port opens; writes before this are lost.
const RESET_SETTLE: Duration = Duration::from_secs(2);

/// Line sent by the controller once it has taken the ranking.
const HANDSHAKE: &str = "--end--";
/// Line sent by the controller when it is done with this connection.
const LOOP_ENDED: &str = "__loop_ended__";

#[derive(Debug, PartialEq, Eq)]
enum ControllerMessage {
    Handshake,
    LoopEnded,
    Chatter(String),
}

impl ControllerMessage {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            HANDSHAKE => Some(Self::Handshake),
            LOOP_ENDED => Some(Self::LoopEnded),
            other => Some(Self::Chatter(other.to_string())),
        }
    }
}

/// Serial link to the signal controller, 8N1 without flow control at `baud_rate`.
pub struct SerialLink {
    port: PathBuf,
    baud_rate: u32,
    timeout: Duration,
    keep_connection: bool,
    settle: Duration,
}

impl SerialLink {
    pub fn new(
        port: impl Into<PathBuf>,
        baud_rate: u32,
        timeout_secs: u64,
        keep_connection: bool,
    ) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            timeout: Duration::from_secs(timeout_secs.max(1)),
            keep_connection,
            settle: RESET_SETTLE,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn open(&self) -> DomainResult<SerialStream> {
        tokio_serial::new(self.port.to_string_lossy(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open_native_async()
            .map_err(|e| DomainError::Link(format!("opening {}: {e}", self.port.display())))
    }

    /// Waits out the controller reset, writes `payload` and, with `keep_connection`, stays on
    /// the line until the controller lets go.
    async fn exchange<S>(&self, stream: S, payload: &str) -> DomainResult<()>
    where
        S: AsyncRead + AsyncWrite,
    {
        tokio::time::sleep(self.settle).await;

        let (reader, mut writer) = tokio::io::split(stream);
        writer
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| DomainError::Link(e.to_string()))?;
        writer.flush().await.map_err(|e| DomainError::Link(e.to_string()))?;
        info!(
            port = %self.port.display(),
            baud = self.baud_rate,
            bytes = payload.len(),
            "ranking sent over serial"
        );

        if self.keep_connection {
            self.listen(BufReader::new(reader)).await?;
        }
        Ok(())
    }

    /// Reads controller lines until it ends the loop or closes the port.
    async fn listen<R>(&self, reader: R) -> DomainResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            let line = match tokio::time::timeout(self.timeout, lines.next_line()).await {
                Err(_) => {
                    debug!(port = %self.port.display(), "no controller data yet");
                    continue;
                }
                Ok(line) => line.map_err(|e| DomainError::Link(e.to_string()))?,
            };
            let Some(line) = line else {
                info!(port = %self.port.display(), "controller closed the connection");
                return Ok(());
            };
            match ControllerMessage::parse(&line) {
                Some(ControllerMessage::Handshake) => info!("controller acknowledged the ranking"),
                Some(ControllerMessage::LoopEnded) => {
                    info!("controller ended its loop, closing link");
                    return Ok(());
                }
                Some(ControllerMessage::Chatter(text)) => info!(controller = %text, "controller says"),
                None => {}
            }
        }
    }
}

#[async_trait]
impl ControllerLinkPort for SerialLink {
    async fn publish(&self, record: &RankingRecord) -> DomainResult<()> {
        let payload = record.to_json()?;
        if !payload.is_ascii() {
            return Err(DomainError::InvalidInput("controller payload must be ASCII".into()));
        }
        let stream = self.open()?;
        self.exchange(stream, &payload).await
    }
}
