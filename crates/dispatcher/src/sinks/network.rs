//! UDP record streaming
//!
//! Fire-and-forget datagrams to a collector, one record per datagram,
//! JSON or bincode encoded. Send failures and oversize records are
//! counted and reported at close, never surfaced as write errors.

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, CorrelatedRecord, RecordSink};
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

/// IPv4 UDP payload ceiling, with headroom for headers
const DEFAULT_MAX_DATAGRAM: usize = 65000;

/// Datagram encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireEncoding {
    /// Human-readable, larger
    #[default]
    Json,
    /// Binary, compact
    Bincode,
}

impl WireEncoding {
    fn parse(value: Option<&str>) -> Result<Self, String> {
        match value {
            None | Some("json") => Ok(Self::Json),
            Some("bincode") => Ok(Self::Bincode),
            Some(other) => Err(format!("unknown encoding '{}'", other)),
        }
    }

    fn encode(&self, record: &CorrelatedRecord) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(record).map_err(|e| e.to_string()),
            Self::Bincode => bincode::serialize(record).map_err(|e| e.to_string()),
        }
    }
}

/// Sink that streams records over UDP
pub struct NetworkSink {
    name: String,
    socket: Option<UdpSocket>,
    encoding: WireEncoding,
    max_datagram: usize,
    oversize: u64,
    send_errors: u64,
}

impl NetworkSink {
    /// Bind an ephemeral local port and connect it to `addr`.
    pub async fn connect(
        name: impl Into<String>,
        addr: SocketAddr,
        encoding: WireEncoding,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;

        debug!(sink = %name, target = %addr, encoding = ?encoding, "udp sink connected");

        Ok(Self {
            name,
            socket: Some(socket),
            encoding,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            oversize: 0,
            send_errors: 0,
        })
    }

    /// Create from sink params (`addr` required, `format`, `max_datagram`).
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();

        let addr = params
            .get("addr")
            .ok_or_else(|| ContractError::sink_write(&name, "missing 'addr' parameter"))?;
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| ContractError::sink_write(&name, format!("bad 'addr' {}: {}", addr, e)))?;

        let encoding = WireEncoding::parse(params.get("format").map(String::as_str))
            .map_err(|e| ContractError::sink_write(&name, e))?;

        let mut sink = Self::connect(name.as_str(), addr, encoding).await.map_err(|e| {
            ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            }
        })?;

        if let Some(max) = params.get("max_datagram").and_then(|s| s.parse().ok()) {
            sink.max_datagram = max;
        }

        Ok(sink)
    }
}

impl RecordSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn record(&mut self, record: &CorrelatedRecord) -> Result<(), ContractError> {
        let payload = self
            .encoding
            .encode(record)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if payload.len() > self.max_datagram {
            self.oversize += 1;
            warn!(
                sink = %self.name,
                record_id = record.record_id,
                bytes = payload.len(),
                limit = self.max_datagram,
                "record exceeds datagram limit, skipped"
            );
            return Ok(());
        }

        let sent = match &self.socket {
            Some(socket) => socket.send(&payload).await,
            None => return Err(ContractError::sink_write(&self.name, "socket closed")),
        };

        match sent {
            Ok(bytes) => {
                trace!(sink = %self.name, record_id = record.record_id, bytes, "datagram sent");
            }
            Err(e) => {
                // UDP is best-effort; count and move on
                self.send_errors += 1;
                warn!(sink = %self.name, error = %e, "udp send failed");
            }
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        // Datagrams are not buffered
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        if self.oversize > 0 || self.send_errors > 0 {
            warn!(
                sink = %self.name,
                oversize = self.oversize,
                send_errors = self.send_errors,
                "udp sink closed with losses"
            );
        } else {
            debug!(sink = %self.name, "udp sink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CorrelationMeta, CorrelationQuality, TimerEvent, TimerEventKind};

    fn make_record(record_id: u64) -> CorrelatedRecord {
        CorrelatedRecord {
            record_id,
            timer: TimerEvent {
                kind: TimerEventKind::Shot,
                timestamp: 5.0,
                sequence: 1,
                split_s: 0.8,
                cumulative_s: 5.0,
                string_number: 1,
            },
            impact: None,
            offset_s: None,
            quality: Some(CorrelationQuality::NoImpact),
            meta: CorrelationMeta {
                window_s: 2.0,
                candidates_considered: 0,
                pending_depth: 0,
                dropped_count: 0,
                out_of_order_count: 0,
            },
        }
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!(WireEncoding::parse(None).unwrap(), WireEncoding::Json);
        assert_eq!(
            WireEncoding::parse(Some("bincode")).unwrap(),
            WireEncoding::Bincode
        );
        assert!(WireEncoding::parse(Some("xml")).is_err());
    }

    #[tokio::test]
    async fn test_from_params_requires_addr() {
        let result = NetworkSink::from_params("net", &HashMap::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_is_best_effort() {
        // no receiver on the far end; UDP does not care
        let addr: SocketAddr = "127.0.0.1:19998".parse().unwrap();
        let mut sink = NetworkSink::connect("net", addr, WireEncoding::Bincode)
            .await
            .unwrap();

        assert!(sink.record(&make_record(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversize_records_are_skipped() {
        let addr: SocketAddr = "127.0.0.1:19997".parse().unwrap();
        let mut sink = NetworkSink::connect("net", addr, WireEncoding::Json)
            .await
            .unwrap();
        sink.max_datagram = 8;

        assert!(sink.record(&make_record(1)).await.is_ok());
        assert_eq!(sink.oversize, 1);
    }
}
