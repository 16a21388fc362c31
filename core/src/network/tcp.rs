use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use quietmap_common::error::ProbeError;

/// Opens (and immediately drops) a TCP connection.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, addr: SocketAddr) -> io::Result<()>;
}

/// Plain handshake through the OS stack. Nothing is sent after connecting.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        let stream = TcpStream::connect(addr).await?;
        drop(stream);
        Ok(())
    }
}

/// One bounded handshake attempt.
pub async fn handshake_probe(
    connector: &dyn Connector,
    addr: SocketAddr,
    probe_timeout: Duration,
) -> Result<(), ProbeError> {
    match timeout(probe_timeout, connector.connect(addr)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            Err(ProbeError::Refused { addr })
        }
        Ok(Err(source)) => Err(ProbeError::Unreachable { addr, source }),
        Err(_elapsed) => Err(ProbeError::Timeout {
            addr,
            timeout: probe_timeout,
        }),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
