//! Raw Ethernet access.
//!
//! Capture runs on a dedicated OS thread because pnet receivers block. Frames
//! are forwarded into a tokio queue; the thread exits once the queue is closed.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use quietmap_common::error::TransportError;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Something that can put Ethernet frames on the wire and hand back captured ones.
#[async_trait]
pub trait EthernetLink: Send {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Next captured frame, or `None` once capture has ended.
    ///
    /// Must be cancel safe; it is raced against timers.
    async fn recv_frame(&mut self) -> Option<Vec<u8>>;
}

pub struct EthernetHandle {
    pub tx: Box<dyn DataLinkSender>,
    pub rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl EthernetLink for EthernetHandle {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        match self.tx.send_to(frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(TransportError::Send(e)),
            None => Err(TransportError::Send(io::Error::other(
                "datalink sender had no room for the frame",
            ))),
        }
    }

    async fn recv_frame(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

/// Opens an Ethernet channel on `intf` and starts draining it in the background.
pub fn start_capture(intf: &NetworkInterface) -> Result<EthernetHandle, TransportError> {
    let (tx, rx) = open_eth_channel(intf, &get_config(), datalink::channel)?;
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    spawn_listener(queue_tx, rx, intf.name.clone());
    Ok(EthernetHandle { tx, rx: queue_rx })
}

fn spawn_listener(
    queue_tx: mpsc::UnboundedSender<Vec<u8>>,
    mut rx: Box<dyn DataLinkReceiver>,
    intf_name: String,
) {
    std::thread::spawn(move || {
        loop {
            if queue_tx.is_closed() {
                break;
            }
            match rx.next() {
                Ok(frame) => {
                    if queue_tx.send(frame.to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => trace!("Read error on {intf_name}: {e}"),
            }
        }
        debug!("Capture on {intf_name} stopped");
    });
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), TransportError>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg).map_err(|source| TransportError::Channel {
        interface: intf.name.clone(),
        source,
    })?;
    match ch {
        Channel::Ethernet(tx, rx) => {
            debug!("Datalink channel opened on {}", intf.name);
            Ok((tx, rx))
        }
        _ => Err(TransportError::UnsupportedChannel {
            interface: intf.name.clone(),
        }),
    }
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
