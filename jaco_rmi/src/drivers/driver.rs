use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

pub use crate::packets::*;
pub use crate::{AngleUnit, CommandType, RmiError, RobotErrorCode, ToolPose};

use super::RobotClientConfig;

/// Request/response client for a Jaco robot server.
///
/// Every exchange is one JSON line out and one JSON line back. The round trip
/// is bounded by [`RobotClientConfig::timeout`]; once a round trip fails or
/// times out the session is considered dead and every later request returns
/// [`RmiError::Disconnected`] without touching the socket.
#[derive(Debug)]
pub struct RobotClient {
    pub config: RobotClientConfig,
    pub robot_type: String,
    stream: TcpStream,
    read_buffer: Vec<u8>,
    pending_lines: VecDeque<String>,
    connected: bool,
}

impl RobotClient {
    /// Opens the TCP session and performs the `JACO_Connect` handshake.
    ///
    /// # Errors
    ///
    /// - the configuration does not validate
    /// - the server cannot be reached after `connect_retries` attempts
    /// - the handshake times out, or the server answers with an error or an
    ///   unexpected packet
    pub async fn connect(config: RobotClientConfig) -> Result<RobotClient, RmiError> {
        config.validate().map_err(RmiError::Initialization)?;

        let addr = config.connection_url();
        let stream = connect_with_retries(&addr, config.connect_retries, config.timeout()).await?;

        let mut client = Self {
            config,
            robot_type: String::new(),
            stream,
            read_buffer: Vec::new(),
            pending_lines: VecDeque::new(),
            connected: true,
        };

        match client.request(SendPacket::Communication(Communication::Connect)).await? {
            ResponsePacket::CommunicationResponse(CommunicationResponse::Connect(res)) => {
                if let Some(code) = RobotErrorCode::from_error_id(res.error_id) {
                    client.connected = false;
                    return Err(RmiError::Controller(code));
                }
                info!(
                    "Connected to {} robot server v{}.{} at {}",
                    res.robot_type, res.major_version, res.minor_version, addr
                );
                client.robot_type = res.robot_type;
            }
            other => {
                client.connected = false;
                return Err(RmiError::UnrecognizedPacket(format!("{:?}", other)));
            }
        }

        Ok(client)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Reads the latest telemetry without moving the arm.
    pub async fn get_state(&mut self) -> Result<RobotStateResponse, RmiError> {
        self.command(Command::GetState).await
    }

    /// Drives the arm to the controller's home configuration.
    pub async fn home(&mut self) -> Result<RobotStateResponse, RmiError> {
        self.command(Command::Home).await
    }

    /// Sends one joint command and waits for the resulting state.
    pub async fn step(&mut self, step: JointStep) -> Result<RobotStateResponse, RmiError> {
        self.command(Command::Step(step)).await
    }

    /// Ends the session. Calling this on a dead session is a no-op.
    pub async fn disconnect(&mut self) -> Result<(), RmiError> {
        if !self.connected {
            return Ok(());
        }

        let result = self
            .request(SendPacket::Communication(Communication::Disconnect))
            .await;
        self.connected = false;
        let _ = self.stream.shutdown().await;

        match result? {
            ResponsePacket::CommunicationResponse(CommunicationResponse::Disconnect(_)) => {
                info!("Disconnected from robot server at {}", self.config.connection_url());
                Ok(())
            }
            other => Err(RmiError::UnrecognizedPacket(format!("{:?}", other))),
        }
    }

    async fn command(&mut self, command: Command) -> Result<RobotStateResponse, RmiError> {
        match self.request(SendPacket::Command(command)).await? {
            ResponsePacket::CommandResponse(CommandResponse::Unknown(res)) => Err(RmiError::Controller(
                RobotErrorCode::from_error_id(res.error_id).unwrap_or(RobotErrorCode::InvalidCommand),
            )),
            ResponsePacket::CommandResponse(response) => match response.into_state() {
                Some(state) => state.check(),
                None => Err(RmiError::UnrecognizedPacket("command response without state".to_string())),
            },
            other => Err(RmiError::UnrecognizedPacket(format!("{:?}", other))),
        }
    }

    async fn request(&mut self, packet: SendPacket) -> Result<ResponsePacket, RmiError> {
        if !self.connected {
            return Err(RmiError::Disconnected);
        }

        let limit = self.config.timeout();
        match timeout(limit, self.round_trip(&packet)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                self.connected = false;
                warn!("Robot server round trip failed: {}", e);
                Err(e)
            }
            Err(_) => {
                self.connected = false;
                warn!("Robot server did not answer within {:?}; dropping session", limit);
                Err(RmiError::Timeout {
                    waited_ms: self.config.timeout_ms,
                })
            }
        }
    }

    async fn round_trip(&mut self, packet: &SendPacket) -> Result<ResponsePacket, RmiError> {
        let serialized_packet = packet
            .to_line()
            .map_err(|e| RmiError::Serialization(e.to_string()))?;

        self.stream
            .write_all(serialized_packet.as_bytes())
            .await
            .map_err(|e| RmiError::FailedToSend(e.to_string()))?;
        debug!("Sent: {}", serialized_packet.trim_end());

        let mut buf = vec![0; 2048];
        loop {
            while let Some(line) = self.pending_lines.pop_front() {
                debug!("Received: {}", line);
                match serde_json::from_str::<ResponsePacket>(&line) {
                    Ok(response) => return Ok(response),
                    Err(e) => warn!("Invalid JSON from robot server: {} ({})", line, e),
                }
            }

            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(|e| RmiError::FailedToReceive(e.to_string()))?;
            if n == 0 {
                return Err(RmiError::Disconnected);
            }
            self.read_buffer.extend_from_slice(&buf[..n]);
            self.pending_lines.extend(extract_lines(&mut self.read_buffer));
        }
    }
}

async fn connect_with_retries(addr: &str, retries: u32, limit: Duration) -> Result<TcpStream, RmiError> {
    for attempt in 0..retries {
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(e)) => warn!("Failed to connect to {} (attempt {}): {}", addr, attempt + 1, e),
            Err(_) => warn!("Connecting to {} timed out (attempt {})", addr, attempt + 1),
        }
        if attempt + 1 < retries {
            sleep(Duration::from_secs(2)).await;
        }
    }
    Err(RmiError::Disconnected)
}
