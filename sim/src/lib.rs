//! Jaco robot-server simulator.
//!
//! Speaks the JSON-lines protocol of `jaco_rmi` and drives a simulated arm,
//! so the hardware backend can be exercised without a robot.

use std::error::Error;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use jaco_rmi::packets::{
    extract_lines, Command, CommandResponse, Communication, CommunicationResponse,
    ConnectResponse, DisconnectResponse, JointStep, ResponsePacket, RobotStateResponse,
    SendPacket, UnknownResponse,
};
use jaco_rmi::{CommandType, RobotErrorCode};
use reacher::{PhysicsBackend, RobotModel, SimulatedBackend, StartPosition};

pub const PROTOCOL_MAJOR_VERSION: u16 = 1;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// Longest request line accepted before the client is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub model: RobotModel,
    /// Seconds of simulated time per `JACO_Step`.
    pub control_timestep: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            model: RobotModel::J2s7s300,
            control_timestep: 0.02,
        }
    }
}

/// Arm state shared by every connection to the server.
#[derive(Debug)]
pub struct SimulatedRobot {
    backend: SimulatedBackend,
    model: RobotModel,
    rng: StdRng,
    n_states: u32,
}

impl SimulatedRobot {
    pub fn new(config: &SimConfig) -> reacher::Result<Self> {
        Ok(Self {
            backend: SimulatedBackend::from_model(config.model, config.control_timestep)?,
            model: config.model,
            rng: StdRng::seed_from_u64(0),
            n_states: 0,
        })
    }

    pub fn backend(&self) -> &SimulatedBackend {
        &self.backend
    }

    fn robot_type(&self) -> String {
        serde_json::to_value(self.model)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Answers one request.
    pub fn handle(&mut self, packet: SendPacket) -> ResponsePacket {
        match packet {
            SendPacket::Communication(Communication::Connect) => {
                ResponsePacket::CommunicationResponse(CommunicationResponse::Connect(ConnectResponse {
                    error_id: 0,
                    robot_type: self.robot_type(),
                    major_version: PROTOCOL_MAJOR_VERSION,
                    minor_version: PROTOCOL_MINOR_VERSION,
                }))
            }
            SendPacket::Communication(Communication::Disconnect) => ResponsePacket::CommunicationResponse(
                CommunicationResponse::Disconnect(DisconnectResponse { error_id: 0 }),
            ),
            SendPacket::Command(Command::GetState) => {
                ResponsePacket::CommandResponse(CommandResponse::GetState(self.state()))
            }
            SendPacket::Command(Command::Home) => {
                let state = match self.backend.initialize_episode(StartPosition::Home, &mut self.rng) {
                    Ok(()) => self.state(),
                    Err(e) => self.failure(RobotErrorCode::InternalSystemError, e.to_string()),
                };
                ResponsePacket::CommandResponse(CommandResponse::Home(state))
            }
            SendPacket::Command(Command::Step(step)) => {
                ResponsePacket::CommandResponse(CommandResponse::Step(self.step(step)))
            }
        }
    }

    fn step(&mut self, step: JointStep) -> RobotStateResponse {
        let current = self.backend.joint_angles();
        if step.data.len() > current.len() {
            return self.failure(
                RobotErrorCode::InvalidJointCount,
                format!("{} values for {} joints", step.data.len(), current.len()),
            );
        }
        if step.data.iter().any(|v| !v.is_finite()) {
            return self.failure(RobotErrorCode::InvalidCommand, "non-finite joint command".to_string());
        }

        let dt = self.backend.timestep();
        let mut target = current.clone();
        for (i, value) in step.data.iter().enumerate() {
            let value = step.unit.to_radians(*value);
            target[i] = match step.command_type {
                CommandType::Absolute if step.relative => current[i] + value,
                CommandType::Absolute => value,
                CommandType::Velocity => current[i] + value * dt,
            };
        }

        match self.backend.step(&target) {
            Ok(()) => self.state(),
            Err(e) => self.failure(RobotErrorCode::InvalidCommand, e.to_string()),
        }
    }

    fn state(&mut self) -> RobotStateResponse {
        self.n_states = self.n_states.wrapping_add(1);
        RobotStateResponse {
            error_id: 0,
            success: true,
            message: String::new(),
            n_states: self.n_states,
            time_offset: 0.0,
            joint_angles: self.backend.joint_angles(),
            joint_velocities: self.backend.joint_velocities(),
            joint_efforts: self.backend.joint_forces(),
            tool_pose: self.backend.tool_pose().into(),
        }
    }

    fn failure(&mut self, code: RobotErrorCode, message: String) -> RobotStateResponse {
        warn!("Rejecting command: {}", message);
        RobotStateResponse {
            error_id: code.into(),
            success: false,
            message,
            ..self.state()
        }
    }
}

/// Parses one request line. Commands the server does not know get an
/// `Unknown` response; anything else that is not a request is dropped.
fn respond(robot: &mut SimulatedRobot, line: &str) -> Option<ResponsePacket> {
    match serde_json::from_str::<SendPacket>(line) {
        Ok(packet) => Some(robot.handle(packet)),
        Err(e) => {
            let value: serde_json::Value = serde_json::from_str(line).ok()?;
            if value.get("Command").is_some() {
                debug!("Unknown command: {}", line);
                Some(ResponsePacket::CommandResponse(CommandResponse::Unknown(UnknownResponse {
                    error_id: RobotErrorCode::InvalidCommand.into(),
                })))
            } else {
                warn!("Ignoring malformed request {} ({})", line, e);
                None
            }
        }
    }
}

async fn handle_client(
    mut socket: TcpStream,
    robot: Arc<Mutex<SimulatedRobot>>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut buffer = vec![0; 2048];
    let mut pending = Vec::new();

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }
        pending.extend_from_slice(&buffer[..n]);

        for line in extract_lines(&mut pending) {
            let response = {
                let mut robot = robot.lock().await;
                respond(&mut robot, &line)
            };
            let Some(response) = response else { continue };

            socket.write_all(response.to_line()?.as_bytes()).await?;

            if matches!(
                response,
                ResponsePacket::CommunicationResponse(CommunicationResponse::Disconnect(_))
            ) {
                socket.shutdown().await?;
                return Ok(());
            }
        }

        if pending.len() > MAX_LINE_BYTES {
            warn!("Dropping client: {} bytes without a line break", pending.len());
            socket.shutdown().await?;
            return Ok(());
        }
    }
}

/// Accepts clients forever. All clients drive the same arm.
pub async fn serve(listener: TcpListener, config: SimConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let robot = Arc::new(Mutex::new(SimulatedRobot::new(&config)?));
    info!("Jaco simulator listening on {}", listener.local_addr()?);

    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!("Client connected from {}", addr);

        let robot = Arc::clone(&robot);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, robot).await {
                warn!("Client {} dropped: {}", addr, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot() -> SimulatedRobot {
        SimulatedRobot::new(&SimConfig::default()).unwrap()
    }

    fn state_of(response: ResponsePacket) -> RobotStateResponse {
        match response {
            ResponsePacket::CommandResponse(r) => r.into_state().unwrap(),
            other => panic!("expected a state response, got {other:?}"),
        }
    }

    #[test]
    fn connect_reports_model() {
        let mut robot = robot();
        match robot.handle(SendPacket::Communication(Communication::Connect)) {
            ResponsePacket::CommunicationResponse(CommunicationResponse::Connect(res)) => {
                assert_eq!(res.robot_type, "j2s7s300");
                assert_eq!(res.error_id, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn state_counter_increments() {
        let mut robot = robot();
        let a = state_of(robot.handle(SendPacket::Command(Command::GetState)));
        let b = state_of(robot.handle(SendPacket::Command(Command::GetState)));
        assert_eq!(b.n_states, a.n_states + 1);
        assert_eq!(a.joint_angles.len(), 13);
    }

    #[test]
    fn relative_absolute_step_moves_joint() {
        let mut robot = robot();
        let before = robot.backend().joint_angles()[0];
        let step = JointStep::new(CommandType::Absolute, true, jaco_rmi::AngleUnit::Radians, vec![0.1]);
        for _ in 0..50 {
            state_of(robot.handle(SendPacket::Command(Command::Step(step.clone()))));
        }
        assert!(robot.backend().joint_angles()[0] > before + 0.1);
    }

    #[test]
    fn too_many_values_is_rejected() {
        let mut robot = robot();
        let state = state_of(robot.handle(SendPacket::Command(Command::Step(JointStep::absolute(vec![0.0; 14])))));
        assert!(!state.success);
        assert_eq!(state.error_id, 3);
        assert!(state.check().is_err());
    }

    #[tokio::test]
    async fn client_without_line_breaks_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, SimConfig::default()));

        let mut socket = TcpStream::connect(addr).await.unwrap();
        let junk = vec![b'x'; MAX_LINE_BYTES + 1];
        // the server may hang up before every byte is written
        let _ = socket.write_all(&junk).await;

        let mut buf = [0u8; 64];
        let n = tokio::time::timeout(std::time::Duration::from_secs(5), socket.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[test]
    fn unknown_command_gets_unknown_response() {
        let mut robot = robot();
        let response = respond(&mut robot, r#"{"Command":"JACO_Teleport"}"#).unwrap();
        assert_eq!(response.to_line().unwrap(), "{\"Command\":\"Unknown\",\"ErrorID\":2}\r\n");
        assert!(respond(&mut robot, "garbage").is_none());
        assert!(respond(&mut robot, r#"{"Hello":1}"#).is_none());
    }
}
