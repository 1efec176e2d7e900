use jaco_rmi::drivers::{RobotClient, RobotClientConfig};
use jaco_rmi::packets::{extract_lines, JointStep};
use jaco_rmi::RmiError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const CONNECT_RESPONSE: &str =
    "{\"Communication\":\"JACO_Connect\",\"ErrorID\":0,\"RobotType\":\"j2n7s300\",\"MajorVersion\":1,\"MinorVersion\":0}\r\n";

/// Answers the handshake, then swallows every further request without replying.
async fn spawn_silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = vec![0; 1024];
        let mut answered_connect = false;
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buffer.extend_from_slice(&chunk[..n]);
            for line in extract_lines(&mut buffer) {
                if !answered_connect && line.contains("JACO_Connect") {
                    socket.write_all(CONNECT_RESPONSE.as_bytes()).await.unwrap();
                    answered_connect = true;
                }
            }
        }
    });

    port
}

#[tokio::test]
async fn test_step_times_out_and_poisons_session() {
    let port = spawn_silent_server().await;
    let config = RobotClientConfig::new("127.0.0.1".to_string(), u32::from(port), 200);

    let mut client = RobotClient::connect(config).await.unwrap();
    assert!(client.is_connected());
    assert_eq!(client.robot_type, "j2n7s300");

    let result = client.step(JointStep::velocity(vec![0.0; 7])).await;
    assert_eq!(result, Err(RmiError::Timeout { waited_ms: 200 }));
    assert!(!client.is_connected());

    // A dead session fails fast instead of waiting on the socket again
    assert_eq!(client.get_state().await, Err(RmiError::Disconnected));
    assert!(client.disconnect().await.is_ok());
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    // Bind and immediately drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut config = RobotClientConfig::new("127.0.0.1".to_string(), u32::from(port), 200);
    config.connect_retries = 1;

    let result = RobotClient::connect(config).await;
    assert!(matches!(result, Err(RmiError::Disconnected)));
}
