//! Daemon lifecycle: start, serve commands, shut down cleanly.

use std::sync::Arc;
use std::time::Duration;

use glowd_core::{Daemon, IpcClient};
use glowd_test_utils::config::TestConfigBuilder;
use glowd_test_utils::tracing_setup::init_test_tracing;

#[tokio::test]
async fn daemon_serves_commands_and_shuts_down() {
    init_test_tracing();

    let dir = tempfile::TempDir::new().unwrap();
    let socket_path = dir.path().join("glowd.sock");
    let config = TestConfigBuilder::new()
        .socket_path(socket_path.to_str().unwrap())
        .serial_port("/dev/glowd-test-no-such-port")
        .led_count(4)
        .update_interval_ms(10)
        .build();

    let daemon = Arc::new(Daemon::new(config).unwrap());
    let runner = {
        let daemon = Arc::clone(&daemon);
        tokio::spawn(async move { daemon.run().await })
    };

    // Wait for the listener socket to come up.
    for _ in 0..100 {
        if socket_path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(socket_path.exists());

    // The update loop runs even though the serial port could not be opened.
    assert!(daemon.driver().is_update_loop_running().await);

    let client = IpcClient::new(&socket_path);
    assert_eq!(client.send_command("status").await.unwrap(), "Running");
    assert_eq!(
        client.send_command("fill 5,6,7").await.unwrap(),
        "OK: Filled with RGB(5,6,7)"
    );

    daemon.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("daemon did not stop in time")
        .unwrap();
    assert!(result.is_ok());

    // Loop joined, socket cleaned up.
    assert!(!daemon.driver().is_update_loop_running().await);
    assert!(!socket_path.exists());
}
