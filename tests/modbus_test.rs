use sunspec_curtail::config::ModbusConfig;
use sunspec_curtail::modbus::{ModbusClient, ModbusLike};

#[test]
fn test_modbus_client_starts_disconnected() {
    let config = ModbusConfig::default();
    let client = ModbusClient::new(&config, 126);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_write_without_connection_fails() {
    let config = ModbusConfig::default();
    let mut client = ModbusClient::new(&config, 126);
    let err = client
        .write_multiple_registers(40155, &[5000])
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let config = ModbusConfig::default();
    let mut client = ModbusClient::new(&config, 126);
    client.disconnect();
    ModbusLike::disconnect(&mut client);
    assert!(!client.is_connected());
}
