/// End-to-end tests of the application's server proxy
/// Configs are chosen, released and the server shut down through requests
/// that cross the local network

use std::time::Duration;

use lockstep_client::{ClientConfig, ClientError};
use lockstep_server::ServerConfig;
use lockstep_shared::{packets::ConfigParams, CommandError, ProtocolConfig};
use lockstep_test::{TestCluster, SERVER};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn client_config() -> ClientConfig {
    ClientConfig {
        protocol: ProtocolConfig {
            request_timeout: Duration::from_secs(2),
            ..ProtocolConfig::default()
        },
        ..ClientConfig::default()
    }
}

fn params(name: &str) -> ConfigParams {
    ConfigParams {
        name: name.to_string(),
        ..ConfigParams::default()
    }
}

#[test]
fn application_holds_a_config_until_released() {
    init_logging();
    let cluster = TestCluster::new(ServerConfig::default(), client_config(), 0);
    cluster.server.create_config("wall").unwrap();
    let desk = cluster.server.create_config("desk").unwrap();
    let application = cluster.application(client_config());

    let chosen = application
        .proxy
        .choose_config(&params("desk"))
        .unwrap()
        .unwrap();
    assert_eq!(chosen.id, desk.lock().id());
    assert_eq!(application.proxy.choose_config(&params("desk")).unwrap(), None);

    // a config in use keeps the server alive
    assert!(!application.proxy.shutdown().unwrap());
    assert!(!cluster.server.is_shut_down());

    assert!(application.proxy.release_config(chosen.id).unwrap());
    assert!(!application.proxy.release_config(chosen.id).unwrap());

    assert!(application.proxy.shutdown().unwrap());
    assert!(cluster.server.wait_shutdown(Duration::from_secs(1)));
}

#[test]
fn unreachable_server_fails_the_call() {
    init_logging();
    let cluster = TestCluster::new(ServerConfig::default(), client_config(), 0);
    cluster.server.create_config("wall").unwrap();
    let application = cluster.application(client_config());
    cluster.network.disconnect(SERVER);

    assert!(matches!(
        application.proxy.choose_config(&params("")),
        Err(ClientError::Command(CommandError::Transport { .. }))
    ));

    cluster.network.reconnect(SERVER);
    let chosen = application.proxy.choose_config(&params("")).unwrap();
    assert_eq!(chosen.map(|config| config.name), Some("wall".to_string()));
}
