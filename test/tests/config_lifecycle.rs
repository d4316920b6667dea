/// End-to-end tests of config init and exit
/// A server drives real render nodes over the local network: entity
/// creation, level-by-level init, robustness and teardown

use std::time::Duration;

use lockstep_client::ClientConfig;
use lockstep_server::{ConfigError, ServerConfig};
use lockstep_shared::State;
use lockstep_test::{eventually, Call, TestCluster};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn server_config(robustness: bool) -> ServerConfig {
    ServerConfig {
        robustness,
        init_timeout: Duration::from_secs(5),
        exit_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    }
}

fn init(name: &str) -> Call {
    Call::Init(name.to_string())
}

fn exit(name: &str) -> Call {
    Call::Exit(name.to_string())
}

#[test]
fn config_starts_and_stops_every_render_node() {
    init_logging();
    let cluster = TestCluster::new(server_config(false), ClientConfig::default(), 2);
    let (config, channels) = cluster.wall_config("wall");

    config.lock().init(1).unwrap();

    assert_eq!(config.lock().state(), State::Running);
    for (index, path) in channels.iter().enumerate() {
        let node = cluster.render_node(index);
        let channel = TestCluster::channel_id(&config, *path);
        assert_eq!(node.entity_count(), 4);
        assert_eq!(node.entity_state(channel), Some(State::Running));
        assert_eq!(node.entity(channel).unwrap().name, format!("channel-{}", index));
    }
    // parents are started before their children
    assert_eq!(
        cluster.renderer(0).calls(),
        vec![init("node-0"), init("pipe-0"), init("window-0"), init("channel-0")]
    );

    config.lock().exit().unwrap();

    assert_eq!(config.lock().state(), State::Stopped);
    for index in 0..2 {
        eventually(|| (cluster.render_node(index).entity_count() == 0).then_some(()));
    }
    assert_eq!(
        cluster.renderer(1).calls()[4..],
        [exit("channel-1"), exit("window-1"), exit("pipe-1"), exit("node-1")]
    );
}

#[test]
fn config_can_be_initialized_again_after_exit() {
    init_logging();
    let cluster = TestCluster::new(server_config(false), ClientConfig::default(), 1);
    let (config, channels) = cluster.wall_config("wall");
    let channel = TestCluster::channel_id(&config, channels[0]);

    config.lock().init(1).unwrap();
    config.lock().exit().unwrap();
    eventually(|| (cluster.render_node(0).entity_count() == 0).then_some(()));

    config.lock().init(2).unwrap();

    assert_eq!(
        cluster.render_node(0).entity_state(channel),
        Some(State::Running)
    );
    config.lock().exit().unwrap();
}

#[test]
fn failed_window_is_left_out_with_robustness() {
    init_logging();
    let cluster = TestCluster::new(server_config(true), ClientConfig::default(), 2);
    cluster.renderer(1).fail_init("window-1");
    let (config, channels) = cluster.wall_config("wall");

    config.lock().init(1).unwrap();

    {
        let mut config = config.lock();
        assert!(config.is_running());
        let window = config.window(channels[1].parent()).unwrap().id();
        let failures = config.init_failures().to_vec();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, window);
        assert!(failures[0].reason.contains("window-1 has no display"));
        assert_eq!(config.active_channels(), vec![channels[0]]);
    }
    let channel = TestCluster::channel_id(&config, channels[1]);
    assert_eq!(
        cluster.render_node(1).entity_state(channel),
        Some(State::Stopped)
    );
    assert!(!cluster
        .renderer(1)
        .calls()
        .contains(&init("channel-1")));

    config.lock().start_frame(1).unwrap();
    config.lock().finish_all_frames().unwrap();

    assert_eq!(cluster.renderer(0).draws("channel-0").len(), 1);
    assert!(cluster.renderer(1).draws("channel-1").is_empty());

    config.lock().exit().unwrap();
    // the window takes part in the next init again
    assert!(config
        .lock()
        .active_channels()
        .contains(&channels[1]));
}

#[test]
fn failed_pipe_fails_the_config_without_robustness() {
    init_logging();
    let cluster = TestCluster::new(server_config(false), ClientConfig::default(), 2);
    cluster.renderer(0).fail_init("pipe-0");
    let (config, _channels) = cluster.wall_config("wall");

    let result = config.lock().init(1);

    match result {
        Err(ConfigError::InitFailed { config: name, failures }) => {
            assert_eq!(name, "wall");
            assert_eq!(failures.len(), 1);
            assert!(failures[0].reason.contains("pipe-0 has no display"));
        }
        other => panic!("expected an init failure, got {:?}", other),
    }
    assert_eq!(config.lock().state(), State::InitFailed);
    // no window was started once a pipe failed
    assert!(!cluster.renderer(1).calls().contains(&init("window-1")));

    config.lock().exit().unwrap();
    assert_eq!(config.lock().state(), State::Stopped);
}

#[test]
fn unreachable_node_fails_the_exit_until_acknowledged() {
    init_logging();
    let cluster = TestCluster::new(server_config(true), ClientConfig::default(), 2);
    let (config, channels) = cluster.wall_config("wall");
    cluster.network.disconnect(TestCluster::node_id(1));

    config.lock().init(1).unwrap();

    {
        let mut config = config.lock();
        let node = config.nodes()[1].id();
        let failures = config.init_failures().to_vec();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, node);
        assert!(failures[0].reason.contains("disconnected"));
        assert_eq!(config.active_channels(), vec![channels[0]]);
    }
    assert_eq!(cluster.render_node(1).entity_count(), 0);

    assert!(matches!(
        config.lock().exit(),
        Err(ConfigError::ExitFailed { .. })
    ));
    assert_eq!(config.lock().state(), State::StopFailed);

    config.lock().ack_exit().unwrap();
    assert_eq!(config.lock().state(), State::Stopped);
}
