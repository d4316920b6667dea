/// End-to-end tests of view replication
/// Render nodes map the views of a config's layouts and follow the changes
/// the server commits with every frame

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use lockstep_client::{ClientConfig, ClientError};
use lockstep_server::{Config, ServerConfig};
use lockstep_shared::{
    CommandCode, ObjectId, ProtocolConfig, ReplicationError, RequestError, Version, View,
    Viewport,
};
use lockstep_test::{eventually, TestCluster};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn server_config() -> ServerConfig {
    ServerConfig {
        init_timeout: Duration::from_secs(5),
        exit_timeout: Duration::from_secs(5),
        frame_finish_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    }
}

fn view_wall(cluster: &TestCluster) -> (Arc<Mutex<Config>>, ObjectId) {
    let (config, _channels) = cluster.wall_config("wall");
    let view = {
        let mut config = config.lock();
        let layout = config.add_layout("main");
        let mut center = View::new("center");
        center.set_near_far(0.1, 100.0);
        config.add_view(layout, center).unwrap()
    };
    config.lock().init(1).unwrap();
    (config, view)
}

#[test]
fn nodes_follow_view_changes_committed_by_frames() {
    init_logging();
    let cluster = TestCluster::new(server_config(), ClientConfig::default(), 2);
    let (config, view) = view_wall(&cluster);

    for index in 0..2 {
        assert_eq!(
            cluster.render_node(index).map_view(view).unwrap(),
            Version::FIRST
        );
    }

    config
        .lock()
        .view(view)
        .unwrap()
        .lock()
        .state_mut()
        .set_viewport(Viewport::new(0.0, 0.0, 0.5, 1.0));
    config.lock().start_frame(1).unwrap();
    config
        .lock()
        .view(view)
        .unwrap()
        .lock()
        .state_mut()
        .set_name("left");
    config.lock().start_frame(2).unwrap();
    config.lock().finish_all_frames().unwrap();

    let latest = Version::FIRST.next().next();
    for index in 0..2 {
        let node = cluster.render_node(index);
        assert_eq!(node.sync_view(view, latest).unwrap(), latest);
        let mirrored = node.view(view).unwrap();
        assert_eq!(mirrored.name(), "left");
        assert_eq!(*mirrored.viewport(), Viewport::new(0.0, 0.0, 0.5, 1.0));
        assert!(!node.view_needs_resync(view));
    }
    assert_eq!(cluster.network.delivered(CommandCode::ObjectDelta), 4);

    config.lock().exit().unwrap();
}

#[test]
fn unmapped_node_stops_receiving_changes() {
    init_logging();
    let cluster = TestCluster::new(server_config(), ClientConfig::default(), 1);
    let (config, view) = view_wall(&cluster);
    let node = cluster.render_node(0);
    node.map_view(view).unwrap();

    node.unmap_view(view).unwrap();
    let master = config.lock().view(view).unwrap();
    eventually(|| (master.lock().slaves().count() == 0).then_some(()));

    master.lock().state_mut().set_name("left");
    config.lock().commit_views().unwrap();

    assert_eq!(cluster.network.delivered(CommandCode::ObjectDelta), 0);
    assert_eq!(node.view(view), None);
    assert_eq!(
        node.sync_view_latest(view),
        Err(ClientError::ViewNotMapped { view })
    );

    config.lock().exit().unwrap();
}

#[test]
fn mapping_twice_or_an_unknown_view_fails() {
    init_logging();
    let client_config = ClientConfig {
        protocol: ProtocolConfig {
            request_timeout: Duration::from_millis(200),
            ..ProtocolConfig::default()
        },
        ..ClientConfig::default()
    };
    let cluster = TestCluster::new(server_config(), client_config, 1);
    let (config, view) = view_wall(&cluster);
    let node = cluster.render_node(0);
    node.map_view(view).unwrap();

    assert!(matches!(
        node.map_view(view),
        Err(ClientError::Replication(ReplicationError::SlaveAlreadyMapped { .. }))
    ));

    // nothing answers for an id no config owns
    let unknown = ObjectId::new(900);
    assert!(matches!(
        node.map_view(unknown),
        Err(ClientError::Request(RequestError::Timeout { .. }))
    ));
    assert_eq!(node.view(unknown), None);

    config.lock().exit().unwrap();
}

#[test]
fn remap_catches_up_after_missed_changes() {
    init_logging();
    let cluster = TestCluster::new(server_config(), ClientConfig::default(), 1);
    let (config, view) = view_wall(&cluster);
    let node = cluster.render_node(0);
    node.map_view(view).unwrap();

    cluster
        .network
        .lose(lockstep_test::SERVER, CommandCode::ObjectDelta);
    let master = config.lock().view(view).unwrap();
    master.lock().state_mut().set_name("left");
    config.lock().commit_views().unwrap();
    cluster
        .network
        .stop_losing(lockstep_test::SERVER, CommandCode::ObjectDelta);

    assert_eq!(node.sync_view_latest(view).unwrap(), Version::FIRST);
    let version = node.remap_view(view).unwrap();

    assert_eq!(version, Version::FIRST.next());
    assert_eq!(node.view(view).unwrap().name(), "left");

    config.lock().exit().unwrap();
}
