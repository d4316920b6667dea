/// End-to-end tests of swap barriers
/// Channels on different render nodes swap together; a node whose arrival
/// never reaches the server desynchronizes the frame instead of stalling
/// the cluster

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use lockstep_client::ClientConfig;
use lockstep_server::{ChannelPath, Compound, Config, ServerConfig};
use lockstep_shared::CommandCode;
use lockstep_test::TestCluster;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cluster() -> TestCluster {
    let server_config = ServerConfig {
        latency: 0,
        init_timeout: Duration::from_secs(5),
        exit_timeout: Duration::from_secs(5),
        frame_finish_timeout: Duration::from_secs(5),
        swap_barrier_timeout: Duration::from_millis(150),
        ..ServerConfig::default()
    };
    let client_config = ClientConfig {
        swap_release_timeout: Duration::from_millis(400),
        ..ClientConfig::default()
    };
    TestCluster::new(server_config, client_config, 2)
}

/// One channel per node, both behind the barrier "wall"
fn barrier_wall(cluster: &TestCluster) -> (Arc<Mutex<Config>>, Vec<ChannelPath>) {
    let (config, channels) = cluster.wall_config("wall");
    let wall = Compound::new("wall")
        .with_swap_barrier("wall")
        .with_child(Compound::new("left").with_channel(channels[0]))
        .with_child(Compound::new("right").with_channel(channels[1]));
    config.lock().add_compound(wall).unwrap();
    config.lock().init(1).unwrap();
    (config, channels)
}

fn run_frame(config: &Mutex<Config>, frame_id: u32) {
    let mut config = config.lock();
    config.start_frame(frame_id).unwrap();
    config.finish_frame().unwrap();
}

#[test]
fn channels_swap_in_lock_step() {
    init_logging();
    let cluster = cluster();
    let (config, _channels) = barrier_wall(&cluster);

    for frame_id in 1..=3 {
        run_frame(&config, frame_id);
    }

    for (index, channel) in ["channel-0", "channel-1"].into_iter().enumerate() {
        assert_eq!(
            cluster.renderer(index).swaps(channel),
            vec![(1, false), (2, false), (3, false)]
        );
    }
    assert_eq!(cluster.network.delivered(CommandCode::SwapBarrierEnter), 6);
    assert_eq!(cluster.network.delivered(CommandCode::SwapBarrierRelease), 6);
    assert!(config.lock().take_desync_reports().is_empty());

    config.lock().exit().unwrap();
}

#[test]
fn lost_arrival_desynchronizes_only_that_frame() {
    init_logging();
    let cluster = cluster();
    let (config, channels) = barrier_wall(&cluster);
    let missing = TestCluster::channel_id(&config, channels[1]);
    let late_node = TestCluster::node_id(1);
    cluster
        .network
        .lose(late_node, CommandCode::SwapBarrierEnter);

    run_frame(&config, 1);

    // the server gave up on channel-1, channel-1 gave up on the server
    assert_eq!(cluster.renderer(0).swaps("channel-0"), vec![(1, true)]);
    assert_eq!(cluster.renderer(1).swaps("channel-1"), vec![(1, true)]);
    let reports = config.lock().take_desync_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].barrier, "wall");
    assert_eq!(reports[0].frame_number, 1);
    assert_eq!(reports[0].released.len(), 1);
    assert_eq!(reports[0].released[0].name, "channel-0");
    assert_eq!(reports[0].missing.len(), 1);
    assert_eq!(reports[0].missing[0].channel, missing);
    assert_eq!(reports[0].missing[0].node, late_node);

    cluster
        .network
        .stop_losing(late_node, CommandCode::SwapBarrierEnter);
    run_frame(&config, 2);

    assert_eq!(
        cluster.renderer(0).swaps("channel-0"),
        vec![(1, true), (2, false)]
    );
    assert_eq!(
        cluster.renderer(1).swaps("channel-1"),
        vec![(1, true), (2, false)]
    );
    assert!(config.lock().take_desync_reports().is_empty());

    config.lock().exit().unwrap();
}

#[test]
fn deactivated_channel_leaves_the_barrier() {
    init_logging();
    let cluster = cluster();
    let (config, channels) = barrier_wall(&cluster);
    let right = config.lock().channel(channels[1]).unwrap().id();

    assert!(config.lock().deactivate(right));
    run_frame(&config, 1);

    // the remaining channel is the only participant and swaps right away
    assert_eq!(cluster.renderer(0).swaps("channel-0"), vec![(1, false)]);
    assert!(cluster.renderer(1).swaps("channel-1").is_empty());
    assert!(config.lock().take_desync_reports().is_empty());

    assert!(config.lock().activate(right));
    config.lock().exit().unwrap();
}
