/// End-to-end tests of the frame loop
/// Compound updates reach render nodes as draw commands, frames finish
/// behind the configured latency, and channels report their frame timing

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use lockstep_client::ClientConfig;
use lockstep_server::{ChannelListener, Compound, ServerConfig};
use lockstep_shared::{FrameNumber, ObjectId, PixelViewport, TaskMask, Viewport};
use lockstep_test::{eventually, Call, TestCluster};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn server_config(latency: u32) -> ServerConfig {
    ServerConfig {
        latency,
        init_timeout: Duration::from_secs(5),
        exit_timeout: Duration::from_secs(5),
        frame_finish_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    }
}

#[derive(Default)]
struct LoadRecorder {
    frames: Mutex<Vec<(ObjectId, FrameNumber, f32, f32)>>,
}

impl ChannelListener for LoadRecorder {
    fn notify_load_data(
        &self,
        channel: ObjectId,
        frame_number: FrameNumber,
        start_time: f32,
        end_time: f32,
    ) {
        self.frames
            .lock()
            .push((channel, frame_number, start_time, end_time));
    }
}

#[test]
fn frames_are_drawn_finished_and_swapped_on_every_node() {
    init_logging();
    let cluster = TestCluster::new(server_config(1), ClientConfig::default(), 2);
    let (config, channels) = cluster.wall_config("wall");
    let wall = Compound::new("wall")
        .with_tasks(TaskMask::DRAW)
        .with_child(
            Compound::new("left")
                .with_channel(channels[0])
                .with_viewport(Viewport::new(0.0, 0.0, 0.5, 1.0)),
        )
        .with_child(Compound::new("right").with_channel(channels[1]));
    config.lock().add_compound(wall).unwrap();
    config.lock().init(1).unwrap();

    for frame_id in [100, 101, 102] {
        config.lock().start_frame(frame_id).unwrap();
        config.lock().finish_frame().unwrap();
    }
    assert_eq!(config.lock().finish_all_frames(), Ok(3));

    let left = cluster.renderer(0).draws("channel-0");
    assert_eq!(left.len(), 3);
    assert_eq!(
        left.iter().map(|context| context.frame_id).collect::<Vec<_>>(),
        vec![100, 101, 102]
    );
    assert_eq!(
        left.iter().map(|context| context.frame_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(left[0].compound, "left");
    assert_eq!(left[0].tasks, TaskMask::DRAW);
    assert_eq!(left[0].pixel_viewport, PixelViewport::new(0, 0, 640, 720));

    let right = cluster.renderer(1).draws("channel-1");
    assert_eq!(right[0].compound, "right");
    assert_eq!(right[0].pixel_viewport, PixelViewport::new(0, 0, 1280, 720));

    // without a swap barrier each channel swaps when its frame finishes
    for (index, channel) in ["channel-0", "channel-1"].into_iter().enumerate() {
        assert_eq!(
            cluster.renderer(index).swaps(channel),
            vec![(1, false), (2, false), (3, false)]
        );
    }
    let calls = cluster.renderer(0).calls();
    let draw = calls
        .iter()
        .position(|call| matches!(call, Call::Draw(_, context) if context.frame_number == 1))
        .unwrap();
    let finish = calls
        .iter()
        .position(|call| *call == Call::Finish("channel-0".to_string(), 1))
        .unwrap();
    assert!(draw < finish);

    config.lock().exit().unwrap();
}

#[test]
fn finish_frame_stays_behind_the_latency() {
    init_logging();
    let cluster = TestCluster::new(server_config(2), ClientConfig::default(), 1);
    let (config, channels) = cluster.wall_config("wall");
    config
        .lock()
        .add_compound(Compound::new("single").with_channel(channels[0]))
        .unwrap();
    config.lock().init(1).unwrap();

    let mut finished = Vec::new();
    for frame_id in 0..4 {
        let mut config = config.lock();
        config.start_frame(frame_id).unwrap();
        finished.push(config.finish_frame().unwrap());
    }

    assert_eq!(finished, vec![0, 0, 1, 2]);
    assert_eq!(config.lock().frame_number(), 4);
    assert_eq!(config.lock().finished_frame(), 2);

    // exit drains the frames still in flight
    config.lock().exit().unwrap();
    assert_eq!(config.lock().finished_frame(), 4);
    assert_eq!(cluster.renderer(0).draws("channel-0").len(), 4);
}

#[test]
fn finished_frames_report_their_timing() {
    init_logging();
    let cluster = TestCluster::new(server_config(0), ClientConfig::default(), 1);
    let (config, channels) = cluster.wall_config("wall");
    config
        .lock()
        .add_compound(Compound::new("single").with_channel(channels[0]))
        .unwrap();
    let recorder = Arc::new(LoadRecorder::default());
    config
        .lock()
        .channel(channels[0])
        .unwrap()
        .add_listener(recorder.clone());
    config.lock().init(1).unwrap();

    config.lock().start_frame(1).unwrap();
    config.lock().finish_frame().unwrap();
    config.lock().start_frame(2).unwrap();
    config.lock().finish_frame().unwrap();

    let channel = TestCluster::channel_id(&config, channels[0]);
    // listeners run right after the reply is handed to the waiting frame
    let frames = eventually(|| {
        let frames = recorder.frames.lock().clone();
        (frames.len() == 2).then_some(frames)
    });
    assert_eq!(frames[0].0, channel);
    assert_eq!(frames[0].1, 1);
    assert_eq!(frames[1].1, 2);
    assert!(frames.iter().all(|(_, _, start, end)| start <= end));

    config.lock().exit().unwrap();
}

#[test]
fn near_far_reported_by_a_node_reaches_the_server() {
    init_logging();
    let cluster = TestCluster::new(server_config(1), ClientConfig::default(), 1);
    let (config, channels) = cluster.wall_config("wall");
    config.lock().init(1).unwrap();
    let channel = TestCluster::channel_id(&config, channels[0]);

    cluster
        .render_node(0)
        .set_near_far(channel, 0.5, 200.0)
        .unwrap();

    eventually(|| {
        (config.lock().channel(channels[0]).unwrap().near_far() == (0.5, 200.0)).then_some(())
    });
    config.lock().exit().unwrap();
}
