use std::sync::Arc;

use parking_lot::Mutex;

use lockstep_client::{ClientConfig, RenderNode, ServerProxy};
use lockstep_server::{ChannelPath, Config, Server, ServerConfig};
use lockstep_shared::{Dispatcher, NodeId, ObjectId, PixelViewport, Viewport};

use crate::{
    helpers::{pump::QueuePump, recording_renderer::RecordingRenderer},
    local_network::LocalNetwork,
};

pub const SERVER: NodeId = NodeId::new(1);
pub const APPLICATION: NodeId = NodeId::new(9);

/// A render node process with its own dispatcher and queue threads
pub struct RenderProcess {
    pub node: RenderNode<RecordingRenderer>,
    pub renderer: RecordingRenderer,
    _pump: QueuePump,
}

/// An application process holding a proxy of the server
pub struct ApplicationProcess {
    pub proxy: ServerProxy,
    _pump: QueuePump,
}

/// A server and a number of render nodes wired through a [`LocalNetwork`].
/// Render node `i` runs as node `i + 2`.
pub struct TestCluster {
    pub network: Arc<LocalNetwork>,
    pub server: Server,
    pub render_nodes: Vec<RenderProcess>,
    _server_pump: QueuePump,
}

impl TestCluster {
    pub fn new(
        server_config: ServerConfig,
        client_config: ClientConfig,
        render_nodes: u32,
    ) -> Self {
        let network = LocalNetwork::new();

        let dispatcher = Arc::new(Dispatcher::new());
        network.attach(SERVER, dispatcher.clone());
        let server_pump = QueuePump::start(&dispatcher);
        let server = Server::new(server_config, dispatcher, network.endpoint(SERVER)).unwrap();

        let render_nodes = (0..render_nodes)
            .map(|index| {
                let node = Self::node_id(index);
                let dispatcher = Arc::new(Dispatcher::deferring());
                network.attach(node, dispatcher.clone());
                let pump = QueuePump::start(&dispatcher);
                let renderer = RecordingRenderer::default();
                let render_node = RenderNode::new(
                    node,
                    client_config.clone(),
                    dispatcher,
                    network.endpoint(node),
                    renderer.clone(),
                )
                .unwrap();
                RenderProcess {
                    node: render_node,
                    renderer,
                    _pump: pump,
                }
            })
            .collect();

        Self {
            network,
            server,
            render_nodes,
            _server_pump: server_pump,
        }
    }

    pub fn node_id(index: u32) -> NodeId {
        NodeId::new(index + 2)
    }

    pub fn render_node(&self, index: usize) -> &RenderNode<RecordingRenderer> {
        &self.render_nodes[index].node
    }

    pub fn renderer(&self, index: usize) -> &RecordingRenderer {
        &self.render_nodes[index].renderer
    }

    /// Starts an application process talking to the server
    pub fn application(&self, client_config: ClientConfig) -> ApplicationProcess {
        let dispatcher = Arc::new(Dispatcher::new());
        self.network.attach(APPLICATION, dispatcher.clone());
        let pump = QueuePump::start(&dispatcher);
        let proxy = ServerProxy::new(
            APPLICATION,
            client_config,
            dispatcher,
            self.network.endpoint(APPLICATION),
        )
        .unwrap();
        ApplicationProcess { proxy, _pump: pump }
    }

    /// Creates a config with one node, pipe, window and channel per render
    /// node, named `node-i`, `pipe-i`, `window-i` and `channel-i`. Returns
    /// the config and its channels.
    pub fn wall_config(&self, name: &str) -> (Arc<Mutex<Config>>, Vec<ChannelPath>) {
        let config = self.server.create_config(name).unwrap();
        let mut channels = Vec::new();
        {
            let mut config = config.lock();
            for index in 0..self.render_nodes.len() as u32 {
                let node = config
                    .add_node(&format!("node-{}", index), Self::node_id(index))
                    .unwrap();
                let pipe = config.add_pipe(node, &format!("pipe-{}", index)).unwrap();
                let window = config
                    .add_window(
                        pipe,
                        &format!("window-{}", index),
                        PixelViewport::new(0, 0, 1280, 720),
                    )
                    .unwrap();
                channels.push(
                    config
                        .add_channel(window, &format!("channel-{}", index), Viewport::FULL)
                        .unwrap(),
                );
            }
        }
        (config, channels)
    }

    pub fn channel_id(config: &Arc<Mutex<Config>>, channel: ChannelPath) -> ObjectId {
        config.lock().channel(channel).unwrap().id()
    }
}
