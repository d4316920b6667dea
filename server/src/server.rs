use std::{sync::Arc, time::Duration};

use log::{info, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    packets::{
        ChooseConfigPacket, ChooseConfigReplyPacket, ConfigDescription, ConfigParams,
        ReleaseConfigPacket, ReleaseConfigReplyPacket, ShutdownPacket, ShutdownReplyPacket,
    },
    CommandCode, CommandResult, CommandSender, Dispatcher, Monitor, NodeId, ObjectId,
    ObjectIdGenerator, QueueKind,
};

use crate::{config::Config, error::ConfigError, server_config::ServerConfig};

struct ConfigEntry {
    description: ConfigDescription,
    config: Arc<Mutex<Config>>,
    owner: Option<NodeId>,
}

/// The config registry applications talk to. Configs are handed out to one
/// application at a time; the server only shuts down when none is in use.
pub struct Server {
    server_config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    sender: Arc<dyn CommandSender>,
    ids: Arc<ObjectIdGenerator>,
    configs: Arc<Mutex<Vec<ConfigEntry>>>,
    shut_down: Arc<Monitor<bool>>,
}

impl Server {
    /// Creates a server and installs its handlers on `dispatcher`
    pub fn new(
        server_config: ServerConfig,
        dispatcher: Arc<Dispatcher>,
        sender: Arc<dyn CommandSender>,
    ) -> Result<Self, ConfigError> {
        let server = Self {
            server_config,
            dispatcher,
            sender,
            ids: Arc::new(ObjectIdGenerator::new()),
            configs: Arc::new(Mutex::new(Vec::new())),
            shut_down: Arc::new(Monitor::new(false)),
        };
        server.register_handlers()?;
        Ok(server)
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.server_config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Creates an empty config; fill it through the returned handle
    pub fn create_config(&self, name: &str) -> Result<Arc<Mutex<Config>>, ConfigError> {
        let config = Config::new(
            name,
            self.server_config.clone(),
            self.dispatcher.clone(),
            self.sender.clone(),
            self.ids.clone(),
        )?;
        let description = ConfigDescription {
            id: config.id(),
            name: name.to_string(),
        };
        let config = Arc::new(Mutex::new(config));
        self.configs.lock().push(ConfigEntry {
            description,
            config: config.clone(),
            owner: None,
        });
        Ok(config)
    }

    pub fn config(&self, id: ObjectId) -> Option<Arc<Mutex<Config>>> {
        self.configs
            .lock()
            .iter()
            .find(|entry| entry.description.id == id)
            .map(|entry| entry.config.clone())
    }

    pub fn configs(&self) -> Vec<ConfigDescription> {
        self.configs
            .lock()
            .iter()
            .map(|entry| entry.description.clone())
            .collect()
    }

    /// Hands the first free config matching `params` to `node`
    pub fn choose_config(&self, params: &ConfigParams, node: NodeId) -> Option<ConfigDescription> {
        choose(&self.configs, params, node)
    }

    /// Returns a config to the pool. False if it was not handed out.
    pub fn release_config(&self, id: ObjectId) -> bool {
        release(&self.configs, id)
    }

    /// Stops the server unless a config is still in use
    pub fn shutdown(&self) -> bool {
        shutdown(&self.configs, &self.shut_down)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.get()
    }

    /// Blocks until the server was shut down or `timeout` passed
    pub fn wait_shutdown(&self, timeout: Duration) -> bool {
        self.shut_down.wait_eq_timeout(&true, timeout).is_some()
    }

    fn register_handlers(&self) -> Result<(), ConfigError> {
        let configs = self.configs.clone();
        let sender = self.sender.clone();
        self.dispatcher.register(
            ObjectId::SERVER,
            CommandCode::ChooseConfig,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<ChooseConfigPacket>()?;
                let config = choose(&configs, &packet.params, packet.node);
                sender.send(packet.node, command.reply(&ChooseConfigReplyPacket { config }))?;
                Ok(CommandResult::Handled)
            },
        )?;

        let configs = self.configs.clone();
        let sender = self.sender.clone();
        self.dispatcher.register(
            ObjectId::SERVER,
            CommandCode::ReleaseConfig,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<ReleaseConfigPacket>()?;
                let released = release(&configs, packet.config);
                sender.send(
                    packet.node,
                    command.reply(&ReleaseConfigReplyPacket { released }),
                )?;
                Ok(CommandResult::Handled)
            },
        )?;

        let configs = self.configs.clone();
        let sender = self.sender.clone();
        let shut_down = self.shut_down.clone();
        self.dispatcher.register(
            ObjectId::SERVER,
            CommandCode::Shutdown,
            QueueKind::NodeThread,
            move |command| {
                let packet = command.read::<ShutdownPacket>()?;
                let success = shutdown(&configs, &shut_down);
                sender.send(packet.node, command.reply(&ShutdownReplyPacket { success }))?;
                Ok(CommandResult::Handled)
            },
        )?;
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.dispatcher.deregister_object(ObjectId::SERVER);
    }
}

fn choose(
    configs: &Mutex<Vec<ConfigEntry>>,
    params: &ConfigParams,
    node: NodeId,
) -> Option<ConfigDescription> {
    let mut configs = configs.lock();
    let Some(entry) = configs.iter_mut().find(|entry| {
        entry.owner.is_none() && (params.name.is_empty() || entry.description.name == params.name)
    }) else {
        warn!("No free config for {} matching {:?}", node, params.name);
        return None;
    };
    entry.owner = Some(node);
    info!("{} uses config {}", node, entry.description.name);
    Some(entry.description.clone())
}

fn release(configs: &Mutex<Vec<ConfigEntry>>, id: ObjectId) -> bool {
    let mut configs = configs.lock();
    match configs
        .iter_mut()
        .find(|entry| entry.description.id == id && entry.owner.is_some())
    {
        Some(entry) => {
            entry.owner = None;
            info!("Config {} released", entry.description.name);
            true
        }
        None => {
            warn!("Release of {} which is not in use", id);
            false
        }
    }
}

fn shutdown(configs: &Mutex<Vec<ConfigEntry>>, shut_down: &Monitor<bool>) -> bool {
    let in_use = configs
        .lock()
        .iter()
        .filter(|entry| entry.owner.is_some())
        .count();
    if in_use > 0 {
        warn!("Refusing to shut down, {} configs in use", in_use);
        return false;
    }
    info!("Server shutting down");
    shut_down.set(true);
    true
}
