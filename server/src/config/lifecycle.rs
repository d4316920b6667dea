use std::time::Duration;

use log::{info, warn};

use lockstep_shared::State;

use crate::{
    config::Config,
    entity::ResourceCore,
    error::{ConfigError, EntityFailure},
};

/// Entities are started level by level, parents first, and stopped in
/// the reverse order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Level {
    Node,
    Pipe,
    Window,
    Channel,
}

const INIT_ORDER: [Level; 4] = [Level::Node, Level::Pipe, Level::Window, Level::Channel];
const EXIT_ORDER: [Level; 4] = [Level::Channel, Level::Window, Level::Pipe, Level::Node];

fn failure(core: &ResourceCore, reason: String) -> EntityFailure {
    EntityFailure {
        id: core.id(),
        entity: core.lifecycle().name().to_string(),
        reason,
    }
}

impl Config {
    /// Starts every active entity and waits for all of them, one level of
    /// the resource tree at a time.
    ///
    /// Without robustness the first failing level fails the config; the
    /// entities that did start keep running until `exit`. With robustness
    /// failed entities are deactivated together with their children, and
    /// the config fails only if no channel is left.
    pub fn init(&mut self, init_id: u32) -> Result<(), ConfigError> {
        self.lifecycle.start_init()?;
        info!("Initializing {}", self.name);
        self.frame_number = 0;
        self.finished_frame = 0;
        self.init_failures.clear();

        for node in &self.nodes {
            if let Err(err) = node.send_create(self.id) {
                warn!("Could not announce {}: {}", node.name(), err);
            }
        }

        let mut failures = Vec::new();
        for level in INIT_ORDER {
            let level_failures = self.init_level(level, init_id);
            if level_failures.is_empty() {
                continue;
            }
            if !self.server_config.robustness {
                failures = level_failures;
                break;
            }
            for failed in &level_failures {
                warn!("Deactivating {}: {}", failed.entity, failed.reason);
                self.deactivate(failed.id);
            }
            failures.extend(level_failures);
        }

        let success = failures.is_empty()
            || (self.server_config.robustness && !self.active_channels().is_empty());
        if success {
            self.lifecycle.complete_init(true, "")?;
            if !failures.is_empty() {
                warn!(
                    "{} running without {} failed entities",
                    self.name,
                    failures.len()
                );
            }
            self.init_failures = failures;
            return Ok(());
        }

        let reason = failures
            .iter()
            .map(EntityFailure::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        self.lifecycle.complete_init(false, &reason)?;
        self.init_failures = failures.clone();
        Err(ConfigError::InitFailed {
            config: self.name.clone(),
            failures,
        })
    }

    /// Finishes outstanding frames, then stops every started entity,
    /// children first. Failures do not stop the teardown of the others.
    pub fn exit(&mut self) -> Result<(), ConfigError> {
        if self.lifecycle.is_running() && self.finished_frame < self.frame_number {
            if let Err(err) = self.finish_all_frames() {
                warn!("{} stops with unfinished frames: {}", self.name, err);
            }
        }
        self.lifecycle.start_exit()?;
        info!("Stopping {}", self.name);

        for channel in self.channels_mut() {
            channel.abandon_frames();
        }

        let mut failures = Vec::new();
        for level in EXIT_ORDER {
            failures.extend(self.exit_level(level));
        }

        for node in &self.nodes {
            if let Err(err) = node.send_destroy() {
                warn!("Could not tear down {}: {}", node.name(), err);
            }
        }
        self.release_views();

        let failed: Vec<_> = self.init_failures.drain(..).map(|failed| failed.id).collect();
        if self.server_config.robustness {
            for id in failed {
                self.activate(id);
            }
        }

        if failures.is_empty() {
            self.lifecycle.complete_exit(true, "")?;
            return Ok(());
        }
        let reason = failures
            .iter()
            .map(EntityFailure::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        self.lifecycle.complete_exit(false, &reason)?;
        Err(ConfigError::ExitFailed {
            config: self.name.clone(),
            failures,
        })
    }

    /// Clears a failed stop so the config can be initialized again
    pub fn ack_exit(&mut self) -> Result<(), ConfigError> {
        for level in EXIT_ORDER {
            for (core, _) in self.cores_at(level, Duration::ZERO) {
                if core.state() == State::StopFailed {
                    core.lifecycle().ack()?;
                }
            }
        }
        if self.lifecycle.state() == State::StopFailed {
            self.lifecycle.ack()?;
        }
        Ok(())
    }

    /// Sends the init to every active entity of a level, then collects all
    /// answers
    fn init_level(&mut self, level: Level, init_id: u32) -> Vec<EntityFailure> {
        let timeout = self.server_config.init_timeout;
        let mut failures = Vec::new();
        let mut started = Vec::new();
        for (core, timeout) in self.cores_at(level, timeout) {
            if !core.is_active() {
                continue;
            }
            match core.start_config_init(init_id) {
                Ok(()) => started.push((core, timeout)),
                Err(err) => failures.push(failure(core, err.to_string())),
            }
        }
        for (core, timeout) in started {
            match core.sync_config_init(timeout) {
                Ok(true) => {}
                Ok(false) => {
                    let reason = core.lifecycle().error_message();
                    failures.push(failure(core, reason));
                }
                Err(err) => failures.push(failure(core, err.to_string())),
            }
        }
        failures
    }

    fn exit_level(&mut self, level: Level) -> Vec<EntityFailure> {
        let timeout = self.server_config.exit_timeout;
        let mut failures = Vec::new();
        let mut started = Vec::new();
        for (core, timeout) in self.cores_at(level, timeout) {
            if !core.state().can_exit() {
                continue;
            }
            match core.start_config_exit() {
                Ok(()) => started.push((core, timeout)),
                Err(err) => failures.push(failure(core, err.to_string())),
            }
        }
        for (core, timeout) in started {
            match core.sync_config_exit(timeout) {
                Ok(true) => {}
                Ok(false) => {
                    let reason = core.lifecycle().error_message();
                    failures.push(failure(core, reason));
                }
                Err(err) => failures.push(failure(core, err.to_string())),
            }
        }
        failures
    }

    /// The entities of one level with the time each may take to answer.
    /// Nodes answer within their launch timeout.
    fn cores_at(
        &mut self,
        level: Level,
        timeout: Duration,
    ) -> Vec<(&mut ResourceCore, Duration)> {
        let nodes = self.nodes.iter_mut();
        match level {
            Level::Node => nodes
                .map(|node| {
                    let launch_timeout = node.launch_timeout();
                    (node.core_mut(), launch_timeout)
                })
                .collect(),
            Level::Pipe => nodes
                .flat_map(|node| node.pipes.iter_mut())
                .map(|pipe| (pipe.core_mut(), timeout))
                .collect(),
            Level::Window => nodes
                .flat_map(|node| node.pipes.iter_mut())
                .flat_map(|pipe| pipe.windows.iter_mut())
                .map(|window| (window.core_mut(), timeout))
                .collect(),
            Level::Channel => nodes
                .flat_map(|node| node.pipes.iter_mut())
                .flat_map(|pipe| pipe.windows.iter_mut())
                .flat_map(|window| window.channels.iter_mut())
                .map(|channel| (channel.core_mut(), timeout))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lockstep_shared::{CommandCode, NodeId, State};

    use crate::{error::ConfigError, server_config::ServerConfig, test_support::TestConfig};

    fn server_config(robustness: bool) -> ServerConfig {
        ServerConfig {
            robustness,
            init_timeout: Duration::from_secs(5),
            exit_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn init_and_exit_walk_the_whole_tree() {
        let mut test = TestConfig::new(server_config(false), 2);

        test.config.init(1).unwrap();

        assert_eq!(test.config.state(), State::Running);
        for path in &test.channels {
            assert!(test.config.channel(*path).unwrap().is_running());
        }
        assert_eq!(test.nodes.sent(CommandCode::CreateEntity).len(), 8);
        assert_eq!(test.nodes.sent(CommandCode::ConfigInit).len(), 8);

        // nodes are started before their pipes
        let inits = test.nodes.sent(CommandCode::ConfigInit);
        assert_eq!(inits[0].1.target, test.config.nodes()[0].id());
        assert_eq!(inits[1].1.target, test.config.nodes()[1].id());

        test.config.exit().unwrap();

        assert_eq!(test.config.state(), State::Stopped);
        assert!(test
            .config
            .nodes()
            .iter()
            .all(|node| node.core().state() == State::Stopped));
        // channels are stopped first
        let exits = test.nodes.sent(CommandCode::ConfigExit);
        assert_eq!(exits[0].1.target, test.channel_id(0));
        assert_eq!(test.nodes.sent(CommandCode::DestroyEntity).len(), 8);
    }

    #[test]
    fn failed_channel_is_deactivated_with_robustness() {
        let mut test = TestConfig::new(server_config(true), 2);
        test.nodes.fail_init(test.channel_id(1));

        test.config.init(1).unwrap();

        let failed = test.config.channel(test.channels[1]).unwrap();
        assert_eq!(failed.core().state(), State::InitFailed);
        assert!(!failed.is_active());
        assert_eq!(test.config.active_channels(), vec![test.channels[0]]);
        assert_eq!(test.config.init_failures().len(), 1);
        assert_eq!(test.config.init_failures()[0].reason, "no display");

        test.config.exit().unwrap();
        assert!(test.config.channel(test.channels[1]).unwrap().is_active());
    }

    #[test]
    fn failed_channel_fails_the_config_without_robustness() {
        let mut test = TestConfig::new(server_config(false), 2);
        test.nodes.fail_init(test.channel_id(1));

        let Err(ConfigError::InitFailed { failures, .. }) = test.config.init(1) else {
            panic!("init should fail");
        };

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].entity, "channel channel-1");
        assert_eq!(test.config.state(), State::InitFailed);
        assert!(test.config.channel(test.channels[0]).unwrap().is_running());

        // the entities that did start are stopped again
        test.config.exit().unwrap();
        assert_eq!(test.config.state(), State::Stopped);
        assert_eq!(
            test.config.channel(test.channels[0]).unwrap().core().state(),
            State::Stopped
        );
    }

    #[test]
    fn silent_node_times_out() {
        let mut test = TestConfig::new(
            ServerConfig {
                init_timeout: Duration::from_millis(50),
                ..server_config(false)
            },
            1,
        );
        let node = test.config.nodes()[0].id();
        test.nodes.silence(node);

        let Err(ConfigError::InitFailed { failures, .. }) = test.config.init(1) else {
            panic!("init should fail");
        };

        assert_eq!(failures[0].id, node);
        assert!(failures[0].reason.contains("did not finish initializing"));
        assert_eq!(test.config.nodes()[0].core().state(), State::InitFailed);
        // the node never started, so nothing below it was asked to
        assert_eq!(test.nodes.sent(CommandCode::ConfigInit).len(), 1);
    }

    #[test]
    fn unreachable_node_is_dropped_with_robustness() {
        let mut test = TestConfig::new(server_config(true), 2);
        test.nodes.disconnect(NodeId::new(3));

        test.config.init(1).unwrap();

        assert_eq!(test.config.active_channels(), vec![test.channels[0]]);
        assert_eq!(test.config.init_failures()[0].entity, "node node-1");
    }

    #[test]
    fn init_requires_a_stopped_config() {
        let mut test = TestConfig::new(server_config(false), 1);
        test.config.init(1).unwrap();

        assert!(matches!(test.config.init(2), Err(ConfigError::State(_))));
    }
}
