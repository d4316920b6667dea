use std::sync::Arc;

use log::info;

use lockstep_shared::{
    fulfil_reply,
    packets::{
        ChooseConfigPacket, ChooseConfigReplyPacket, ConfigDescription, ConfigParams,
        ReleaseConfigPacket, ReleaseConfigReplyPacket, ShutdownPacket, ShutdownReplyPacket,
    },
    Command, CommandCode, CommandError, CommandSender, Dispatcher, NodeId, ObjectId, Packet,
    QueueKind, RequestHandler,
};

use crate::{client_config::ClientConfig, error::ClientError};

/// An application's handle on the server. Every call sends a request to
/// [`ObjectId::SERVER`] and blocks until the reply arrives or the protocol's
/// request timeout passes.
pub struct ServerProxy {
    node: NodeId,
    client_config: ClientConfig,
    dispatcher: Arc<Dispatcher>,
    sender: Arc<dyn CommandSender>,
    choose_replies: Arc<RequestHandler<ChooseConfigReplyPacket>>,
    release_replies: Arc<RequestHandler<ReleaseConfigReplyPacket>>,
    shutdown_replies: Arc<RequestHandler<ShutdownReplyPacket>>,
}

impl ServerProxy {
    /// Creates a proxy for the application running as `node` and installs
    /// its reply handlers on `dispatcher`
    pub fn new(
        node: NodeId,
        client_config: ClientConfig,
        dispatcher: Arc<Dispatcher>,
        sender: Arc<dyn CommandSender>,
    ) -> Result<Self, ClientError> {
        let proxy = Self {
            node,
            client_config,
            dispatcher,
            sender,
            choose_replies: Arc::new(RequestHandler::new()),
            release_replies: Arc::new(RequestHandler::new()),
            shutdown_replies: Arc::new(RequestHandler::new()),
        };
        proxy.register_handlers()?;
        Ok(proxy)
    }

    /// Asks the server for a config matching `params`. `None` if every
    /// matching config is taken.
    pub fn choose_config(
        &self,
        params: &ConfigParams,
    ) -> Result<Option<ConfigDescription>, ClientError> {
        let reply = self.call(
            &self.choose_replies,
            &ChooseConfigPacket {
                params: params.clone(),
                node: self.node,
            },
        )?;
        if let Some(config) = &reply.config {
            info!("{} chose config {} ({})", self.node, config.name, config.id);
        }
        Ok(reply.config)
    }

    /// Hands a config back. False if this application did not hold it.
    pub fn release_config(&self, config: ObjectId) -> Result<bool, ClientError> {
        let reply = self.call(
            &self.release_replies,
            &ReleaseConfigPacket {
                config,
                node: self.node,
            },
        )?;
        Ok(reply.released)
    }

    /// Stops the server. False while a config is still in use.
    pub fn shutdown(&self) -> Result<bool, ClientError> {
        let reply = self.call(&self.shutdown_replies, &ShutdownPacket { node: self.node })?;
        Ok(reply.success)
    }

    fn call<P: Packet, Q>(
        &self,
        replies: &RequestHandler<Q>,
        packet: &P,
    ) -> Result<Q, ClientError> {
        let request = replies.register();
        let command = Command::request(ObjectId::SERVER, packet, request.id());
        if let Err(err) = self.sender.send(self.client_config.server, command) {
            replies.abandon(request.id());
            return Err(err.into());
        }
        Ok(replies.wait(request.id(), self.client_config.protocol.request_timeout)?)
    }

    fn register_handlers(&self) -> Result<(), CommandError> {
        let replies = self.choose_replies.clone();
        self.dispatcher.register(
            ObjectId::SERVER,
            CommandCode::ChooseConfigReply,
            QueueKind::CommandThread,
            move |command| fulfil_reply(&replies, command),
        )?;

        let replies = self.release_replies.clone();
        self.dispatcher.register(
            ObjectId::SERVER,
            CommandCode::ReleaseConfigReply,
            QueueKind::CommandThread,
            move |command| fulfil_reply(&replies, command),
        )?;

        let replies = self.shutdown_replies.clone();
        self.dispatcher.register(
            ObjectId::SERVER,
            CommandCode::ShutdownReply,
            QueueKind::CommandThread,
            move |command| fulfil_reply(&replies, command),
        )
    }
}

impl Drop for ServerProxy {
    fn drop(&mut self) {
        for code in [
            CommandCode::ChooseConfigReply,
            CommandCode::ReleaseConfigReply,
            CommandCode::ShutdownReply,
        ] {
            self.dispatcher.deregister(ObjectId::SERVER, code);
        }
    }
}
