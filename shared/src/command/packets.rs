//! Packets exchanged between the server, render nodes and applications.
//! Replies mirror the request they answer.

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    command::{CommandCode, Packet},
    object::ObjectDelta,
    render::RenderContext,
    types::{EntityKind, FrameNumber, InstanceId, NodeId, ObjectId},
};

macro_rules! packet {
    ($(#[$meta:meta])* $name:ident => $code:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            $(pub $field: $ty),*
        }

        impl Serde for $name {
            #[allow(unused_variables)]
            fn ser(&self, writer: &mut dyn BitWrite) {
                $(self.$field.ser(writer);)*
            }

            #[allow(unused_variables)]
            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                Ok(Self {
                    $($field: <$ty>::de(reader)?),*
                })
            }
        }

        impl Packet for $name {
            const CODE: CommandCode = CommandCode::$code;
        }
    };
}

// Entity lifecycle

packet!(
    /// Sent to a render node before an entity's init so the node can build
    /// its mirror. Parents are always created before their children.
    CreateEntityPacket => CreateEntity {
        kind: EntityKind,
        id: ObjectId,
        parent: Option<ObjectId>,
        name: String,
    }
);

packet!(DestroyEntityPacket => DestroyEntity { id: ObjectId });

packet!(ConfigInitPacket => ConfigInit { init_id: u32 });

packet!(ConfigInitReplyPacket => ConfigInitReply { success: bool, error: String });

packet!(ConfigExitPacket => ConfigExit {});

packet!(ConfigExitReplyPacket => ConfigExitReply { success: bool, error: String });

// Frame

packet!(
    /// Render work for one compound. `swap_barrier` is set on the last draw
    /// task of the frame when the channel has to rendezvous before swapping.
    ChannelFrameDrawPacket => ChannelFrameDraw {
        config: ObjectId,
        context: RenderContext,
        swap_barrier: Option<String>,
    }
);

packet!(ChannelFrameFinishPacket => ChannelFrameFinish {
    frame_id: u32,
    frame_number: FrameNumber,
});

packet!(
    /// Times are milliseconds since the node started its clock
    ChannelFrameFinishReplyPacket => ChannelFrameFinishReply {
        frame_number: FrameNumber,
        start_time: f32,
        end_time: f32,
    }
);

packet!(ChannelSetNearFarPacket => ChannelSetNearFar { near: f32, far: f32 });

packet!(SwapBarrierEnterPacket => SwapBarrierEnter {
    barrier: String,
    frame_number: FrameNumber,
    channel: ObjectId,
});

packet!(SwapBarrierReleasePacket => SwapBarrierRelease {
    barrier: String,
    frame_number: FrameNumber,
    desynchronized: bool,
});

// Replication

packet!(
    /// Asks the master for a snapshot; later deltas go to `node`
    ObjectMapPacket => ObjectMap {
        instance_id: InstanceId,
        node: NodeId,
    }
);

packet!(ObjectMapReplyPacket => ObjectMapReply { snapshot: Option<ObjectDelta> });

packet!(ObjectUnmapPacket => ObjectUnmap { instance_id: InstanceId });

packet!(ObjectDeltaPacket => ObjectDelta { delta: ObjectDelta });

// Server

/// What an application asks the server for when choosing a config
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigParams {
    /// Name of the wanted config, empty for any
    pub name: String,
    pub render_client: String,
    pub work_dir: String,
}

impl Serde for ConfigParams {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.name.ser(writer);
        self.render_client.ser(writer);
        self.work_dir.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            name: String::de(reader)?,
            render_client: String::de(reader)?,
            work_dir: String::de(reader)?,
        })
    }
}

/// A config handed to an application
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigDescription {
    pub id: ObjectId,
    pub name: String,
}

impl Serde for ConfigDescription {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.name.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: ObjectId::de(reader)?,
            name: String::de(reader)?,
        })
    }
}

packet!(ChooseConfigPacket => ChooseConfig { params: ConfigParams, node: NodeId });

packet!(ChooseConfigReplyPacket => ChooseConfigReply { config: Option<ConfigDescription> });

packet!(ReleaseConfigPacket => ReleaseConfig { config: ObjectId, node: NodeId });

packet!(ReleaseConfigReplyPacket => ReleaseConfigReply { released: bool });

packet!(
    /// `node` receives the reply
    ShutdownPacket => Shutdown { node: NodeId }
);

packet!(ShutdownReplyPacket => ShutdownReply { success: bool });

#[cfg(test)]
mod tests {
    use crate::{
        command::Command,
        render::{Eye, Frustum, PixelViewport, TaskMask, Viewport},
    };

    use super::*;

    #[test]
    fn draw_packet_survives_the_wire() {
        let packet = ChannelFrameDrawPacket {
            config: ObjectId::new(17),
            context: RenderContext {
                frame_id: 4,
                frame_number: 12,
                compound: "left".to_string(),
                tasks: TaskMask::CLEAR | TaskMask::DRAW,
                eye: Eye::Left,
                viewport: Viewport::new(0.0, 0.0, 0.5, 1.0),
                pixel_viewport: PixelViewport::new(0, 0, 640, 720),
                frustum: Frustum::default(),
            },
            swap_barrier: Some("wall".to_string()),
        };
        let command = Command::new(ObjectId::new(30), &packet);
        let decoded = Command::from_bytes(&command.to_bytes()).unwrap();

        assert_eq!(decoded.read::<ChannelFrameDrawPacket>().unwrap(), packet);
    }

    #[test]
    fn empty_packets_have_no_payload_bits() {
        let command = Command::new(ObjectId::new(40), &ConfigExitPacket {});

        assert!(command.payload.is_empty());
        assert_eq!(command.read::<ConfigExitPacket>().unwrap(), ConfigExitPacket {});
    }
}
