use std::fmt;

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

macro_rules! command_codes {
    ($($code:ident = $value:literal),* $(,)?) => {
        /// Identifies the packet type carried by a command
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CommandCode {
            $($code),*
        }

        impl CommandCode {
            pub fn to_u16(&self) -> u16 {
                match self {
                    $(CommandCode::$code => $value),*
                }
            }

            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $($value => Some(CommandCode::$code),)*
                    _ => None,
                }
            }
        }
    };
}

command_codes! {
    // Entity lifecycle
    CreateEntity = 1,
    DestroyEntity = 2,
    ConfigInit = 3,
    ConfigInitReply = 4,
    ConfigExit = 5,
    ConfigExitReply = 6,

    // Frame
    ChannelFrameDraw = 10,
    ChannelFrameFinish = 11,
    ChannelFrameFinishReply = 12,
    ChannelSetNearFar = 13,
    SwapBarrierEnter = 14,
    SwapBarrierRelease = 15,

    // Replication
    ObjectMap = 20,
    ObjectMapReply = 21,
    ObjectUnmap = 22,
    ObjectDelta = 23,

    // Server
    ChooseConfig = 30,
    ChooseConfigReply = 31,
    ReleaseConfig = 32,
    ReleaseConfigReply = 33,
    Shutdown = 34,
    ShutdownReply = 35,
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Serde for CommandCode {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<5>::new(self.to_u16()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value: u64 = UnsignedVariableInteger::<5>::de(reader)?.to();
        u16::try_from(value)
            .ok()
            .and_then(CommandCode::from_u16)
            .ok_or(SerdeErr::InvalidValue {
                type_name: "CommandCode",
                value,
            })
    }
}
