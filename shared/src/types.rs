use std::fmt;

use lockstep_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// Frame numbers increase by one for every frame a config starts
pub type FrameNumber = u32;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl Serde for $name {
            fn ser(&self, writer: &mut dyn BitWrite) {
                UnsignedVariableInteger::<7>::new(self.0).ser(writer);
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                let value = UnsignedVariableInteger::<7>::de(reader)?.get();
                let Ok(value) = <$inner>::try_from(value) else {
                    return Err(SerdeErr::IntegerOutOfRange {
                        type_name: stringify!($name),
                        value,
                    });
                };
                Ok(Self(value))
            }
        }
    };
}

id_type!(
    /// Identifies a distributed object (config, node, pipe, window, channel,
    /// view, ...) across every process of a session
    ObjectId(u32),
    "object"
);

id_type!(
    /// Identifies one slave instance of a replicated object
    InstanceId(u32),
    "instance"
);

id_type!(
    /// Identifies a process taking part in the session
    NodeId(u32),
    "node"
);

id_type!(
    /// Correlates a reply with the request that caused it
    RequestId(u64),
    "request"
);

id_type!(
    /// Commit version of a replicated object
    Version(u64),
    "version"
);

impl ObjectId {
    /// Never assigned to an object
    pub const INVALID: ObjectId = ObjectId(0);
    /// The server object every process can address without discovery
    pub const SERVER: ObjectId = ObjectId(1);
    /// The render node object local to each client process
    pub const LOCAL_NODE: ObjectId = ObjectId(2);
    /// First id handed out by an `ObjectIdGenerator`
    pub const FIRST_DYNAMIC: ObjectId = ObjectId(16);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl From<NodeId> for InstanceId {
    /// Every process maps at most one slave of a given object, so the node
    /// id doubles as the slave's instance id
    fn from(node: NodeId) -> Self {
        InstanceId(node.value())
    }
}

impl Version {
    /// Version of an object that has never been committed or received
    pub const NONE: Version = Version(0);
    /// Version of a freshly registered master
    pub const FIRST: Version = Version(1);

    pub fn next(&self) -> Version {
        Version(self.0 + 1)
    }

    /// Number of versions between `self` and a newer `other`
    pub fn distance_to(&self, other: Version) -> u64 {
        other.0.saturating_sub(self.0)
    }
}

/// Kind of a resource entity mirrored on a render node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Pipe,
    Window,
    Channel,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Pipe => "pipe",
            EntityKind::Window => "window",
            EntityKind::Channel => "channel",
        }
    }
}

impl Serde for EntityKind {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let index: u8 = match self {
            EntityKind::Node => 0,
            EntityKind::Pipe => 1,
            EntityKind::Window => 2,
            EntityKind::Channel => 3,
        };
        index.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match u8::de(reader)? {
            0 => Ok(EntityKind::Node),
            1 => Ok(EntityKind::Pipe),
            2 => Ok(EntityKind::Window),
            3 => Ok(EntityKind::Channel),
            value => Err(SerdeErr::InvalidValue {
                type_name: "EntityKind",
                value: u64::from(value),
            }),
        }
    }
}
