use lockstep_serde::{BitReader, BitWrite, BitWriter, OwnedBitReader, Serde, SerdeErr};

use crate::{
    object::{DirtyBits, Replicate},
    types::{ObjectId, Version},
};

/// A committed change of one replicated object: the object's id, the new
/// version, the dirty mask and the serialized field groups it selects. A
/// delta with every bit set is a full snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDelta {
    pub object_id: ObjectId,
    pub version: Version,
    pub dirty: DirtyBits,
    pub payload: Vec<u8>,
}

impl ObjectDelta {
    pub fn capture<T: Replicate>(
        object_id: ObjectId,
        version: Version,
        dirty: DirtyBits,
        state: &T,
    ) -> Self {
        let mut writer = BitWriter::new();
        state.write(&mut writer, dirty);
        Self {
            object_id,
            version,
            dirty,
            payload: writer.to_bytes(),
        }
    }

    pub fn snapshot<T: Replicate>(object_id: ObjectId, version: Version, state: &T) -> Self {
        Self::capture(object_id, version, DirtyBits::ALL, state)
    }

    pub fn is_snapshot(&self) -> bool {
        self.dirty == DirtyBits::ALL
    }

    /// Deserializes the selected field groups into `state`
    pub fn apply_to<T: Replicate>(&self, state: &mut T) -> Result<(), SerdeErr> {
        let owned = OwnedBitReader::new(&self.payload);
        let mut reader = owned.borrow();
        state.read(&mut reader, self.dirty)
    }
}

impl Serde for ObjectDelta {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.object_id.ser(writer);
        self.version.ser(writer);
        self.dirty.ser(writer);
        self.payload.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let object_id = ObjectId::de(reader)?;
        let version = Version::de(reader)?;
        let dirty = DirtyBits::de(reader)?;
        let payload = Vec::<u8>::de(reader)?;
        Ok(Self {
            object_id,
            version,
            dirty,
            payload,
        })
    }
}
