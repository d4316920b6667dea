use lockstep_serde::{BitReader, BitWrite, BitWriter, OwnedBitReader, Serde, SerdeErr};

use crate::{
    command::{CommandCode, CommandError},
    types::{ObjectId, RequestId},
};

/// A typed payload carried by a command
pub trait Packet: Serde {
    const CODE: CommandCode;
}

/// A packet addressed to one distributed object. Replies echo the request
/// id of the command they answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub code: CommandCode,
    pub target: ObjectId,
    pub request_id: Option<RequestId>,
    pub payload: Vec<u8>,
}

impl Command {
    pub fn new<P: Packet>(target: ObjectId, packet: &P) -> Self {
        let mut writer = BitWriter::new();
        packet.ser(&mut writer);
        Self {
            code: P::CODE,
            target,
            request_id: None,
            payload: writer.to_bytes(),
        }
    }

    pub fn request<P: Packet>(target: ObjectId, packet: &P, request_id: RequestId) -> Self {
        let mut command = Self::new(target, packet);
        command.request_id = Some(request_id);
        command
    }

    /// A command answering this one: same target, same request id
    pub fn reply<P: Packet>(&self, packet: &P) -> Self {
        let mut reply = Self::new(self.target, packet);
        reply.request_id = self.request_id;
        reply
    }

    pub fn read<P: Packet>(&self) -> Result<P, CommandError> {
        if self.code != P::CODE {
            return Err(CommandError::UnexpectedCode {
                expected: P::CODE,
                received: self.code,
            });
        }
        let owned = OwnedBitReader::new(&self.payload);
        let mut reader = owned.borrow();
        Ok(P::de(&mut reader)?)
    }

    pub fn require_request_id(&self) -> Result<RequestId, CommandError> {
        self.request_id.ok_or(CommandError::MissingRequestId {
            code: self.code,
            target: self.target,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommandError> {
        let owned = OwnedBitReader::new(bytes);
        let mut reader = owned.borrow();
        Ok(Self::de(&mut reader)?)
    }
}

impl Serde for Command {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.code.ser(writer);
        self.target.ser(writer);
        self.request_id.ser(writer);
        self.payload.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            code: CommandCode::de(reader)?,
            target: ObjectId::de(reader)?,
            request_id: Option::<RequestId>::de(reader)?,
            payload: Vec::<u8>::de(reader)?,
        })
    }
}
