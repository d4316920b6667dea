use crate::{
    command::{Command, CommandError, CommandResult, Packet},
    request::RequestHandler,
};

/// Routes a reply command to the request it answers.
///
/// A reply for an id this handler has not issued yet arrived ahead of its
/// request and is redispatched. Replies for expired or already answered
/// requests are dropped.
pub fn fulfil_reply<P: Packet>(
    requests: &RequestHandler<P>,
    command: &Command,
) -> Result<CommandResult, CommandError> {
    let request_id = command.require_request_id()?;
    if !requests.is_issued(request_id) {
        return Ok(CommandResult::Redispatch);
    }
    let packet = command.read::<P>()?;
    // a late or duplicate reply is logged by the handler and dropped
    let _ = requests.fulfil(request_id, packet);
    Ok(CommandResult::Handled)
}
