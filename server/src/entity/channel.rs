use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    fulfil_reply,
    packets::{
        ChannelFrameDrawPacket, ChannelFrameFinishPacket, ChannelFrameFinishReplyPacket,
        ChannelSetNearFarPacket,
    },
    Command, CommandCode, CommandError, CommandResult, Dispatcher, EntityKind, FrameNumber,
    Monitor, ObjectId, ObserverList, PixelViewport, QueueKind, RequestHandler, RequestId,
    Viewport,
};

use crate::{
    compound::CompoundPath,
    entity::{ChannelPath, NodeLink, ResourceCore},
    error::ConfigError,
};

/// Granularity at which frame-finish waits give the caller a chance to do
/// housekeeping
const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Receives the timing a channel reports for each finished frame
pub trait ChannelListener: Send + Sync {
    fn notify_load_data(
        &self,
        channel: ObjectId,
        frame_number: FrameNumber,
        start_time: f32,
        end_time: f32,
    );
}

/// Integer attributes of a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelIAttribute {
    /// Collect statistics while rendering
    HintStatistics,
    /// Send a token through the pipeline after each frame
    HintSendToken,
}

impl ChannelIAttribute {
    const COUNT: usize = 2;

    fn index(&self) -> usize {
        match self {
            ChannelIAttribute::HintStatistics => 0,
            ChannelIAttribute::HintSendToken => 1,
        }
    }
}

/// A viewport within a window; the destination of compound rendering
pub struct Channel {
    core: ResourceCore,
    path: ChannelPath,
    viewport: Viewport,
    pixel_viewport: PixelViewport,
    fixed_pixel_viewport: bool,
    near_far: Arc<Mutex<(f32, f32)>>,
    view: Option<ObjectId>,
    last_draw_compound: Option<CompoundPath>,
    used: Monitor<u32>,
    drawable: u32,
    iattributes: [i32; ChannelIAttribute::COUNT],
    listeners: Arc<ObserverList<dyn ChannelListener>>,
    frame_replies: Arc<RequestHandler<ChannelFrameFinishReplyPacket>>,
    outstanding_frames: VecDeque<(FrameNumber, RequestId)>,
}

impl Channel {
    pub(crate) fn new(
        id: ObjectId,
        name: &str,
        path: ChannelPath,
        link: NodeLink,
        viewport: Viewport,
        window: &PixelViewport,
    ) -> Self {
        let mut channel = Self {
            core: ResourceCore::new(id, name, EntityKind::Channel, link),
            path,
            viewport,
            pixel_viewport: PixelViewport::default(),
            fixed_pixel_viewport: false,
            near_far: Arc::new(Mutex::new((0.1, 100.0))),
            view: None,
            last_draw_compound: None,
            used: Monitor::new(0),
            drawable: 0,
            iattributes: [0; ChannelIAttribute::COUNT],
            listeners: Arc::new(ObserverList::new()),
            frame_replies: Arc::new(RequestHandler::new()),
            outstanding_frames: VecDeque::new(),
        };
        channel.notify_viewport_changed(window);
        channel
    }

    pub fn core(&self) -> &ResourceCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut ResourceCore {
        &mut self.core
    }

    pub fn id(&self) -> ObjectId {
        self.core.id()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn path(&self) -> ChannelPath {
        self.path
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    // Activity

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    pub fn activate(&self) {
        self.core.activate();
    }

    pub fn deactivate(&self) {
        self.core.deactivate();
    }

    /// Counts the compounds rendering into this channel
    pub fn ref_used(&self) {
        self.used.increment();
    }

    pub fn unref_used(&self) {
        if self.used.get() == 0 {
            warn!("{} is not used", self.name());
            return;
        }
        self.used.decrement();
    }

    pub fn is_used(&self) -> bool {
        self.used.get() > 0
    }

    // Geometry

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pixel_viewport(&self) -> PixelViewport {
        self.pixel_viewport
    }

    /// Places the channel fractionally within its window
    pub fn set_viewport(&mut self, viewport: Viewport, window: &PixelViewport) {
        self.viewport = viewport;
        self.fixed_pixel_viewport = false;
        self.notify_viewport_changed(window);
    }

    /// Places the channel at a fixed pixel area of its window
    pub fn set_pixel_viewport(&mut self, pixel_viewport: PixelViewport, window: &PixelViewport) {
        self.pixel_viewport = pixel_viewport;
        self.fixed_pixel_viewport = true;
        self.notify_viewport_changed(window);
    }

    /// Recomputes whichever of the two viewports is derived after the
    /// window changed size
    pub fn notify_viewport_changed(&mut self, window: &PixelViewport) {
        let window = PixelViewport::new(0, 0, window.w, window.h);
        if self.fixed_pixel_viewport {
            self.viewport = self.pixel_viewport.viewport_in(&window);
        } else {
            self.pixel_viewport = window.apply(&self.viewport);
        }
    }

    pub fn near_far(&self) -> (f32, f32) {
        *self.near_far.lock()
    }

    pub fn set_near_far(&self, near: f32, far: f32) {
        *self.near_far.lock() = (near, far);
    }

    /// The view rendered by this channel, if it is a destination channel
    pub fn view(&self) -> Option<ObjectId> {
        self.view
    }

    pub fn set_view(&mut self, view: Option<ObjectId>) {
        self.view = view;
    }

    // Attributes

    pub fn drawable(&self) -> u32 {
        self.drawable
    }

    pub fn set_drawable(&mut self, drawable: u32) {
        self.drawable = drawable;
    }

    pub fn iattribute(&self, attribute: ChannelIAttribute) -> i32 {
        self.iattributes[attribute.index()]
    }

    pub fn set_iattribute(&mut self, attribute: ChannelIAttribute, value: i32) {
        self.iattributes[attribute.index()] = value;
    }

    // Listeners

    pub fn add_listener(&self, listener: Arc<dyn ChannelListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ChannelListener>) -> bool {
        self.listeners.remove(listener)
    }

    // Frame

    /// The compound that issues the channel's final draw of the current
    /// frame. Reset at the start of every frame.
    pub fn last_draw_compound(&self) -> Option<&CompoundPath> {
        self.last_draw_compound.as_ref()
    }

    pub(crate) fn set_last_draw_compound(&mut self, compound: Option<CompoundPath>) {
        self.last_draw_compound = compound;
    }

    /// Frames sent to the node that have not been reported finished
    pub fn outstanding_frames(&self) -> usize {
        self.outstanding_frames.len()
    }

    pub(crate) fn register_handlers(&self, dispatcher: &Dispatcher) -> Result<(), CommandError> {
        self.core.register_handlers(dispatcher)?;

        let id = self.id();
        let replies = self.frame_replies.clone();
        let listeners = self.listeners.clone();
        dispatcher.register(
            id,
            CommandCode::ChannelFrameFinishReply,
            QueueKind::NodeThread,
            move |command| {
                let result = fulfil_reply(&replies, command)?;
                if result == CommandResult::Handled {
                    let reply = command.read::<ChannelFrameFinishReplyPacket>()?;
                    listeners.notify(|listener| {
                        listener.notify_load_data(
                            id,
                            reply.frame_number,
                            reply.start_time,
                            reply.end_time,
                        )
                    });
                }
                Ok(result)
            },
        )?;

        let near_far = self.near_far.clone();
        dispatcher.register(
            id,
            CommandCode::ChannelSetNearFar,
            QueueKind::CommandThread,
            move |command| {
                let packet = command.read::<ChannelSetNearFarPacket>()?;
                *near_far.lock() = (packet.near, packet.far);
                Ok(CommandResult::Handled)
            },
        )
    }

    /// Sends the frame's render work. Returns whether anything was sent.
    pub(crate) fn update_draw(
        &self,
        draws: Vec<ChannelFrameDrawPacket>,
    ) -> Result<bool, ConfigError> {
        let sent = !draws.is_empty();
        for packet in draws {
            debug!(
                "{} draws {} for frame {}",
                self.name(),
                packet.context.compound,
                packet.context.frame_number
            );
            self.core.link().send(Command::new(self.id(), &packet))?;
        }
        Ok(sent)
    }

    /// Sends the frame-finish request whose reply `wait_frame_finished`
    /// collects
    pub(crate) fn update_post(
        &mut self,
        frame_id: u32,
        frame_number: FrameNumber,
    ) -> Result<(), ConfigError> {
        let request = self.frame_replies.register();
        let command = Command::request(
            self.id(),
            &ChannelFrameFinishPacket {
                frame_id,
                frame_number,
            },
            request.id(),
        );
        if let Err(err) = self.core.link().send(command) {
            self.frame_replies.abandon(request.id());
            return Err(err.into());
        }
        self.outstanding_frames.push_back((frame_number, request.id()));
        Ok(())
    }

    /// Blocks until every frame up to `frame_number` was reported finished.
    /// `idle` runs whenever no reply arrived for a short while.
    pub(crate) fn wait_frame_finished<F: FnMut()>(
        &mut self,
        frame_number: FrameNumber,
        timeout: Duration,
        mut idle: F,
    ) -> Result<(), ConfigError> {
        while let Some(&(frame, request_id)) = self.outstanding_frames.front() {
            if frame > frame_number {
                break;
            }
            let deadline = Instant::now() + timeout;
            loop {
                if self
                    .frame_replies
                    .poll(request_id, FINISH_POLL_INTERVAL)?
                    .is_some()
                {
                    break;
                }
                if Instant::now() >= deadline {
                    self.frame_replies.abandon(request_id);
                    self.outstanding_frames.pop_front();
                    warn!("{} did not finish frame {}", self.name(), frame);
                    return Err(ConfigError::FrameFinishTimeout {
                        channel: self.name().to_string(),
                        frame_number: frame,
                    });
                }
                idle();
            }
            self.outstanding_frames.pop_front();
        }
        Ok(())
    }

    /// Forgets frames that will never be reported, e.g. after the channel
    /// stopped
    pub(crate) fn abandon_frames(&mut self) {
        for (_, request_id) in self.outstanding_frames.drain(..) {
            self.frame_replies.abandon(request_id);
        }
    }
}
