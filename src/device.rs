/// device runs the simulated sensor + pump as a single task owning all of its state
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::{DeviceEvent, DeviceState, Effect, Intent, RenderEvent};
use crate::mqtt::Message;

pub struct Device<R = StdRng> {
    state: DeviceState,
    rng: R,
    outbox: mpsc::Sender<Message>,
    render_tx: mpsc::Sender<RenderEvent>,
    snapshot_tx: watch::Sender<DeviceState>,
}

impl Device<StdRng> {
    pub fn new(
        state: DeviceState,
        outbox: mpsc::Sender<Message>,
        render_tx: mpsc::Sender<RenderEvent>,
    ) -> (Self, watch::Receiver<DeviceState>) {
        Self::with_rng(state, StdRng::from_entropy(), outbox, render_tx)
    }
}

impl<R: Rng> Device<R> {
    pub fn with_rng(
        state: DeviceState,
        rng: R,
        outbox: mpsc::Sender<Message>,
        render_tx: mpsc::Sender<RenderEvent>,
    ) -> (Self, watch::Receiver<DeviceState>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(state);
        let device = Self {
            state,
            rng,
            outbox,
            render_tx,
            snapshot_tx,
        };
        (device, snapshot_rx)
    }

    fn apply(&mut self, event: DeviceEvent) {
        for effect in self.state.process_event(event) {
            self.dispatch(effect);
        }
        self.snapshot_tx.send_replace(self.state);
    }

    /// Neither publishing nor rendering may hold up the state owner
    fn dispatch(&self, effect: Effect) {
        match effect {
            Effect::Publish(message) => {
                if let Err(e) = self.outbox.try_send(message) {
                    log::warn!("Dropping outgoing message: {}", e);
                }
            }
            Effect::Render(event) => {
                if let Err(e) = self.render_tx.try_send(event) {
                    log::debug!("Dropping render event: {}", e);
                }
            }
        }
    }

    fn tick(&mut self) {
        let step = self.state.draw_step(&mut self.rng);
        self.apply(DeviceEvent::Tick { step });
    }

    /// Serialize ticks, inbound messages and local intents until shut down
    ///
    /// A period edit takes effect from the next tick on.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Message>,
        mut intents: mpsc::Receiver<Intent>,
        shutdown: CancellationToken,
    ) {
        log::info!(
            "Device started in {} mode, ticking every {:?}",
            self.state.mode,
            self.state.update_period
        );
        let ticker = sleep(self.state.update_period);
        tokio::pin!(ticker);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Device shutting down");
                    break;
                }
                Some(message) = inbound.recv() => {
                    log::debug!("Device got {:?}", message);
                    self.apply(DeviceEvent::Inbound(message));
                }
                Some(intent) = intents.recv() => {
                    log::debug!("Device got intent {:?}", intent);
                    self.apply(DeviceEvent::Local(intent));
                }
                () = &mut ticker => {
                    self.tick();
                    ticker.as_mut().reset(Instant::now() + self.state.update_period);
                }
            }
        }
    }
}
