use std::{
    io,
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    time::{Duration, Instant},
};

use tokio::sync::oneshot;
use tracing::{error, warn};

pub trait Command: Send {
    type Response: Send;
    type Handler: DeviceHandler<Command = Self>;

    fn execute(self, handler: &mut Self::Handler) -> io::Result<Self::Response>;
}

pub trait DeviceHandler {
    type Command: Command<Handler = Self>;

    /// Periodic service hook, called between commands at the executor's tick rate.
    fn tick(&mut self) {}

    /// Checked after every command; the executor loop ends once this returns true.
    fn should_stop(&self) -> bool {
        false
    }
}

pub struct GenericCommand<C: Command> {
    command: C,
    response_ch: oneshot::Sender<io::Result<C::Response>>,
}

impl<C: Command> GenericCommand<C> {
    pub fn new(command: C, response_ch: oneshot::Sender<io::Result<C::Response>>) -> Self {
        Self {
            command,
            response_ch,
        }
    }

    pub fn execute(self, handler: &mut C::Handler) -> io::Result<()> {
        let result = self.command.execute(handler);

        self.response_ch
            .send(result)
            .map_err(|_| io::Error::other("Failed to send response"))?;

        Ok(())
    }
}

/// Owns a device handler on a dedicated blocking thread and feeds it commands
/// in arrival order, interleaved with periodic ticks.
pub struct CommandExecutor<H: DeviceHandler + Send + 'static> {
    handler: H,
    commands_ch: Receiver<GenericCommand<H::Command>>,
    sender: Sender<GenericCommand<H::Command>>,
}

impl<H: DeviceHandler + Send> CommandExecutor<H> {
    pub fn new(handler: H) -> Self {
        let (sender, commands_ch) = std::sync::mpsc::channel();

        Self {
            handler,
            commands_ch,
            sender,
        }
    }

    pub fn sender(&self) -> CommandSender<H::Command> {
        CommandSender::new(self.sender.clone())
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Processes commands until the handler asks to stop, calling
    /// [`DeviceHandler::tick`] once per `period`.
    pub fn run_with_tick(&mut self, period: Duration) -> io::Result<()> {
        let mut next_tick = Instant::now() + period;

        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());

            match self.commands_ch.recv_timeout(timeout) {
                Ok(command) => {
                    if let Err(e) = command.execute(&mut self.handler) {
                        warn!("Command response dropped: {}", e);
                    }
                    if self.handler.should_stop() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            if now >= next_tick {
                self.handler.tick();
                next_tick += period;

                // A long command (homing) can leave us far behind schedule.
                if next_tick < now {
                    next_tick = now + period;
                }
            }
        }

        Ok(())
    }

    pub fn spawn(mut self, period: Duration) -> tokio::task::JoinHandle<io::Result<()>> {
        tokio::task::spawn_blocking(move || {
            let result = self.run_with_tick(period);
            if let Err(e) = &result {
                error!("Command executor stopped: {}", e);
            }
            result
        })
    }
}

pub struct CommandSender<T: Command> {
    commands_ch: Sender<GenericCommand<T>>,
}

impl<C: Command> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            commands_ch: self.commands_ch.clone(),
        }
    }
}

impl<C: Command> CommandSender<C> {
    pub fn new(commands_ch: Sender<GenericCommand<C>>) -> Self {
        Self { commands_ch }
    }

    pub async fn send_command(&self, command: C) -> io::Result<C::Response> {
        let (response_ch, response_rx) = oneshot::channel();
        let command = GenericCommand::new(command, response_ch);

        self.commands_ch
            .send(command)
            .map_err(|_| io::Error::other("Failed to send command"))?;

        response_rx
            .await
            .map_err(|_| io::Error::other("Failed to receive response"))?
    }
}
