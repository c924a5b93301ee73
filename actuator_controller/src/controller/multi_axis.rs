use std::{collections::HashSet, io};

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use utilities::command_executor::{Command, DeviceHandler};

use crate::{
    communication::commands::{UNRECOGNISED_COMMAND, split_prefix},
    controller::Axis,
    models::AxisError,
};

/// Owns every axis and routes `M<id>` lines to them. Lives on the executor
/// thread, so no axis state is ever shared.
pub struct MultiAxis {
    axes: Vec<Box<dyn Axis>>,
    diagnostics: broadcast::Sender<String>,
    stopped: bool,
}

impl MultiAxis {
    pub fn new(
        axes: Vec<Box<dyn Axis>>,
        diagnostics: broadcast::Sender<String>,
    ) -> Result<Self, AxisError> {
        let mut seen = HashSet::new();
        for axis in &axes {
            if !seen.insert(axis.axis_id()) {
                return Err(AxisError::InvalidConfig(format!(
                    "duplicate axis id {}",
                    axis.axis_id()
                )));
            }
        }

        info!("Managing {} axes", axes.len());

        Ok(Self {
            axes,
            diagnostics,
            stopped: false,
        })
    }

    pub fn by_id_mut(&mut self, axis_id: u32) -> Option<&mut Box<dyn Axis>> {
        self.axes.iter_mut().find(|axis| axis.axis_id() == axis_id)
    }

    /// Starts every axis in order. Homing failures are reported, not fatal:
    /// the faulted axis keeps repeating its diagnostic and the rest run on.
    pub fn begin(&mut self, home: bool) -> Vec<String> {
        let mut report = Vec::new();

        for axis in &mut self.axes {
            if let Err(e) = axis.begin(home) {
                let line = format!("M{} {}", axis.axis_id(), e);
                error!("{}", line);
                report.push(line);
            }
        }

        report
    }

    /// Handles one inbound line and returns the lines to send back to its
    /// sender.
    #[instrument(skip(self))]
    pub fn route(&mut self, line: &str) -> Vec<String> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }

        let Some((axis_id, rest)) = split_prefix(line) else {
            warn!("Unrecognised command");
            return vec![UNRECOGNISED_COMMAND.to_string()];
        };

        let Some(axis) = self.by_id_mut(axis_id) else {
            warn!("No axis with id {}", axis_id);
            return vec![UNRECOGNISED_COMMAND.to_string()];
        };

        match axis.process_command(rest) {
            Ok(Some(reply)) => vec![reply],
            Ok(None) => {
                debug!("Accepted");
                Vec::new()
            }
            Err(e) => {
                let line = format!("M{} {}", axis_id, e);
                warn!("{}", line);
                vec![line]
            }
        }
    }

    pub fn tick_all(&mut self) {
        for axis in &mut self.axes {
            if let Some(line) = axis.tick() {
                // No connected clients is fine; the line is already logged.
                let _ = self.diagnostics.send(line);
            }
        }
    }

    pub fn disable_all(&mut self) -> Vec<String> {
        let mut report = Vec::new();

        for axis in &mut self.axes {
            if let Err(e) = axis.disable_motor() {
                let line = format!("M{} {}", axis.axis_id(), e);
                error!("{}", line);
                report.push(line);
            }
        }

        report
    }
}

#[derive(Debug)]
pub enum RouterCommand {
    Line(String),
    Begin { home: bool },
    Shutdown,
}

impl Command for RouterCommand {
    type Response = Vec<String>;
    type Handler = MultiAxis;

    fn execute(self, handler: &mut Self::Handler) -> io::Result<Self::Response> {
        let response = match self {
            RouterCommand::Line(line) => handler.route(&line),
            RouterCommand::Begin { home } => handler.begin(home),
            RouterCommand::Shutdown => {
                info!("Shutting down, disabling all axes");
                handler.stopped = true;
                handler.disable_all()
            }
        };

        Ok(response)
    }
}

impl DeviceHandler for MultiAxis {
    type Command = RouterCommand;

    fn tick(&mut self) {
        self.tick_all();
    }

    fn should_stop(&self) -> bool {
        self.stopped
    }
}
