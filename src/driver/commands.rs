use super::{CurtailmentDriver, DriverCommand};

impl CurtailmentDriver {
    pub(crate) fn handle_command(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::SetEnabled(enabled) => self.set_enabled(enabled),
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.control.enabled == enabled {
            return;
        }
        self.control.enabled = enabled;
        self.logger.info(&format!(
            "Curtailment {}",
            if enabled { "enabled" } else { "disabled" }
        ));
        self.publish_snapshot();
    }
}
