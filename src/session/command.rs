//! Gestures as data, for scripting a session and replaying recorded input.

use serde::{Deserialize, Serialize};

use crate::{
    math::Point,
    node::{item::ItemId, rules::AccessRules},
    router::placer::{Placement, PlacementObserver},
    session::{
        observer::{BoardObserver, CommitSummary},
        Session, SessionError,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    StartRoute {
        from: Point,
        layer: String,
        net: String,
        width: i64,
    },
    MoveTo {
        to: Point,
    },
    SwitchLayer {
        layer: String,
    },
    PlaceVia,
    StartDrag {
        item: ItemId,
        grab: Point,
    },
    DragTo {
        to: Point,
    },
    Finish,
    Cancel,
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Started,
    Placed(Placement),
    Committed(CommitSummary),
    Cancelled,
}

impl<R: AccessRules, O: BoardObserver + PlacementObserver> Session<R, O> {
    /// Runs one command. Layers and nets are resolved by name.
    pub fn execute(&mut self, command: &Command) -> Result<CommandOutcome, SessionError> {
        match command {
            Command::StartRoute {
                from,
                layer,
                net,
                width,
            } => {
                let layer = self.layer_by_name(layer)?;
                let net = self.net_by_name(net)?;
                self.start_route(*from, layer, net, *width)?;
                Ok(CommandOutcome::Started)
            }
            Command::MoveTo { to } => Ok(CommandOutcome::Placed(self.move_to(*to)?)),
            Command::SwitchLayer { layer } => {
                let layer = self.layer_by_name(layer)?;
                Ok(CommandOutcome::Placed(self.switch_layer(layer)?))
            }
            Command::PlaceVia => Ok(CommandOutcome::Placed(self.place_via()?)),
            Command::StartDrag { item, grab } => {
                self.start_drag(*item, *grab)?;
                Ok(CommandOutcome::Started)
            }
            Command::DragTo { to } => Ok(CommandOutcome::Placed(self.drag_to(*to)?)),
            Command::Finish => Ok(CommandOutcome::Committed(self.finish()?)),
            Command::Cancel => {
                self.cancel()?;
                Ok(CommandOutcome::Cancelled)
            }
            Command::Undo => Ok(CommandOutcome::Committed(self.undo()?)),
            Command::Redo => Ok(CommandOutcome::Committed(self.redo()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let commands: Vec<Command> = serde_json::from_str(
            r#"[
                {"command": "start_route", "from": {"x": 0, "y": 0}, "layer": "F.Cu", "net": "SIG", "width": 2},
                {"command": "move_to", "to": {"x": 100, "y": 0}},
                {"command": "place_via"},
                {"command": "start_drag", "item": 3, "grab": {"x": 50, "y": 0}},
                {"command": "finish"},
                {"command": "undo"}
            ]"#,
        )
        .unwrap();

        assert_eq!(commands.len(), 6);
        assert_eq!(commands[2], Command::PlaceVia);
        assert!(matches!(
            commands[3],
            Command::StartDrag { item: ItemId(3), .. }
        ));
    }
}
