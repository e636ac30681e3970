use super::{EditTarget, TerrainCommand};
use crate::error::EditError;
use crate::layer::LayerId;

/// Several commands that are done and undone as one history entry.
#[derive(Clone, Debug)]
pub struct CompoundCommand {
    label: String,
    commands: Vec<TerrainCommand>,
}

impl CompoundCommand {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: impl Into<TerrainCommand>) {
        self.commands.push(command.into());
    }

    pub fn with(mut self, command: impl Into<TerrainCommand>) -> Self {
        self.push(command);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if no constituent changed anything.
    pub fn is_empty(&self) -> bool {
        self.commands.iter().all(TerrainCommand::is_empty)
    }

    pub fn writes_to(&self, layer: LayerId) -> bool {
        self.commands.iter().any(|c| c.writes_to(layer))
    }

    /// Runs each command in order. On failure the commands that already ran are undone.
    pub fn execute(&mut self, target: &EditTarget) -> Result<(), EditError> {
        for i in 0..self.commands.len() {
            if let Err(e) = self.commands[i].execute(target) {
                for done in self.commands[..i].iter_mut().rev() {
                    done.undo(target)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn undo(&mut self, target: &EditTarget) -> Result<(), EditError> {
        for command in self.commands.iter_mut().rev() {
            command.undo(target)?;
        }
        Ok(())
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeRecord;
    use crate::edit::{BucketFillCommand, SetRoadBitCommand};
    use crate::test_util::{target, uniform_store};
    use crate::units::VertexUnits;

    use landblock_core::glam::IVec2;

    #[test]
    fn undo_runs_in_reverse() {
        let (target, _) = target(uniform_store(2, 2, AttributeRecord::ZERO));
        let before = target.document.read_vertex(VertexUnits(IVec2::new(3, 3)));
        let seed = VertexUnits(IVec2::new(3, 3));

        // The second fill repaints what the first one wrote, so only a reverse undo gets back to the start.
        let mut compound = CompoundCommand::new("Two fills")
            .with(BucketFillCommand::new(seed, 1, None))
            .with(BucketFillCommand::new(seed, 2, None))
            .with(SetRoadBitCommand::new(seed, 3));
        compound.execute(&target).unwrap();
        assert_eq!(compound.len(), 3);
        assert!(!compound.is_empty());
        let after = target.document.read_vertex(seed).unwrap();
        assert_eq!((after.texture_type, after.road), (2, 3));

        compound.undo(&target).unwrap();
        assert_eq!(target.document.read_vertex(seed), before);
        assert_eq!(TerrainCommand::from(compound).label(), "Two fills");
    }

    #[test]
    fn failure_undoes_earlier_steps() {
        let (target, _) = target(uniform_store(1, 1, AttributeRecord::ZERO));
        let seed = VertexUnits(IVec2::new(1, 1));
        let mut compound = CompoundCommand::new("Broken")
            .with(BucketFillCommand::new(seed, 5, None))
            .with(SetRoadBitCommand::new(seed, 9));
        assert_eq!(compound.execute(&target), Err(EditError::InvalidRoadBits(9)));
        assert_eq!(target.document.read_vertex(seed), Some(AttributeRecord::ZERO));
    }

    #[test]
    fn empty_when_nothing_changed() {
        let (target, _) = target(uniform_store(1, 1, AttributeRecord::ZERO));
        let mut compound = CompoundCommand::new("Nothing")
            .with(SetRoadBitCommand::new(VertexUnits(IVec2::new(2, 2)), 0));
        compound.execute(&target).unwrap();
        assert!(compound.is_empty());
        assert!(CompoundCommand::new("Empty").is_empty());
    }
}
