use landblock_map::{CompoundCommand, EditError, EditTarget, TerrainCommand};

/// The state of a drag tool.
#[derive(Debug, Default)]
pub enum StrokeState {
    #[default]
    Idle,
    /// Every command applied since the pointer went down.
    Painting(CompoundCommand),
}

impl StrokeState {
    pub fn is_painting(&self) -> bool {
        matches!(self, Self::Painting(_))
    }

    pub(crate) fn begin(&mut self, label: &str) {
        *self = Self::Painting(CompoundCommand::new(label));
    }

    /// Applies `command` and keeps it if it changed anything. Does nothing while idle.
    pub(crate) fn apply(
        &mut self,
        target: &EditTarget,
        command: impl Into<TerrainCommand>,
    ) -> Result<(), EditError> {
        let compound = match self {
            Self::Painting(compound) => compound,
            Self::Idle => return Ok(()),
        };
        let mut command = command.into();
        command.execute(target)?;
        if !command.is_empty() {
            compound.push(command);
        }
        Ok(())
    }

    /// Returns to idle, handing back the stroke if it changed anything.
    pub(crate) fn finish(&mut self) -> Option<CompoundCommand> {
        match std::mem::take(self) {
            Self::Painting(compound) if !compound.is_empty() => Some(compound),
            _ => None,
        }
    }

    /// Returns to idle and undoes the stroke.
    pub(crate) fn cancel(&mut self, target: &EditTarget) -> Result<(), EditError> {
        match std::mem::take(self) {
            Self::Painting(mut compound) => compound.undo(target),
            Self::Idle => Ok(()),
        }
    }
}
