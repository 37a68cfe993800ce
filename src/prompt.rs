//! Operator interaction.
//!
//! Moves ask the operator two kinds of question: what to do about occupied
//! destinations, and whether a mass move should go ahead at all. Both are
//! traits so that non-interactive runs and tests can answer without a
//! terminal.

use crate::file_organizer::{Collision, CollisionChoice};
use crate::output::OutputFormatter;
use dialoguer::{Confirm as ConfirmPrompt, Select};
use tracing::{info, warn};

/// Decides what happens to a batch's colliding moves.
pub trait ConflictResolver {
    fn resolve(&self, collisions: &[Collision]) -> CollisionChoice;
}

/// Yes/no confirmation before a mutating batch.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on the terminal.
///
/// When the terminal cannot be read (closed stdin, no tty) collisions abort
/// and confirmations are declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractivePrompt;

impl ConflictResolver for InteractivePrompt {
    fn resolve(&self, collisions: &[Collision]) -> CollisionChoice {
        OutputFormatter::collisions(collisions);

        let choices = ["Skip", "Rename", "Abort"];
        match Select::new()
            .with_prompt("Destination already exists")
            .items(&choices)
            .default(0)
            .interact()
        {
            Ok(0) => CollisionChoice::Skip,
            Ok(1) => CollisionChoice::Rename,
            Ok(_) => CollisionChoice::Abort,
            Err(e) => {
                warn!(error = %e, "cannot read the collision choice, aborting");
                CollisionChoice::Abort
            }
        }
    }
}

impl Confirm for InteractivePrompt {
    fn confirm(&self, question: &str) -> bool {
        ConfirmPrompt::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                warn!(error = %e, "cannot read the confirmation, declining");
                false
            })
    }
}

/// Gives the same answers every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswers {
    collision: CollisionChoice,
    confirm: bool,
}

impl FixedAnswers {
    pub fn new(collision: CollisionChoice, confirm: bool) -> Self {
        Self { collision, confirm }
    }
}

impl ConflictResolver for FixedAnswers {
    fn resolve(&self, collisions: &[Collision]) -> CollisionChoice {
        OutputFormatter::collisions(collisions);
        info!(choice = ?self.collision, count = collisions.len(), "collisions resolved by fixed answer");
        self.collision
    }
}

impl Confirm for FixedAnswers {
    fn confirm(&self, _question: &str) -> bool {
        self.confirm
    }
}
