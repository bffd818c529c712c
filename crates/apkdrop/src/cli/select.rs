//! Flavor and build mode selection
//!
//! [`SelectionFlow`] holds the two questions and their answers as plain
//! state; [`prompt_selection`] drives it with dialoguer prompts.

use console::Term;
use dialoguer::{Confirm, Select};
use tracing::debug;

use apkdrop_core::{BuildMode, BuildSelection, Config, Flavor, SelectionError};

use crate::cli::CommandError;

/// Question that currently has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    Flavor,
    Mode,
}

impl Question {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Flavor => Some(Self::Mode),
            Self::Mode => None,
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            Self::Flavor => None,
            Self::Mode => Some(Self::Flavor),
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::Flavor => "Choose a flavor",
            Self::Mode => "Choose a build mode",
        }
    }
}

/// Answers collected so far and the focused question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionFlow {
    focus: Question,
    flavor: Option<Flavor>,
    mode: Option<BuildMode>,
}

impl Default for SelectionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionFlow {
    pub fn new() -> Self {
        Self {
            focus: Question::Flavor,
            flavor: None,
            mode: None,
        }
    }

    /// Start with answers given up front; focus lands on the first open question
    pub fn with_answers(flavor: Option<Flavor>, mode: Option<BuildMode>) -> Self {
        let focus = if flavor.is_some() && mode.is_none() {
            Question::Mode
        } else {
            Question::Flavor
        };
        Self { focus, flavor, mode }
    }

    pub fn focus(&self) -> Question {
        self.focus
    }

    pub fn flavor(&self) -> Option<&Flavor> {
        self.flavor.as_ref()
    }

    pub fn mode(&self) -> Option<BuildMode> {
        self.mode
    }

    /// Answer the flavor question and move focus forward
    pub fn answer_flavor(&mut self, flavor: Flavor) {
        self.flavor = Some(flavor);
        self.next();
    }

    /// Answer the mode question and move focus forward
    pub fn answer_mode(&mut self, mode: BuildMode) {
        self.mode = Some(mode);
        self.next();
    }

    pub fn next(&mut self) {
        if let Some(next) = self.focus.next() {
            self.focus = next;
        }
    }

    pub fn prev(&mut self) {
        if let Some(prev) = self.focus.prev() {
            self.focus = prev;
        }
    }

    /// Forget every answer and return to the first question
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn is_complete(&self) -> bool {
        self.flavor.is_some() && self.mode.is_some()
    }

    /// The confirmed selection, or [`SelectionError::Incomplete`]
    pub fn selection(&self) -> Result<BuildSelection, SelectionError> {
        match (&self.flavor, self.mode) {
            (Some(flavor), Some(mode)) => Ok(BuildSelection::new(flavor.clone(), mode)),
            _ => Err(SelectionError::Incomplete),
        }
    }
}

/// Ask for whatever the flow is still missing, then confirm.
///
/// Without a terminal the answers must already be complete.
pub fn prompt_selection(
    config: &Config,
    mut flow: SelectionFlow,
    skip_confirm: bool,
) -> anyhow::Result<BuildSelection> {
    if flow.is_complete() && skip_confirm {
        return Ok(flow.selection()?);
    }
    if !Term::stderr().is_term() {
        return Ok(flow.selection()?);
    }

    loop {
        while !flow.is_complete() {
            match flow.focus() {
                Question::Flavor => ask_flavor(config, &mut flow)?,
                Question::Mode => ask_mode(&mut flow)?,
            }
        }

        let selection = flow.selection()?;
        if skip_confirm {
            return Ok(selection);
        }

        let confirmed = Confirm::new()
            .with_prompt(format!("Build and upload {}?", selection))
            .default(true)
            .interact_opt()?
            .ok_or(CommandError::Cancelled)?;

        if confirmed {
            debug!(selection = %selection, "selection confirmed");
            return Ok(selection);
        }
        flow.clear();
    }
}

fn ask_flavor(config: &Config, flow: &mut SelectionFlow) -> anyhow::Result<()> {
    let names = config.flavor_names();
    let default = flow
        .flavor()
        .and_then(|current| names.iter().position(|name| *name == current.as_str()))
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt(Question::Flavor.prompt())
        .items(&names)
        .default(default)
        .interact_opt()?
        .ok_or(CommandError::Cancelled)?;

    let flavor = config
        .flavors
        .get(index)
        .cloned()
        .ok_or(SelectionError::Incomplete)?;
    flow.answer_flavor(flavor);
    Ok(())
}

const BACK: &str = "← back";

fn ask_mode(flow: &mut SelectionFlow) -> anyhow::Result<()> {
    let mut items: Vec<&str> = BuildMode::ALL.iter().map(BuildMode::as_str).collect();
    items.push(BACK);
    let default = flow
        .mode()
        .and_then(|current| BuildMode::ALL.iter().position(|m| *m == current))
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt(Question::Mode.prompt())
        .items(&items)
        .default(default)
        .interact_opt()?
        .ok_or(CommandError::Cancelled)?;

    match BuildMode::ALL.get(index) {
        Some(mode) => flow.answer_mode(*mode),
        None => flow.prev(),
    }
    Ok(())
}
