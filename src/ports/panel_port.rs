//! Price panel source port trait.

use crate::domain::error::MeanrevError;
use crate::domain::panel::Panel;

pub trait PanelPort {
    /// Loads every series of the backtest universe.
    fn load_panel(&self) -> Result<Panel, MeanrevError>;
}
