mod browse;
mod state;
mod ui;

pub use browse::*;
pub use state::*;
