pub mod comparison;
pub mod events;
pub mod history;
pub mod recovery;
