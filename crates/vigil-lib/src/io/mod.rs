pub mod eeg;
pub mod eye;
pub mod text;
