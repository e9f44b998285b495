pub mod card;
pub mod deck;
pub mod progress;
pub mod study;
