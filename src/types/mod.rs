pub mod element;
pub mod event;
pub mod whole_notes;
