pub mod catalog;
pub mod feedback;
pub mod recommendation;
pub mod training;
