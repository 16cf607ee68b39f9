pub mod nonsense;
pub mod theme;

pub use nonsense::nonsense;
pub use theme::theme;
