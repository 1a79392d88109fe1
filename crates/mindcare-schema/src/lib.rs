pub mod observation;
pub mod pattern;
pub mod records;
pub mod report;
pub mod risk;
pub mod trend;

pub use observation::*;
pub use pattern::*;
pub use records::*;
pub use report::*;
pub use risk::*;
pub use trend::*;
