pub mod name;
pub mod options;
pub mod result;
pub mod status;
pub mod tree;

pub use name::TestName;
pub use options::{KindMask, TestFlags, TestKind, TestOptions};
pub use result::{RunSummary, TestResult};
pub use status::Outcome;
pub use tree::{NodeKind, NodeStats, ResultNode, ResultTree};
