pub mod marking_flow;

pub use marking_flow::MarkingFlow;
