mod architect;
mod cost_analyzer;
mod devils_advocate;
mod documentation;

pub use architect::ArchitectRole;
pub use cost_analyzer::CostAnalyzerRole;
pub use devils_advocate::DevilsAdvocateRole;
pub use documentation::{render_markdown, DocumentationRole};
