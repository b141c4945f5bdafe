//! Dialogue script: turn schema, paper content collection and generation

pub mod content;
pub mod gemini;
pub mod prompt;
pub mod turn;

pub use content::{collect_paper_contents, PaperContents, PaperDocument};
pub use gemini::{GeminiScriptGenerator, ScriptGenerator};
pub use prompt::render_prompt;
pub use turn::{load_script, parse_script, save_script, script_schema, EffectId, Turn};
